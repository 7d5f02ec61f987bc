//! Chain access for the swap wallet
//!
//! Multi-RPC provider management with automatic failover and broadcast
//! to every configured endpoint.

pub mod provider;

pub use provider::{ChainProvider, GasPrice};
