//! Swap submitter - runs token swaps through an aggregator on an EVM chain
//!
//! A swap is checked for price drift, approved on chain, turned into an
//! execution transaction by the aggregator's execute endpoint, and executed.
//! Progress is published as [`swap::SwapEvent`]s.

pub mod api;
pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod race;
pub mod state;
pub mod swap;
pub mod tx;

pub use error::{SwapError, SwapResult};
