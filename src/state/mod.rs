//! Swap state tracking
//!
//! Swaps live in memory only. A swap interrupted by a restart is gone and
//! has to be submitted again.

mod registry;

pub use registry::{SwapRecord, SwapRegistry, SwapStats};
