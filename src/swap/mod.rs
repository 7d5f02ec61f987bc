//! Swap submission: slippage check, approval, execution quote, execution
//!
//! The orchestrator drives one swap at a time per call and publishes
//! [`SwapEvent`]s that observers turn into a [`SwapStatus`].

pub mod events;
pub mod orchestrator;
pub mod quote;
pub mod types;
pub mod validator;

pub use events::{SwapEvent, SwapStatus};
pub use orchestrator::SwapOrchestrator;
pub use quote::{ExecutionQuoteClient, ExecutionQuoteRequest, HttpExecutionQuoteClient};
pub use types::{
    AmountType, Field, SwapAmount, SwapInfo, SwapTransaction, SwapUserInput,
    UnvalidatedSwapTransaction, ValidatedSwapTransaction,
};
pub use validator::{is_within_tolerance, percentage_difference, QuoteValidator};
