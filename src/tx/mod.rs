//! Transaction submission module with nonce management and gas estimation

mod builder;
mod gas;
mod nonce;
mod raw;
mod sender;

pub use builder::{BuiltTransaction, TransactionBuilder};
pub use gas::GasEstimator;
pub use nonce::NonceManager;
pub use raw::{parse_quantity, RawTransaction};
pub use sender::TransactionSender;

use crate::error::SwapResult;

use async_trait::async_trait;
use ethers::types::{Address, H256};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Labels a submission for logs and metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionContext {
    pub id: Uuid,
    /// Component issuing the transaction
    pub tag: String,
    /// What the transaction does, e.g. `Swap/Approve`
    pub description: String,
}

impl TransactionContext {
    pub fn new(tag: &str, description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.to_string(),
            description: description.to_string(),
        }
    }
}

impl fmt::Display for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.description, self.id)
    }
}

/// Signs and broadcasts transactions on behalf of one wallet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Address transactions are sent from
    fn wallet_address(&self) -> Address;

    /// Normalize, sign and broadcast `tx`, returning once it is mined
    async fn submit(&self, tx: RawTransaction, context: TransactionContext) -> SwapResult<H256>;
}
