//! Normalizes raw quote transactions against current chain state

use super::gas::GasEstimator;
use super::raw::RawTransaction;
use crate::chain::{ChainProvider, GasPrice};
use crate::error::{SwapError, SwapResult};

use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use tracing::debug;

/// Fills chain id, nonce, gas limit and gas price into a raw transaction
pub struct TransactionBuilder {
    provider: Arc<ChainProvider>,
    gas_estimator: GasEstimator,
}

/// A transaction ready for signing
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub tx: TypedTransaction,
    pub gas_limit: U256,
    pub gas_price: GasPrice,
    pub value: U256,
}

impl BuiltTransaction {
    /// Worst-case wei the sender needs: value plus maximum fee
    pub fn max_cost(&self) -> U256 {
        GasEstimator::calculate_cost(self.gas_limit, &self.gas_price).saturating_add(self.value)
    }
}

impl TransactionBuilder {
    pub fn new(provider: Arc<ChainProvider>) -> Self {
        Self {
            provider,
            gas_estimator: GasEstimator::new(),
        }
    }

    /// Build a signable transaction from quote parameters.
    ///
    /// The chain id always comes from the connected chain; quote services have
    /// been seen returning ids for the wrong network.
    pub async fn build(
        &self,
        raw: &RawTransaction,
        from: Address,
        nonce: u64,
    ) -> SwapResult<BuiltTransaction> {
        let to = raw
            .to
            .ok_or_else(|| SwapError::Transaction("transaction has no recipient".to_string()))?;
        let chain_id = self.provider.chain_id();

        if let Some(quoted) = raw.chain_id {
            if quoted != U256::from(chain_id) {
                debug!("Replacing quoted chain id {} with {}", quoted, chain_id);
            }
        }
        if let Some(quoted) = raw.nonce {
            debug!("Ignoring quoted nonce {}, using {}", quoted, nonce);
        }

        let value = raw.value.unwrap_or_default();
        let data = raw.data.clone().unwrap_or_default();

        let gas_price = match raw.gas_price {
            Some(price) => GasPrice::Legacy(price),
            None => self.gas_estimator.get_gas_price(&self.provider).await?,
        };

        let mut tx = assemble(from, to, data, value, nonce, chain_id, &gas_price);

        let gas_limit = match raw.gas {
            Some(gas) => gas,
            None => {
                self.gas_estimator
                    .estimate_gas_limit(&self.provider, &tx)
                    .await?
            }
        };
        tx.set_gas(gas_limit);

        Ok(BuiltTransaction {
            tx,
            gas_limit,
            gas_price,
            value,
        })
    }
}

/// Assemble a typed transaction for the given gas price model
fn assemble(
    from: Address,
    to: Address,
    data: Bytes,
    value: U256,
    nonce: u64,
    chain_id: u64,
    gas_price: &GasPrice,
) -> TypedTransaction {
    match gas_price {
        GasPrice::Legacy(price) => {
            let tx = TransactionRequest::new()
                .from(from)
                .to(to)
                .data(data)
                .value(value)
                .nonce(nonce)
                .chain_id(chain_id)
                .gas_price(*price);
            TypedTransaction::Legacy(tx)
        }
        GasPrice::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            let tx = Eip1559TransactionRequest::new()
                .from(from)
                .to(to)
                .data(data)
                .value(value)
                .nonce(nonce)
                .chain_id(chain_id)
                .max_fee_per_gas(*max_fee_per_gas)
                .max_priority_fee_per_gas(*max_priority_fee_per_gas);
            TypedTransaction::Eip1559(tx)
        }
    }
}
