//! Gas estimation with safety buffers

use crate::chain::{ChainProvider, GasPrice};
use crate::error::SwapResult;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::U256;
use tracing::debug;

/// Gas estimator for swap transactions
pub struct GasEstimator {
    /// Buffer percentage for gas limit (e.g., 20 = 20% buffer)
    gas_limit_buffer_percent: u64,
    /// Buffer percentage for gas price
    gas_price_buffer_percent: u64,
}

impl GasEstimator {
    /// Create a new gas estimator
    pub fn new() -> Self {
        Self {
            gas_limit_buffer_percent: 20,
            gas_price_buffer_percent: 10,
        }
    }

    /// Estimate the gas limit for a transaction the quote left without one
    pub async fn estimate_gas_limit(
        &self,
        provider: &ChainProvider,
        tx: &TypedTransaction,
    ) -> SwapResult<U256> {
        let estimate = provider.estimate_gas(tx).await?;
        let limit = apply_buffer(estimate, self.gas_limit_buffer_percent);
        debug!("Gas estimate {} buffered to {}", estimate, limit);
        Ok(limit)
    }

    /// Get buffered gas price for the chain
    pub async fn get_gas_price(&self, provider: &ChainProvider) -> SwapResult<GasPrice> {
        let gas_price = provider.get_gas_price().await?;
        let buffered = self.buffer_gas_price(&gas_price);

        debug!("Gas price for chain {}: {:?}", provider.chain_id(), buffered);
        Ok(buffered)
    }

    fn buffer_gas_price(&self, gas_price: &GasPrice) -> GasPrice {
        match gas_price {
            GasPrice::Legacy(price) => {
                GasPrice::Legacy(apply_buffer(*price, self.gas_price_buffer_percent))
            }
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => GasPrice::Eip1559 {
                max_fee_per_gas: apply_buffer(*max_fee_per_gas, self.gas_price_buffer_percent),
                max_priority_fee_per_gas: apply_buffer(
                    *max_priority_fee_per_gas,
                    self.gas_price_buffer_percent,
                ),
            },
        }
    }

    /// Calculate worst-case cost in wei
    pub fn calculate_cost(gas_limit: U256, gas_price: &GasPrice) -> U256 {
        match gas_price {
            GasPrice::Legacy(price) => gas_limit.saturating_mul(*price),
            GasPrice::Eip1559 { max_fee_per_gas, .. } => gas_limit.saturating_mul(*max_fee_per_gas),
        }
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_buffer(value: U256, percent: u64) -> U256 {
    value.saturating_add(value.saturating_mul(U256::from(percent)) / 100)
}
