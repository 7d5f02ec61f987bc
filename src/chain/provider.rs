//! RPC access for the swap chain
//!
//! Reads go to one endpoint at a time and move to the next on failure.
//! Signed transactions are broadcast to every endpoint at once.

use crate::config::{ChainConfig, GasPriceStrategy};
use crate::error::{SwapError, SwapResult};
use crate::race::race_until_success;

use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Endpoints of the swap chain
pub struct ChainProvider {
    config: ChainConfig,
    /// One provider per configured RPC url
    http_providers: Vec<Provider<Http>>,
    /// Index of the endpoint reads go to
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider. No network access happens here.
    pub fn new(config: ChainConfig) -> SwapResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Chain {}: using RPC endpoint {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(SwapError::ChainConnection {
                chain_id: config.chain_id,
                message: "none of the configured RPC urls is usable".to_string(),
            });
        }

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Endpoint currently used for reads
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Move reads to the next endpoint
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.config.chain_id, next);
    }

    fn connection_error(&self, e: impl std::fmt::Display) -> SwapError {
        SwapError::ChainConnection {
            chain_id: self.config.chain_id,
            message: e.to_string(),
        }
    }

    /// Check that the node serves the configured chain
    pub async fn verify_chain_id(&self) -> SwapResult<()> {
        let remote = self
            .http()
            .get_chainid()
            .await
            .map_err(|e| self.connection_error(e))?;

        if remote != U256::from(self.config.chain_id) {
            return Err(SwapError::Config(format!(
                "RPC serves chain {} but chain {} is configured",
                remote, self.config.chain_id
            )));
        }

        info!("Connected to {} (chain {})", self.config.name, self.config.chain_id);
        Ok(())
    }

    /// Get current block number with failover
    pub async fn get_block_number(&self) -> SwapResult<u64> {
        for _ in 0..self.http_providers.len() {
            match self.http().get_block_number().await {
                Ok(block) => return Ok(block.as_u64()),
                Err(e) => {
                    warn!(
                        "Failed to get block number from chain {}: {}",
                        self.config.chain_id, e
                    );
                    self.failover();
                }
            }
        }

        Err(self.connection_error("All providers failed"))
    }

    /// Transaction count of an account, including pending transactions
    pub async fn get_transaction_count(&self, address: Address) -> SwapResult<u64> {
        let nonce = self
            .http()
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| SwapError::Nonce {
                chain_id: self.config.chain_id,
                message: e.to_string(),
            })?;

        Ok(nonce.as_u64())
    }

    /// Native balance of an account
    pub async fn get_balance(&self, address: Address) -> SwapResult<U256> {
        self.http()
            .get_balance(address, None)
            .await
            .map_err(|e| self.connection_error(e))
    }

    /// Get transaction receipt
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> SwapResult<Option<TransactionReceipt>> {
        self.http()
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| self.connection_error(e))
    }

    /// Estimate gas for a transaction
    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> SwapResult<U256> {
        self.http()
            .estimate_gas(tx, None)
            .await
            .map_err(|e| SwapError::GasEstimation(e.to_string()))
    }

    /// Broadcast a signed transaction to every RPC endpoint, first acceptance wins
    pub async fn send_raw_transaction(&self, signed: Bytes) -> SwapResult<H256> {
        let sends = self.http_providers.iter().map(|provider| {
            let signed = signed.clone();
            async move {
                provider
                    .send_raw_transaction(signed)
                    .await
                    .map(|pending| pending.tx_hash())
            }
        });

        race_until_success(sends).await
    }

    /// Get current gas price based on chain strategy
    pub async fn get_gas_price(&self) -> SwapResult<GasPrice> {
        match self.config.gas_price_strategy {
            GasPriceStrategy::Legacy => {
                let price = self
                    .http()
                    .get_gas_price()
                    .await
                    .map_err(|e| SwapError::GasEstimation(e.to_string()))?;
                Ok(GasPrice::Legacy(std::cmp::min(price, self.max_gas_price())))
            }
            GasPriceStrategy::Eip1559 => {
                let (max_fee, priority_fee) = self.estimate_eip1559_fees().await?;
                Ok(GasPrice::Eip1559 {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority_fee,
                })
            }
        }
    }

    /// Estimate EIP-1559 fees
    async fn estimate_eip1559_fees(&self) -> SwapResult<(U256, U256)> {
        let block = self
            .http()
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| SwapError::GasEstimation(e.to_string()))?
            .ok_or_else(|| SwapError::GasEstimation("No latest block".to_string()))?;

        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| SwapError::GasEstimation("No base fee in block".to_string()))?;

        let priority_fee = U256::from(2_000_000_000u64); // 2 gwei

        // Max fee = 2 * base_fee + priority_fee
        let max_fee = base_fee * 2 + priority_fee;
        let max_fee = std::cmp::min(max_fee, self.max_gas_price());

        Ok((max_fee, std::cmp::min(priority_fee, max_fee)))
    }

    fn max_gas_price(&self) -> U256 {
        U256::from(self.config.max_gas_price_gwei) * U256::from(1_000_000_000u64)
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        match self.get_block_number().await {
            Ok(_) => true,
            Err(e) => {
                error!("Health check failed for chain {}: {}", self.config.chain_id, e);
                false
            }
        }
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }
}

/// Gas price types
#[derive(Debug, Clone, PartialEq)]
pub enum GasPrice {
    Legacy(U256),
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rpc_urls: Vec<&str>) -> ChainConfig {
        ChainConfig {
            chain_id: 42220,
            name: "celo".to_string(),
            rpc_urls: rpc_urls.into_iter().map(String::from).collect(),
            gas_price_strategy: GasPriceStrategy::Legacy,
            max_gas_price_gwei: 50,
        }
    }

    #[test]
    fn test_rejects_when_no_provider_is_valid() {
        let result = ChainProvider::new(config(vec!["not a url"]));
        assert!(matches!(result, Err(SwapError::ChainConnection { .. })));
    }

    #[test]
    fn test_failover_cycles_providers() {
        let provider =
            ChainProvider::new(config(vec!["http://127.0.0.1:1", "http://127.0.0.1:2"])).unwrap();
        assert_eq!(provider.current_provider.load(Ordering::Relaxed), 0);
        provider.failover();
        assert_eq!(provider.current_provider.load(Ordering::Relaxed), 1);
        provider.failover();
        assert_eq!(provider.current_provider.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_max_gas_price_in_wei() {
        let provider = ChainProvider::new(config(vec!["http://127.0.0.1:1"])).unwrap();
        assert_eq!(provider.max_gas_price(), U256::from(50_000_000_000u64));
    }

    #[tokio::test]
    async fn test_health_check_fails_without_node() {
        let provider = ChainProvider::new(config(vec!["http://127.0.0.1:1"])).unwrap();
        assert!(!provider.health_check().await);
    }
}
