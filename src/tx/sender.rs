//! Transaction sender with retry logic and receipt tracking

use super::builder::{BuiltTransaction, TransactionBuilder};
use super::nonce::NonceManager;
use super::raw::RawTransaction;
use super::{TransactionContext, TransactionSubmitter};
use crate::chain::ChainProvider;
use crate::config::{SubmitterConfig, WalletConfig};
use crate::error::{SwapError, SwapResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Signs with a local key and broadcasts through the chain provider
pub struct TransactionSender {
    /// Chain provider
    provider: Arc<ChainProvider>,
    /// Normalizes quote transactions
    builder: TransactionBuilder,
    /// Nonce manager
    nonce_manager: NonceManager,
    /// Wallet for signing
    wallet: LocalWallet,
    /// Configuration
    config: SubmitterConfig,
}

impl TransactionSender {
    /// Create a sender with the wallet named in the configuration
    pub async fn new(
        provider: Arc<ChainProvider>,
        wallet_config: &WalletConfig,
        config: SubmitterConfig,
    ) -> SwapResult<Self> {
        let wallet = Self::load_wallet(wallet_config)?;
        Self::with_wallet(provider, wallet, config).await
    }

    /// Create a sender for an already loaded wallet
    pub async fn with_wallet(
        provider: Arc<ChainProvider>,
        wallet: LocalWallet,
        config: SubmitterConfig,
    ) -> SwapResult<Self> {
        let wallet = wallet.with_chain_id(provider.chain_id());
        let wallet_address = wallet.address();

        let on_chain_nonce = provider.get_transaction_count(wallet_address).await?;
        let nonce_manager = NonceManager::new(wallet_address, provider.chain_id(), on_chain_nonce);

        info!("Transaction sender initialized with wallet: {:?}", wallet_address);

        Ok(Self {
            builder: TransactionBuilder::new(provider.clone()),
            provider,
            nonce_manager,
            wallet,
            config,
        })
    }

    /// Load wallet from the configured environment variable
    fn load_wallet(wallet_config: &WalletConfig) -> SwapResult<LocalWallet> {
        let key = std::env::var(&wallet_config.private_key_env).map_err(|_| {
            SwapError::Wallet(format!(
                "No wallet configured. Set {}",
                wallet_config.private_key_env
            ))
        })?;

        key.trim()
            .parse::<LocalWallet>()
            .map_err(|e| SwapError::Wallet(format!("Invalid private key: {}", e)))
    }

    async fn submit_inner(
        &self,
        raw: &RawTransaction,
        context: &TransactionContext,
    ) -> SwapResult<H256> {
        let from = self.wallet.address();
        if let Some(requested) = raw.from {
            if requested != from {
                return Err(SwapError::Wallet(format!(
                    "transaction expects sender {:?}, wallet is {:?}",
                    requested, from
                )));
            }
        }

        let nonce = self.nonce_manager.get_nonce().await?;

        let built = match self.prepare(raw, from, nonce).await {
            Ok(built) => built,
            Err(e) => {
                self.nonce_manager.release_nonce(nonce).await;
                return Err(e);
            }
        };

        let tx_hash = self.send_with_retry(&built.tx, nonce, context).await?;
        self.nonce_manager.mark_pending(nonce, tx_hash).await;
        crate::metrics::record_tx_submitted(&context.description);

        let receipt = self.wait_for_receipt(tx_hash).await?;
        self.nonce_manager.confirm_nonce(nonce).await;

        if receipt.status == Some(U64::zero()) {
            return Err(SwapError::Submission {
                context: context.description.clone(),
                message: format!("transaction {:?} reverted", tx_hash),
            });
        }

        info!(
            "{} mined in block {:?}: {:?}",
            context, receipt.block_number, tx_hash
        );
        Ok(tx_hash)
    }

    /// Build the transaction and check the wallet can pay for it
    async fn prepare(
        &self,
        raw: &RawTransaction,
        from: Address,
        nonce: u64,
    ) -> SwapResult<BuiltTransaction> {
        let built = self.builder.build(raw, from, nonce).await?;

        let balance = self.provider.get_balance(from).await?;
        let need = built.max_cost();
        if balance < need {
            return Err(SwapError::InsufficientBalance {
                chain_id: self.provider.chain_id(),
                have: balance.to_string(),
                need: need.to_string(),
            });
        }

        Ok(built)
    }

    /// Send transaction with retry logic
    async fn send_with_retry(
        &self,
        tx: &TypedTransaction,
        nonce: u64,
        context: &TransactionContext,
    ) -> SwapResult<H256> {
        let signature = match self.wallet.sign_transaction(tx).await {
            Ok(sig) => sig,
            Err(e) => {
                error!("Failed to sign transaction: {}", e);
                self.nonce_manager.release_nonce(nonce).await;
                return Err(SwapError::Wallet(e.to_string()));
            }
        };
        let signed = tx.rlp_signed(&signature);
        let expected_hash = tx.hash(&signature);

        let mut attempts = 0;
        let max_attempts = self.config.max_retries;
        let mut last_error = None;

        while attempts < max_attempts {
            attempts += 1;

            let send_timeout = Duration::from_secs(self.config.send_timeout_secs);
            let result = timeout(
                send_timeout,
                self.provider.send_raw_transaction(signed.clone()),
            )
            .await;

            match result {
                Ok(Ok(tx_hash)) => {
                    info!(
                        "{} sent: {:?} (attempt {}/{})",
                        context, tx_hash, attempts, max_attempts
                    );
                    return Ok(tx_hash);
                }
                Ok(Err(e)) => {
                    let error_msg = e.to_string();

                    if error_msg.contains("already known") {
                        debug!("Node already has {:?}", expected_hash);
                        return Ok(expected_hash);
                    } else if error_msg.contains("nonce too low") {
                        warn!("Nonce too low, syncing with chain");
                        let on_chain = self
                            .provider
                            .get_transaction_count(self.wallet.address())
                            .await?;
                        self.nonce_manager.sync(on_chain).await;
                        return Err(SwapError::Nonce {
                            chain_id: self.provider.chain_id(),
                            message: "Nonce too low".to_string(),
                        });
                    } else if error_msg.contains("insufficient funds") {
                        self.nonce_manager.release_nonce(nonce).await;
                        return Err(SwapError::InsufficientBalance {
                            chain_id: self.provider.chain_id(),
                            have: "unknown".to_string(),
                            need: "unknown".to_string(),
                        });
                    }

                    last_error = Some(SwapError::Transaction(error_msg));
                }
                Err(_) => {
                    warn!("{} send timeout (attempt {})", context, attempts);
                    last_error = Some(SwapError::Timeout {
                        operation: "send transaction".to_string(),
                    });
                }
            }

            if attempts < max_attempts {
                sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        self.nonce_manager.release_nonce(nonce).await;

        Err(last_error.unwrap_or_else(|| SwapError::Transaction("Unknown error".to_string())))
    }

    /// Poll for the receipt until it appears or the receipt timeout elapses
    async fn wait_for_receipt(&self, tx_hash: H256) -> SwapResult<TransactionReceipt> {
        let poll_interval = Duration::from_millis(self.config.receipt_poll_interval_ms);

        let poll = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => warn!("Receipt lookup for {:?} failed: {}", tx_hash, e),
                }
                sleep(poll_interval).await;
            }
        };

        timeout(Duration::from_secs(self.config.receipt_timeout_secs), poll)
            .await
            .map_err(|_| SwapError::Timeout {
                operation: format!("receipt of {:?}", tx_hash),
            })
    }
}

#[async_trait]
impl TransactionSubmitter for TransactionSender {
    fn wallet_address(&self) -> Address {
        self.wallet.address()
    }

    async fn submit(&self, tx: RawTransaction, context: TransactionContext) -> SwapResult<H256> {
        debug!("Submitting {} from {:?}", context, self.wallet.address());

        self.submit_inner(&tx, &context).await.map_err(|e| {
            crate::metrics::record_tx_failed(&context.description);
            match e {
                SwapError::Submission { .. } => e,
                other => SwapError::Submission {
                    context: context.description.clone(),
                    message: other.to_string(),
                },
            }
        })
    }
}
