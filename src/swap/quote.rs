//! Execution quote client
//!
//! Asks the swap execution service for the transaction that performs an
//! approved swap.

use super::types::{AmountType, ExecuteSwapResponse, SwapInfo, ValidatedSwapTransaction};
use crate::config::SwapConfig;
use crate::error::{SwapError, SwapResult};

use async_trait::async_trait;
use ethers::types::Address;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Query sent to the execute endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionQuoteRequest {
    pub buy_token: String,
    pub sell_token: String,
    pub amount_type: AmountType,
    pub amount: String,
    pub user_address: Address,
}

impl ExecutionQuoteRequest {
    /// Derive the request from the confirmed quote and the sending wallet
    pub fn for_swap(swap: &SwapInfo, user_address: Address) -> Self {
        let quote = &swap.unvalidated_swap_transaction;
        let amount_type = AmountType::for_field(swap.user_input.updated_field);

        Self {
            buy_token: quote.buy_token_address.clone(),
            sell_token: quote.sell_token_address.clone(),
            amount_type,
            amount: amount_type.amount_of(quote).to_string(),
            user_address,
        }
    }

    /// Query parameters in the order the service documents them
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("buyToken", self.buy_token.clone()),
            ("sellToken", self.sell_token.clone()),
            (self.amount_type.query_key(), self.amount.clone()),
            ("userAddress", format!("{:?}", self.user_address)),
        ]
    }
}

/// Source of execution-ready swap transactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionQuoteClient: Send + Sync {
    async fn fetch_execution_quote(
        &self,
        request: &ExecutionQuoteRequest,
    ) -> SwapResult<ValidatedSwapTransaction>;
}

/// HTTP client for the execute endpoint
#[derive(Debug, Clone)]
pub struct HttpExecutionQuoteClient {
    execute_swap_url: String,
    http: Client,
}

impl HttpExecutionQuoteClient {
    pub fn new(config: &SwapConfig) -> SwapResult<Self> {
        Self::with_timeout(config.execute_swap_url.clone(), config.quote_timeout())
    }

    pub fn with_timeout(execute_swap_url: String, timeout: Duration) -> SwapResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SwapError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            execute_swap_url,
            http,
        })
    }
}

#[async_trait]
impl ExecutionQuoteClient for HttpExecutionQuoteClient {
    async fn fetch_execution_quote(
        &self,
        request: &ExecutionQuoteRequest,
    ) -> SwapResult<ValidatedSwapTransaction> {
        let started = Instant::now();

        let response = self
            .http
            .get(&self.execute_swap_url)
            .query(&request.query_pairs())
            .send()
            .await?;

        crate::metrics::record_quote_latency(started.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            error!("Swap failed with status: {}", status.as_u16());
            return Err(SwapError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let parsed: ExecuteSwapResponse = serde_json::from_slice(&body)
            .map_err(|e| SwapError::Parse(format!("execute swap response: {}", e)))?;

        debug!(
            "Received validated swap transaction for {} -> {}",
            request.sell_token, request.buy_token
        );
        Ok(parsed.validated_swap_transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap::types::{Field, SwapAmount, SwapTransaction, SwapUserInput};
    use crate::tx::RawTransaction;

    fn swap(field: Field) -> SwapInfo {
        SwapInfo {
            user_input: SwapUserInput {
                from_token: "0xsell".to_string(),
                to_token: "0xbuy".to_string(),
                swap_amount: SwapAmount::default(),
                updated_field: field,
            },
            unvalidated_swap_transaction: SwapTransaction {
                buy_amount: "10".to_string(),
                sell_amount: "20".to_string(),
                buy_token_address: "0xbuy".to_string(),
                sell_token_address: "0xsell".to_string(),
                ..Default::default()
            },
            approve_transaction: RawTransaction::default(),
        }
    }

    #[test]
    fn test_request_for_buy_side_edit() {
        let request = ExecutionQuoteRequest::for_swap(&swap(Field::To), Address::zero());
        assert_eq!(request.amount_type, AmountType::BuyAmount);
        assert_eq!(
            request.query_pairs(),
            vec![
                ("buyToken", "0xbuy".to_string()),
                ("sellToken", "0xsell".to_string()),
                ("buyAmount", "10".to_string()),
                (
                    "userAddress",
                    "0x0000000000000000000000000000000000000000".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_request_for_sell_side_edit() {
        let request = ExecutionQuoteRequest::for_swap(&swap(Field::From), Address::zero());
        assert_eq!(request.amount_type, AmountType::SellAmount);
        assert_eq!(request.amount, "20");
    }
}
