//! Error types for the swap submitter

use thiserror::Error;

/// Main error type for swap submission
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain connection error for chain {chain_id}: {message}")]
    ChainConnection { chain_id: u64, message: String },

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Submission of {context} failed: {message}")]
    Submission { context: String, message: String },

    #[error("Nonce error for chain {chain_id}: {message}")]
    Nonce { chain_id: u64, message: String },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Execution quote request failed with status {status}")]
    HttpStatus { status: u16 },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Insufficient balance on chain {chain_id}: have {have}, need {need}")]
    InsufficientBalance {
        chain_id: u64,
        have: String,
        need: String,
    },

    #[error("All attempts failed:\n{0}")]
    AllFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SwapError {
    /// Check if error is retryable at the transport level
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwapError::ChainConnection { .. } | SwapError::Timeout { .. } | SwapError::Http(_)
        )
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SwapError::Config(_) => "config",
            SwapError::ChainConnection { .. } => "chain_connection",
            SwapError::Transaction(_) => "transaction",
            SwapError::Submission { .. } => "submission",
            SwapError::Nonce { .. } => "nonce",
            SwapError::GasEstimation(_) => "gas_estimation",
            SwapError::Wallet(_) => "wallet",
            SwapError::HttpStatus { .. } => "http_status",
            SwapError::Http(_) => "http",
            SwapError::Parse(_) => "parse",
            SwapError::Timeout { .. } => "timeout",
            SwapError::InsufficientBalance { .. } => "insufficient_balance",
            SwapError::AllFailed(_) => "all_failed",
            SwapError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for SwapError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SwapError::Timeout {
                operation: "execution quote".to_string(),
            }
        } else if e.is_decode() {
            SwapError::Parse(e.to_string())
        } else {
            SwapError::Http(e.to_string())
        }
    }
}

/// Result type for swap operations
pub type SwapResult<T> = Result<T, SwapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SwapError::Timeout {
            operation: "send".to_string()
        }
        .is_retryable());
        assert!(!SwapError::HttpStatus { status: 500 }.is_retryable());
        assert!(!SwapError::Parse("bad body".to_string()).is_retryable());
    }

    #[test]
    fn test_http_status_message() {
        let err = SwapError::HttpStatus { status: 503 };
        assert_eq!(
            err.to_string(),
            "Execution quote request failed with status 503"
        );
        assert_eq!(err.kind(), "http_status");
    }
}
