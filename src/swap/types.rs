//! Swap request and quote payloads

use crate::tx::RawTransaction;

use serde::{Deserialize, Serialize};

/// Side of the swap the user typed an amount into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Field {
    #[serde(alias = "from")]
    From,
    #[serde(alias = "to")]
    To,
}

/// Amounts entered per side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapAmount {
    #[serde(rename = "FROM", alias = "from", default)]
    pub from: String,
    #[serde(rename = "TO", alias = "to", default)]
    pub to: String,
}

/// What the user asked to swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapUserInput {
    pub from_token: String,
    pub to_token: String,
    #[serde(default)]
    pub swap_amount: SwapAmount,
    pub updated_field: Field,
}

/// Quote as returned by the swap aggregator.
///
/// The same shape describes the indicative quote shown to the user and the
/// validated transaction returned by the execution endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransaction {
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub guaranteed_price: String,
    #[serde(default)]
    pub buy_amount: String,
    #[serde(default)]
    pub sell_amount: String,
    #[serde(default)]
    pub buy_token_address: String,
    #[serde(default)]
    pub sell_token_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowance_target: Option<String>,
    #[serde(flatten)]
    pub transaction: RawTransaction,
}

/// Quote the user confirmed on screen, not yet checked for slippage
pub type UnvalidatedSwapTransaction = SwapTransaction;

/// Execution-ready transaction from the execute endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatedSwapTransaction(pub SwapTransaction);

impl ValidatedSwapTransaction {
    /// Parameters to broadcast
    pub fn raw_transaction(&self) -> RawTransaction {
        self.0.transaction.clone()
    }
}

/// Body of a successful execute-endpoint response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSwapResponse {
    pub validated_swap_transaction: ValidatedSwapTransaction,
}

/// Everything needed to submit one swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    pub user_input: SwapUserInput,
    pub unvalidated_swap_transaction: UnvalidatedSwapTransaction,
    pub approve_transaction: RawTransaction,
}

/// Which amount the execute endpoint is queried with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountType {
    BuyAmount,
    SellAmount,
}

impl AmountType {
    /// The side the user edited fixes the amount; editing `To` fixes what is bought
    pub fn for_field(field: Field) -> Self {
        match field {
            Field::To => AmountType::BuyAmount,
            Field::From => AmountType::SellAmount,
        }
    }

    pub fn query_key(&self) -> &'static str {
        match self {
            AmountType::BuyAmount => "buyAmount",
            AmountType::SellAmount => "sellAmount",
        }
    }

    pub fn amount_of<'a>(&self, quote: &'a SwapTransaction) -> &'a str {
        match self {
            AmountType::BuyAmount => &quote.buy_amount,
            AmountType::SellAmount => &quote.sell_amount,
        }
    }
}
