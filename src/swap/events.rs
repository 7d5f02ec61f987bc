//! Swap outcome events and the status they drive

use ethers::types::H256;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Emitted by the orchestrator as a swap progresses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwapEvent {
    /// Slippage check passed, approval is being submitted
    Approve { swap_id: Uuid },

    /// Approval mined, execute transaction is being submitted
    Execute { swap_id: Uuid, approval_tx_hash: H256 },

    /// Guaranteed price drifted past the tolerance; nothing was broadcast
    PriceChange { swap_id: Uuid },

    /// Execute transaction mined
    Success { swap_id: Uuid, execute_tx_hash: H256 },

    /// Swap abandoned
    Error { swap_id: Uuid, reason: String },
}

impl SwapEvent {
    pub fn swap_id(&self) -> Uuid {
        match self {
            SwapEvent::Approve { swap_id }
            | SwapEvent::Execute { swap_id, .. }
            | SwapEvent::PriceChange { swap_id }
            | SwapEvent::Success { swap_id, .. }
            | SwapEvent::Error { swap_id, .. } => *swap_id,
        }
    }

    /// Get event name for metrics
    pub fn name(&self) -> &'static str {
        match self {
            SwapEvent::Approve { .. } => "swap_approve",
            SwapEvent::Execute { .. } => "swap_execute",
            SwapEvent::PriceChange { .. } => "swap_price_change",
            SwapEvent::Success { .. } => "swap_success",
            SwapEvent::Error { .. } => "swap_error",
        }
    }
}

/// Observable state of a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Approving,
    Executing,
    PriceChanged,
    Succeeded,
    Failed { reason: String },
}

/// Event that does not apply to the current status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: SwapStatus,
    pub event: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not valid in state {:?}", self.event, self.from)
    }
}

impl SwapStatus {
    /// `PriceChanged`, `Succeeded` and `Failed` end a swap
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::PriceChanged | SwapStatus::Succeeded | SwapStatus::Failed { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Approving => "approving",
            SwapStatus::Executing => "executing",
            SwapStatus::PriceChanged => "price_changed",
            SwapStatus::Succeeded => "succeeded",
            SwapStatus::Failed { .. } => "failed",
        }
    }

    /// Status after `event`.
    ///
    /// Approval and execution happen at most once each and a swap never
    /// goes back to `Pending`.
    pub fn apply(&self, event: &SwapEvent) -> Result<SwapStatus, InvalidTransition> {
        let next = match (self, event) {
            (SwapStatus::Pending, SwapEvent::Approve { .. }) => SwapStatus::Approving,
            (SwapStatus::Pending, SwapEvent::PriceChange { .. }) => SwapStatus::PriceChanged,
            (SwapStatus::Approving, SwapEvent::Execute { .. }) => SwapStatus::Executing,
            (SwapStatus::Executing, SwapEvent::Success { .. }) => SwapStatus::Succeeded,
            (status, SwapEvent::Error { reason, .. }) if !status.is_terminal() => {
                SwapStatus::Failed {
                    reason: reason.clone(),
                }
            }
            _ => {
                return Err(InvalidTransition {
                    from: self.clone(),
                    event: event.name(),
                })
            }
        };

        Ok(next)
    }
}
