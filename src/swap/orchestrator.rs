//! Swap submission flow
//!
//! One swap runs strictly in order:
//! 1. Check the guaranteed price against the quoted price
//! 2. Submit the token approval
//! 3. Fetch the execution transaction for the approved amount
//! 4. Submit the execution transaction
//!
//! Each step is awaited before the next one starts. Any failure ends the
//! swap with an `Error` event; nothing is retried and an approval that was
//! already mined is left in place.

use super::events::{SwapEvent, SwapStatus};
use super::quote::{ExecutionQuoteClient, ExecutionQuoteRequest};
use super::types::SwapInfo;
use super::validator::{parse_price, QuoteValidator};
use crate::error::SwapResult;
use crate::tx::{TransactionContext, TransactionSubmitter};

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const TAG: &str = "swap/orchestrator";

/// Capacity of the event channel; slow observers see `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Runs swaps and broadcasts their progress
pub struct SwapOrchestrator {
    submitter: Arc<dyn TransactionSubmitter>,
    quote_client: Arc<dyn ExecutionQuoteClient>,
    validator: QuoteValidator,
    event_tx: broadcast::Sender<SwapEvent>,
}

/// Status of one running swap, advanced only through events
struct SwapProgress<'a> {
    swap_id: Uuid,
    status: SwapStatus,
    event_tx: &'a broadcast::Sender<SwapEvent>,
}

impl SwapProgress<'_> {
    fn emit(&mut self, event: SwapEvent) {
        match self.status.apply(&event) {
            Ok(next) => {
                debug!("Swap {}: {} -> {}", self.swap_id, self.status.name(), next.name());
                self.status = next;
            }
            Err(e) => {
                error!("Swap {}: dropping event: {}", self.swap_id, e);
                return;
            }
        }

        crate::metrics::record_swap_event(&event);

        // No subscribers is fine; the returned status still reports the outcome
        let _ = self.event_tx.send(event);
    }
}

impl SwapOrchestrator {
    pub fn new(
        submitter: Arc<dyn TransactionSubmitter>,
        quote_client: Arc<dyn ExecutionQuoteClient>,
        max_slippage_percent: f64,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            submitter,
            quote_client,
            validator: QuoteValidator::new(max_slippage_percent),
            event_tx,
        }
    }

    /// Subscribe to events of all swaps run by this orchestrator
    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.event_tx.subscribe()
    }

    /// Run one swap to a terminal status
    pub async fn submit(&self, swap_id: Uuid, swap: SwapInfo) -> SwapStatus {
        let mut progress = SwapProgress {
            swap_id,
            status: SwapStatus::Pending,
            event_tx: &self.event_tx,
        };

        crate::metrics::record_swap_started();

        if let Err(e) = self.run(&mut progress, &swap).await {
            error!("{}: Error while swapping {}: {}", TAG, swap_id, e);
            progress.emit(SwapEvent::Error {
                swap_id,
                reason: e.to_string(),
            });
        }

        info!("Swap {} finished: {}", swap_id, progress.status.name());
        progress.status
    }

    async fn run(&self, progress: &mut SwapProgress<'_>, swap: &SwapInfo) -> SwapResult<()> {
        let swap_id = progress.swap_id;
        let quote = &swap.unvalidated_swap_transaction;

        let price = parse_price("price", &quote.price)?;
        let guaranteed_price = parse_price("guaranteedPrice", &quote.guaranteed_price)?;
        if !self.validator.validate(price, guaranteed_price) {
            warn!(
                "Swap {}: guaranteed price {} drifted from {} by {}% or more",
                swap_id,
                guaranteed_price,
                price,
                self.validator.max_slippage_percent()
            );
            progress.emit(SwapEvent::PriceChange { swap_id });
            return Ok(());
        }

        let wallet_address = self.submitter.wallet_address();

        progress.emit(SwapEvent::Approve { swap_id });
        debug!("Starting to swap approval for address: {:?}", wallet_address);
        let approval_tx_hash = self
            .submitter
            .submit(
                swap.approve_transaction.clone(),
                TransactionContext::new(TAG, "Swap/Approve"),
            )
            .await?;

        let request = ExecutionQuoteRequest::for_swap(swap, wallet_address);
        let validated = self.quote_client.fetch_execution_quote(&request).await?;

        progress.emit(SwapEvent::Execute {
            swap_id,
            approval_tx_hash,
        });
        debug!("Starting to swap execute for address: {:?}", wallet_address);
        let execute_tx_hash = self
            .submitter
            .submit(
                validated.raw_transaction(),
                TransactionContext::new(TAG, "Swap/Execute"),
            )
            .await?;

        progress.emit(SwapEvent::Success {
            swap_id,
            execute_tx_hash,
        });
        Ok(())
    }
}
