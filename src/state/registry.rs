//! In-memory record of submitted swaps

use crate::error::{SwapError, SwapResult};
use crate::swap::{SwapEvent, SwapStatus, SwapUserInput};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ethers::types::H256;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One swap as seen by the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct SwapRecord {
    pub id: Uuid,
    pub user_input: SwapUserInput,
    pub status: SwapStatus,
    pub approval_tx_hash: Option<H256>,
    pub execute_tx_hash: Option<H256>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Swap counts per status
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SwapStats {
    pub pending: u64,
    pub approving: u64,
    pub executing: u64,
    pub price_changed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Tracks every swap submitted since startup
#[derive(Default)]
pub struct SwapRegistry {
    swaps: DashMap<Uuid, SwapRecord>,
}

impl SwapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new swap in `Pending` and return its id
    pub fn register(&self, user_input: SwapUserInput) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();

        self.swaps.insert(
            id,
            SwapRecord {
                id,
                user_input,
                status: SwapStatus::Pending,
                approval_tx_hash: None,
                execute_tx_hash: None,
                created_at: now,
                updated_at: now,
            },
        );

        debug!("Registered swap {}", id);
        id
    }

    /// Apply an orchestrator event to its swap
    pub fn apply(&self, event: &SwapEvent) -> SwapResult<()> {
        let swap_id = event.swap_id();
        let mut record = self
            .swaps
            .get_mut(&swap_id)
            .ok_or_else(|| SwapError::Internal(format!("unknown swap {}", swap_id)))?;

        let next = record
            .status
            .apply(event)
            .map_err(|e| SwapError::Internal(format!("swap {}: {}", swap_id, e)))?;

        match event {
            SwapEvent::Execute {
                approval_tx_hash, ..
            } => record.approval_tx_hash = Some(*approval_tx_hash),
            SwapEvent::Success {
                execute_tx_hash, ..
            } => record.execute_tx_hash = Some(*execute_tx_hash),
            _ => {}
        }

        record.status = next;
        record.updated_at = Utc::now();
        Ok(())
    }

    /// Settle a swap whose earlier events were skipped.
    ///
    /// A terminal event ends a non-terminal record whatever its current
    /// status. Returns false when nothing changed.
    fn settle_after_lag(&self, event: &SwapEvent) -> bool {
        let Some(mut record) = self.swaps.get_mut(&event.swap_id()) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }

        let next = match event {
            SwapEvent::Success {
                execute_tx_hash, ..
            } => {
                record.execute_tx_hash = Some(*execute_tx_hash);
                SwapStatus::Succeeded
            }
            SwapEvent::PriceChange { .. } => SwapStatus::PriceChanged,
            SwapEvent::Error { reason, .. } => SwapStatus::Failed {
                reason: reason.clone(),
            },
            SwapEvent::Approve { .. } | SwapEvent::Execute { .. } => return false,
        };

        warn!(
            "Swap {} settled as {} after missed events",
            record.id,
            next.name()
        );
        record.status = next;
        record.updated_at = Utc::now();
        true
    }

    /// Drop finished swaps last updated more than `older_than` ago
    pub fn prune_terminal(&self, older_than: Duration) -> usize {
        let cutoff = Utc::now() - older_than;
        let before = self.swaps.len();
        self.swaps
            .retain(|_, record| !(record.status.is_terminal() && record.updated_at < cutoff));

        let pruned = before.saturating_sub(self.swaps.len());
        if pruned > 0 {
            debug!("Pruned {} finished swaps", pruned);
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.swaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<SwapRecord> {
        self.swaps.get(id).map(|r| r.clone())
    }

    /// Count swaps by status
    pub fn get_stats(&self) -> SwapStats {
        let mut stats = SwapStats::default();
        for entry in self.swaps.iter() {
            match entry.status {
                SwapStatus::Pending => stats.pending += 1,
                SwapStatus::Approving => stats.approving += 1,
                SwapStatus::Executing => stats.executing += 1,
                SwapStatus::PriceChanged => stats.price_changed += 1,
                SwapStatus::Succeeded => stats.succeeded += 1,
                SwapStatus::Failed { .. } => stats.failed += 1,
            }
        }
        stats
    }

    /// Apply events from an orchestrator until its channel closes
    pub async fn track(&self, mut events: broadcast::Receiver<SwapEvent>) {
        let mut lagged = false;
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = self.apply(&event) {
                        if !(lagged && self.settle_after_lag(&event)) {
                            warn!("Ignoring swap event: {}", e);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Swap registry lagged, {} events skipped", skipped);
                    lagged = true;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("Swap event stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swap::{Field, SwapAmount};

    fn input() -> SwapUserInput {
        SwapUserInput {
            from_token: "cUSD".to_string(),
            to_token: "CELO".to_string(),
            swap_amount: SwapAmount::default(),
            updated_field: Field::From,
        }
    }

    #[test]
    fn test_register_starts_pending() {
        let registry = SwapRegistry::new();
        let id = registry.register(input());

        let record = registry.get(&id).unwrap();
        assert_eq!(record.status, SwapStatus::Pending);
        assert_eq!(registry.get_stats().pending, 1);
    }

    #[test]
    fn test_apply_records_hashes() {
        let registry = SwapRegistry::new();
        let swap_id = registry.register(input());

        registry.apply(&SwapEvent::Approve { swap_id }).unwrap();
        registry
            .apply(&SwapEvent::Execute {
                swap_id,
                approval_tx_hash: H256::repeat_byte(1),
            })
            .unwrap();
        registry
            .apply(&SwapEvent::Success {
                swap_id,
                execute_tx_hash: H256::repeat_byte(2),
            })
            .unwrap();

        let record = registry.get(&swap_id).unwrap();
        assert_eq!(record.status, SwapStatus::Succeeded);
        assert_eq!(record.approval_tx_hash, Some(H256::repeat_byte(1)));
        assert_eq!(record.execute_tx_hash, Some(H256::repeat_byte(2)));
        assert!(record.updated_at >= record.created_at);
    }

    #[test]
    fn test_terminal_swap_rejects_events() {
        let registry = SwapRegistry::new();
        let swap_id = registry.register(input());

        registry.apply(&SwapEvent::PriceChange { swap_id }).unwrap();
        assert!(registry.apply(&SwapEvent::Approve { swap_id }).is_err());
        assert_eq!(registry.get(&swap_id).unwrap().status, SwapStatus::PriceChanged);
    }

    #[test]
    fn test_unknown_swap_is_an_error() {
        let registry = SwapRegistry::new();
        assert!(registry
            .apply(&SwapEvent::Approve {
                swap_id: Uuid::new_v4()
            })
            .is_err());
    }

    #[tokio::test]
    async fn test_track_applies_until_closed() {
        let registry = SwapRegistry::new();
        let swap_id = registry.register(input());
        let (tx, rx) = broadcast::channel(16);

        tx.send(SwapEvent::Approve { swap_id }).unwrap();
        tx.send(SwapEvent::Error {
            swap_id,
            reason: "Execution quote request failed with status 500".to_string(),
        })
        .unwrap();
        drop(tx);

        registry.track(rx).await;

        let stats = registry.get_stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_terminal_event_settles_swap_after_lag() {
        let registry = SwapRegistry::new();
        let swap_id = registry.register(input());
        let (tx, rx) = broadcast::channel(2);

        // Capacity 2: the Approve event is overwritten before it is read
        tx.send(SwapEvent::Approve { swap_id }).unwrap();
        tx.send(SwapEvent::Execute {
            swap_id,
            approval_tx_hash: H256::repeat_byte(1),
        })
        .unwrap();
        tx.send(SwapEvent::Success {
            swap_id,
            execute_tx_hash: H256::repeat_byte(2),
        })
        .unwrap();
        drop(tx);

        registry.track(rx).await;

        let record = registry.get(&swap_id).unwrap();
        assert_eq!(record.status, SwapStatus::Succeeded);
        assert_eq!(record.execute_tx_hash, Some(H256::repeat_byte(2)));
    }

    #[test]
    fn test_prune_drops_only_old_finished_swaps() {
        let registry = SwapRegistry::new();
        let running = registry.register(input());
        let finished = registry.register(input());
        let recent = registry.register(input());

        registry.apply(&SwapEvent::Approve { swap_id: running }).unwrap();
        registry
            .apply(&SwapEvent::PriceChange { swap_id: finished })
            .unwrap();
        registry
            .apply(&SwapEvent::PriceChange { swap_id: recent })
            .unwrap();

        let old = Utc::now() - Duration::hours(2);
        for id in [running, finished] {
            registry.swaps.get_mut(&id).unwrap().updated_at = old;
        }

        assert_eq!(registry.prune_terminal(Duration::hours(1)), 1);
        assert!(registry.get(&finished).is_none());
        assert!(registry.get(&running).is_some());
        assert!(registry.get(&recent).is_some());
        assert_eq!(registry.len(), 2);
    }
}
