//! Nonce management for the swap wallet
//!
//! Handles:
//! - Local nonce allocation so concurrent swaps never share a nonce
//! - Release of nonces whose transaction never reached the network
//! - Resync with the on-chain transaction count

use crate::error::{SwapError, SwapResult};

use ethers::types::{Address, H256};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct NonceState {
    /// Next nonce to hand out
    current: u64,
    /// Broadcast transactions awaiting a receipt: nonce -> tx hash
    pending: HashMap<u64, H256>,
    /// Nonces below `current` handed back unused; reused lowest first
    released: BTreeSet<u64>,
    /// Highest nonce known to be mined
    confirmed: Option<u64>,
}

/// Allocates nonces for one wallet on one chain
pub struct NonceManager {
    wallet_address: Address,
    chain_id: u64,
    state: Mutex<NonceState>,
}

impl NonceManager {
    /// Create a nonce manager starting at the on-chain transaction count
    pub fn new(wallet_address: Address, chain_id: u64, on_chain_nonce: u64) -> Self {
        debug!(
            "Initialized nonce for {:?} on chain {}: {}",
            wallet_address, chain_id, on_chain_nonce
        );

        Self {
            wallet_address,
            chain_id,
            state: Mutex::new(NonceState {
                current: on_chain_nonce,
                pending: HashMap::new(),
                released: BTreeSet::new(),
                confirmed: on_chain_nonce.checked_sub(1),
            }),
        }
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet_address
    }

    /// Get the next nonce, filling released gaps first
    pub async fn get_nonce(&self) -> SwapResult<u64> {
        let mut state = self.state.lock().await;
        if let Some(nonce) = state.released.pop_first() {
            debug!("Reusing released nonce {} on chain {}", nonce, self.chain_id);
            return Ok(nonce);
        }

        let nonce = state.current;
        state.current = state.current.checked_add(1).ok_or(SwapError::Nonce {
            chain_id: self.chain_id,
            message: "nonce overflow".to_string(),
        })?;

        debug!("Allocated nonce {} on chain {}", nonce, self.chain_id);
        Ok(nonce)
    }

    /// Mark a nonce as broadcast with its transaction hash
    pub async fn mark_pending(&self, nonce: u64, tx_hash: H256) {
        self.state.lock().await.pending.insert(nonce, tx_hash);
    }

    /// Confirm a nonce (transaction mined)
    pub async fn confirm_nonce(&self, nonce: u64) {
        let mut state = self.state.lock().await;
        state.pending.remove(&nonce);
        if state.confirmed.map_or(true, |c| nonce > c) {
            state.confirmed = Some(nonce);
        }
    }

    /// Release a nonce whose transaction never made it to the network
    pub async fn release_nonce(&self, nonce: u64) {
        let mut state = self.state.lock().await;
        state.pending.remove(&nonce);

        if nonce >= state.current {
            return;
        }

        if nonce + 1 == state.current {
            state.current = nonce;
            // Shrink the tail over gaps released earlier
            while let Some(&last) = state.released.last() {
                if last + 1 != state.current {
                    break;
                }
                state.released.remove(&last);
                state.current = last;
            }
        } else {
            debug!(
                "Released nonce {} on chain {} is reused before {}",
                nonce, self.chain_id, state.current
            );
            state.released.insert(nonce);
        }
    }

    /// Sync with the on-chain transaction count
    pub async fn sync(&self, on_chain_nonce: u64) {
        let mut state = self.state.lock().await;

        let expected = state.confirmed.map_or(0, |c| c + 1);
        if on_chain_nonce > expected {
            warn!(
                "Nonce gap detected on chain {}: expected {}, got {}",
                self.chain_id, expected, on_chain_nonce
            );
        }

        state.pending.retain(|nonce, _| *nonce >= on_chain_nonce);
        state.released.retain(|nonce| *nonce >= on_chain_nonce);
        state.confirmed = on_chain_nonce.checked_sub(1);

        if state.current < on_chain_nonce {
            state.current = on_chain_nonce;
        }
    }

    /// Number of broadcast transactions still waiting for a receipt
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}
