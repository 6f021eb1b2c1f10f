//! Settlement event fan-out.
//!
//! Every committed settlement record is pushed to subscribers in commit
//! order. Each subscriber has an independent buffer; a slow subscriber
//! observes `Lagged` and must resynchronise from the database.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use geyser_types::events::SettlementRecord;
use geyser_types::VaultId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A committed settlement record with its bus sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position in the bus since daemon start, starting at 1.
    pub sequence: u64,
    pub record: SettlementRecord,
}

/// Filter over settlement records by kind and vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Record kinds to keep, e.g. "withdrawn".
    pub kinds: Option<Vec<String>>,
    /// Keep only records concerning this vault.
    pub vault: Option<VaultId>,
}

/// Event bus for broadcasting settlement records to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit a record to all subscribers.
    pub fn emit(&self, record: SettlementRecord) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        // no subscribers is fine
        let _ = self.sender.send(Event { sequence, record });
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// True if the filter keeps every record.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_none() && self.vault.is_none()
    }

    /// Check if a record matches this filter.
    pub fn matches(&self, record: &SettlementRecord) -> bool {
        if let Some(ref kinds) = self.kinds {
            let name = record.kind.name();
            if !kinds.iter().any(|k| k == name) {
                return false;
            }
        }

        if let Some(ref vault) = self.vault {
            if record.kind.vault() != Some(vault) {
                return false;
            }
        }

        true
    }
}
