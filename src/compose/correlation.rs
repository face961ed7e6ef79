//! Correlation of logical topics with previously sent messages.
//!
//! A [`CorrelationEntry`] remembers which message was last sent for a
//! logical key in a room, so a later update can edit it in place.
//!
//! # Locking
//!
//! Each logical key owns one slot behind an async mutex. The lookup, the
//! send or edit, and the store happen while the slot is held, so two
//! concurrent updates for one key can never both decide to send.
//! Invalidating a key detaches its slot; an update still holding the old
//! slot finishes against it and its result is discarded.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::chat::Delivery;
use crate::identifiers::{LogicalKey, MessageId, RoomId};

// ============================================================================
// Types
// ============================================================================

/// Entries of one logical key, at most one per room.
type Slot = Arc<AsyncMutex<Vec<CorrelationEntry>>>;

// ============================================================================
// CorrelationEntry
// ============================================================================

/// Links a logical key and room to the message that can be edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationEntry {
    /// Topic of the message.
    pub logical_key: LogicalKey,
    /// Message to edit.
    pub message_id: MessageId,
    /// Room the message lives in.
    pub room: RoomId,
}

// ============================================================================
// CorrelationTable
// ============================================================================

/// Shared table of correlation entries.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    /// Slots by logical key.
    slots: Mutex<FxHashMap<LogicalKey, Slot>>,
}

impl CorrelationTable {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the slot for `key`, creating it if needed.
    ///
    /// Holds until the returned guard is dropped.
    pub async fn lock(&self, key: &LogicalKey) -> CorrelationGuard {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        CorrelationGuard {
            key: key.clone(),
            entries: slot.lock_owned().await,
        }
    }

    /// Drops every entry for `key`.
    ///
    /// Returns `true` if the key had a slot.
    pub fn invalidate(&self, key: &LogicalKey) -> bool {
        let removed = self.slots.lock().remove(key).is_some();
        if removed {
            debug!(key = %key, "Correlation invalidated");
        }
        removed
    }

    /// Drops every entry for every key.
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        if !slots.is_empty() {
            debug!(count = slots.len(), "Correlation table cleared");
        }
        slots.clear();
    }

    /// Returns a copy of the entries for `key`.
    ///
    /// Waits for any update holding the slot.
    pub async fn entries(&self, key: &LogicalKey) -> Vec<CorrelationEntry> {
        let slot = self.slots.lock().get(key).cloned();
        match slot {
            Some(slot) => slot.lock().await.clone(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// CorrelationGuard
// ============================================================================

/// Exclusive access to the entries of one logical key.
#[derive(Debug)]
pub struct CorrelationGuard {
    /// Key the guard covers.
    key: LogicalKey,
    /// Locked entries.
    entries: OwnedMutexGuard<Vec<CorrelationEntry>>,
}

impl CorrelationGuard {
    /// Returns the key this guard covers.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &LogicalKey {
        &self.key
    }

    /// Returns every entry for the key.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[CorrelationEntry] {
        &self.entries
    }

    /// Returns the entry for `room`, if any.
    #[must_use]
    pub fn find(&self, room: &RoomId) -> Option<&CorrelationEntry> {
        self.entries.iter().find(|entry| &entry.room == room)
    }

    /// Stores a delivery, replacing any entry for the same room.
    pub fn record(&mut self, delivery: &Delivery) {
        let entry = CorrelationEntry {
            logical_key: self.key.clone(),
            message_id: delivery.message_id.clone(),
            room: delivery.room.clone(),
        };

        match self.entries.iter_mut().find(|e| e.room == delivery.room) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Drops the entry for `room`.
    pub fn forget(&mut self, room: &RoomId) {
        self.entries.retain(|entry| &entry.room != room);
    }
}

// ============================================================================
// Tests
// ============================================================================
