//! In-memory registry of protected messages keyed by block id.
//!
//! Ids are handed out by an atomic counter so encoders never serialize on
//! allocation; the map itself sits behind a readers-writer lock, letting
//! lookups proceed concurrently. Messages are immutable once stored.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::config::FecConfig;
use crate::error::{Error, Result};
use crate::model::ProtectedMessage;

/// First id handed out by a fresh store
const FIRST_BLOCK_ID: u64 = 1;

/// Process-lifetime store of [`ProtectedMessage`]s.
///
/// When a capacity is set, inserting past it evicts the oldest block.
pub struct MessageStore {
    next_id: AtomicU64,
    capacity: Option<usize>,
    messages: RwLock<BTreeMap<u64, Arc<ProtectedMessage>>>,
}

impl MessageStore {
    /// Create an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(FIRST_BLOCK_ID),
            capacity: None,
            messages: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store that keeps at most `capacity` messages.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::new()
        }
    }

    pub fn from_config(config: &FecConfig) -> Self {
        match config.store_capacity {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    /// Allocate the next block id.
    pub fn reserve_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Store a message under its (previously reserved) block id.
    ///
    /// # Errors
    /// `InvalidInput` if the id was never reserved or is already occupied.
    pub fn put(&self, message: Arc<ProtectedMessage>) -> Result<u64> {
        let id = message.block_id;
        if id < FIRST_BLOCK_ID || id >= self.next_id.load(Ordering::Relaxed) {
            return Err(Error::InvalidInput(format!(
                "block id {} was not allocated by this store",
                id
            )));
        }

        let mut messages = self.messages.write();
        if messages.contains_key(&id) {
            return Err(Error::InvalidInput(format!("block {} already stored", id)));
        }
        messages.insert(id, message);

        if let Some(capacity) = self.capacity {
            while messages.len() > capacity {
                if let Some((evicted, _)) = messages.pop_first() {
                    debug!("evicted block {} (capacity {})", evicted, capacity);
                }
            }
        }

        Ok(id)
    }

    /// Retrieve a message by block id.
    ///
    /// # Errors
    /// `BlockNotFound` if the id was never stored or has been evicted.
    pub fn get(&self, block_id: u64) -> Result<Arc<ProtectedMessage>> {
        self.messages
            .read()
            .get(&block_id)
            .cloned()
            .ok_or(Error::BlockNotFound(block_id))
    }

    pub fn contains(&self, block_id: u64) -> bool {
        self.messages.read().contains_key(&block_id)
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Resident block ids in ascending order
    pub fn block_ids(&self) -> Vec<u64> {
        self.messages.read().keys().copied().collect()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
