//! Correlation ids and the table of pending responses.

use crate::error::protocol::ProtocolError;
use crate::webos::subscription::ResponseHandler;

use common::ErrorLocation;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;

/// Constant prefix of every correlation id.
pub const ID_PREFIX: &str = "5d3ed79";

/// Number of zero-padded decimal digits after the prefix.
pub const ID_DIGITS: usize = 5;

/// Ids available per transport session (`00000` to `99999`).
pub const ID_SPACE: u32 = 100_000;

/// Per-session id generator.
///
/// Ids are only unique within one transport session; [`CorrelationIds::reset`]
/// is called whenever a new session starts. The generator refuses to wrap:
/// once [`ID_SPACE`] ids are issued every further call fails until the next reset.
#[derive(Debug, Default)]
pub(crate) struct CorrelationIds {
    issued: AtomicU32,
}

impl CorrelationIds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub(crate) fn next(&self) -> Result<String, ProtocolError> {
        let location = ErrorLocation::caller();

        let counter = self
            .issued
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < ID_SPACE).then_some(n + 1)
            })
            .map_err(|issued| ProtocolError::IdSpaceExhausted { issued, location })?;

        Ok(format!("{ID_PREFIX}{counter:0width$}", width = ID_DIGITS))
    }

    pub(crate) fn reset(&self) {
        self.issued.store(0, Ordering::SeqCst);
    }
}

/// Pending subscriptions keyed by correlation id.
///
/// Lookups clone the handler out under the read lock and invoke it after the
/// lock is released. [`CorrelationTable::clear`] runs under the write lock, so a
/// concurrent lookup sees either the whole old table or the empty one.
#[derive(Default)]
pub(crate) struct CorrelationTable {
    entries: RwLock<HashMap<String, Arc<dyn ResponseHandler>>>,
}

impl CorrelationTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, id: String, handler: Arc<dyn ResponseHandler>) {
        self.entries.write().await.insert(id, handler);
    }

    pub(crate) async fn get(&self, id: &str) -> Option<Arc<dyn ResponseHandler>> {
        self.entries.read().await.get(id).cloned()
    }

    /// Returns whether an entry was removed.
    pub(crate) async fn remove(&self, id: &str) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    /// Drop every pending entry. Returns how many were dropped.
    pub(crate) async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
