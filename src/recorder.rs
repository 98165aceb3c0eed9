use std::path::Path;

use crate::chain::{Block, ChainError, ChainStore};
use crate::events::FileEvent;
use crate::filter::EventFilter;

/// Feeds normalized events through the filter into the chain.
/// `Ok(None)` means the event was throttled or filtered out; that is
/// the common case and not an error.
pub struct EventRecorder {
    filter: EventFilter,
    store: ChainStore,
}

impl EventRecorder {
    pub fn new(store: ChainStore) -> Self {
        Self {
            filter: EventFilter::new(),
            store,
        }
    }

    pub fn record(&mut self, event: &FileEvent, now: f64) -> Result<Option<&Block>, ChainError> {
        if !self.filter.should_handle(&event.path, now) {
            return Ok(None);
        }

        let block = self.store.append_at(event.to_record(), now)?;
        Ok(Some(block))
    }

    /// Expired cooldowns are dead weight; drop them between events.
    pub fn sweep(&mut self, now: f64) {
        self.filter.evict_stale(now);
    }

    pub fn store(&self) -> &ChainStore {
        &self.store
    }

    pub fn chain_path(&self) -> &Path {
        self.store.path()
    }
}
