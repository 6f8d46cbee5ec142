//! Swappable handle to the current Play server client.
//!
//! Credential changes replace the whole client.  Readers take a clone of
//! the current `Arc` for the duration of one call and never hold on to it.

use std::sync::{Arc, RwLock};

use play_proto::client::PlayApi;

#[derive(Clone, Default)]
pub struct ServiceCell {
    inner: Arc<RwLock<Option<Arc<dyn PlayApi>>>>,
}

impl ServiceCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The client in place right now, if credentials are configured.
    pub fn get(&self) -> Option<Arc<dyn PlayApi>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swap in a new client (or none), returning the previous one.
    pub fn replace(&self, service: Option<Arc<dyn PlayApi>>) -> Option<Arc<dyn PlayApi>> {
        let mut slot = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, service)
    }
}
