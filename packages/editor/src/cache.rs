//! Client-side profile cache keyed by handle.
//!
//! Cheap to clone; every clone shares the same entries. The lock is never
//! held across an `.await`.
//!
//! Each key carries an epoch. [`ProfileCache::cancel_refetch`] and
//! [`ProfileCache::invalidate`] bump it, and a [`ProfileCache::fetch`] that
//! started under an older epoch does not write its result back.

use bio_common::{Handle, ServiceResult};
use bio_layout::Profile;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct Entry {
    profile: Option<Profile>,
    stale: bool,
    epoch: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileCache {
    entries: Arc<Mutex<HashMap<Handle, Entry>>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Handle, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, handle: &Handle) -> Option<Profile> {
        self.entries().get(handle).and_then(|e| e.profile.clone())
    }

    /// Copy of the current entry, kept for rollback
    pub fn snapshot(&self, handle: &Handle) -> Option<Profile> {
        self.get(handle)
    }

    pub fn set(&self, handle: &Handle, profile: Profile) {
        let mut entries = self.entries();
        let entry = entries.entry(handle.clone()).or_default();
        entry.profile = Some(profile);
        entry.stale = false;
    }

    /// Stop in-flight reads of `handle` from overwriting the entry
    pub fn cancel_refetch(&self, handle: &Handle) {
        self.entries().entry(handle.clone()).or_default().epoch += 1;
    }

    /// Mark the entry stale so the next [`fetch`](Self::fetch) reloads it
    pub fn invalidate(&self, handle: &Handle) {
        let mut entries = self.entries();
        let entry = entries.entry(handle.clone()).or_default();
        entry.stale = true;
        entry.epoch += 1;
        debug!(handle = %handle, "Invalidated profile");
    }

    pub fn remove(&self, handle: &Handle) {
        self.entries().remove(handle);
    }

    /// True when there is no usable entry
    pub fn is_stale(&self, handle: &Handle) -> bool {
        self.entries()
            .get(handle)
            .map_or(true, |e| e.stale || e.profile.is_none())
    }

    /// Return the cached profile, loading it when missing or stale
    ///
    /// A load that resolves after the key was cancelled or invalidated is
    /// returned to the caller but not written to the cache; the caller gets
    /// the current cached entry instead when one exists.
    pub async fn fetch<F, Fut>(&self, handle: &Handle, loader: F) -> ServiceResult<Profile>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ServiceResult<Profile>>,
    {
        let epoch = {
            let mut entries = self.entries();
            let entry = entries.entry(handle.clone()).or_default();
            if let (Some(profile), false) = (&entry.profile, entry.stale) {
                return Ok(profile.clone());
            }
            entry.epoch
        };

        let loaded = loader().await?;

        let mut entries = self.entries();
        let entry = entries.entry(handle.clone()).or_default();
        if entry.epoch == epoch {
            entry.profile = Some(loaded.clone());
            entry.stale = false;
            Ok(loaded)
        } else {
            debug!(handle = %handle, "Discarding superseded read");
            Ok(entry.profile.clone().unwrap_or(loaded))
        }
    }
}
