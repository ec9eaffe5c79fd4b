//! # Optimistic Mutation Layer
//!
//! Every operation follows the same protocol against the [`ProfileCache`]:
//!
//! 0. Reload a stale entry, so the next profile builds on the server copy
//!    rather than on the previous write's optimistic guess
//! 1. Cancel in-flight reads of the handle
//! 2. Snapshot the cached profile
//! 3. Write the locally computed next profile
//! 4. Await the store call
//! 5. Success: invalidate so the next read reconciles with the server.
//!    Failure: restore the snapshot verbatim, or invalidate when there was
//!    none.
//!
//! Local validation failures return before step 3 and never reach the
//! store.

use crate::cache::ProfileCache;
use crate::errors::{EditorError, EditorResult};
use crate::notifier::{Notifier, SaveNotice};
use bio_common::{Handle, IdentityProvider, ServiceError, ServiceResult};
use bio_layout::{
    add_block, apply_layout_payload, delete_block, patch_content, Block, BlockContent,
    BlockPosition, ContentPatch, Page, Profile,
};
use bio_store::{PageSettings, PageStore};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Id prefix of blocks shown before the store has assigned a real id
pub const TEMP_BLOCK_PREFIX: &str = "temp-";

pub struct OptimisticMutator<S> {
    store: Arc<S>,
    cache: ProfileCache,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
}

impl<S> Clone for OptimisticMutator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            identity: Arc::clone(&self.identity),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: PageStore> OptimisticMutator<S> {
    pub fn new(
        store: Arc<S>,
        cache: ProfileCache,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            cache,
            identity,
            notifier,
        }
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.cache
    }

    async fn run<T, N, Fut>(
        &self,
        operation: &'static str,
        handle: &Handle,
        next: N,
        call: Fut,
    ) -> EditorResult<T>
    where
        N: FnOnce(&Profile) -> EditorResult<Profile>,
        Fut: Future<Output = ServiceResult<T>>,
    {
        if self.cache.get(handle).is_some() && self.cache.is_stale(handle) {
            let viewer = self.identity.current();
            let reloaded = self
                .cache
                .fetch(handle, || self.store.fetch_profile(handle, viewer.as_ref()))
                .await;
            if let Err(error) = reloaded {
                warn!(operation, %error, "Reload before write failed");
                return self.reject(operation, error);
            }
        }

        self.cache.cancel_refetch(handle);
        let snapshot = self.cache.snapshot(handle);

        if let Some(current) = &snapshot {
            match next(current) {
                Ok(profile) => self.cache.set(handle, profile),
                Err(e) => {
                    self.notify_error(operation, &e);
                    return Err(e);
                }
            }
        }
        self.notifier.notify(SaveNotice::Loading { operation });

        match call.await {
            Ok(value) => {
                self.cache.invalidate(handle);
                self.notifier.notify(SaveNotice::Success { operation });
                info!(operation, "Persisted");
                Ok(value)
            }
            Err(error) => {
                match snapshot {
                    Some(previous) => self.cache.set(handle, previous),
                    None => self.cache.invalidate(handle),
                }
                warn!(operation, %error, "Rolled back optimistic update");
                let error = EditorError::from(error);
                self.notify_error(operation, &error);
                Err(error)
            }
        }
    }

    fn notify_error(&self, operation: &'static str, error: &EditorError) {
        self.notifier.notify(SaveNotice::Error {
            operation,
            error: error.to_service_error(),
        });
    }

    fn reject<T>(&self, operation: &'static str, error: ServiceError) -> EditorResult<T> {
        let error = EditorError::from(error);
        self.notify_error(operation, &error);
        Err(error)
    }

    /// Append a block. The cache shows it under a temporary id until the
    /// next read returns the server's copy.
    #[instrument(skip(self, content), fields(handle = %handle, kind = %content.kind()))]
    pub async fn add_block(
        &self,
        handle: &Handle,
        page_id: &str,
        content: BlockContent,
    ) -> EditorResult<Block> {
        if let Err(reason) = content.validate() {
            return self.reject("block", ServiceError::Validation(reason));
        }

        let actor = self.identity.current();
        let temp = Block::new(format!("{TEMP_BLOCK_PREFIX}{}", Uuid::new_v4()), content.clone());
        self.run(
            "block",
            handle,
            |profile| {
                Ok(Profile {
                    page: profile.page.clone(),
                    blocks: add_block(&profile.blocks, temp)?,
                })
            },
            self.store.create_block(actor.as_ref(), page_id, content),
        )
        .await
    }

    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn delete_block(&self, handle: &Handle, block_id: &str) -> EditorResult<()> {
        let actor = self.identity.current();
        self.run(
            "delete",
            handle,
            |profile| {
                Ok(Profile {
                    page: profile.page.clone(),
                    blocks: delete_block(&profile.blocks, block_id)?,
                })
            },
            self.store.delete_block(actor.as_ref(), block_id),
        )
        .await
    }

    /// Persist positions produced by a drag
    pub async fn reorder(
        &self,
        handle: &Handle,
        page_id: &str,
        positions: Vec<BlockPosition>,
    ) -> EditorResult<()> {
        self.persist_layout("reorder", handle, page_id, positions).await
    }

    /// Persist positions produced by a preset resize
    pub async fn resize(
        &self,
        handle: &Handle,
        page_id: &str,
        positions: Vec<BlockPosition>,
    ) -> EditorResult<()> {
        self.persist_layout("resize", handle, page_id, positions).await
    }

    /// Persist the whole layout outside of a drag or resize
    pub async fn save_layout(
        &self,
        handle: &Handle,
        page_id: &str,
        positions: Vec<BlockPosition>,
    ) -> EditorResult<()> {
        self.persist_layout("layout", handle, page_id, positions).await
    }

    #[instrument(skip(self, positions), fields(handle = %handle, entries = positions.len()))]
    async fn persist_layout(
        &self,
        operation: &'static str,
        handle: &Handle,
        page_id: &str,
        positions: Vec<BlockPosition>,
    ) -> EditorResult<()> {
        let actor = self.identity.current();
        let next_positions = positions.clone();
        self.run(
            operation,
            handle,
            |profile| {
                Ok(Profile {
                    page: profile.page.clone(),
                    blocks: apply_layout_payload(&profile.blocks, &next_positions),
                })
            },
            self.store.save_layout(actor.as_ref(), page_id, positions),
        )
        .await
    }

    #[instrument(skip(self, patch), fields(handle = %handle, kind = %patch.kind()))]
    pub async fn update_content(
        &self,
        handle: &Handle,
        block_id: &str,
        patch: ContentPatch,
    ) -> EditorResult<Block> {
        let actor = self.identity.current();
        let next_patch = patch.clone();
        self.run(
            "content",
            handle,
            |profile| {
                Ok(Profile {
                    page: profile.page.clone(),
                    blocks: patch_content(&profile.blocks, block_id, &next_patch)?,
                })
            },
            self.store.update_content(actor.as_ref(), block_id, patch),
        )
        .await
    }

    /// Edit page settings. A handle change invalidates both the old and the
    /// new key on success.
    #[instrument(skip(self, settings), fields(handle = %handle))]
    pub async fn update_page(
        &self,
        handle: &Handle,
        page_id: &str,
        settings: PageSettings,
    ) -> EditorResult<Page> {
        let new_handle = match settings.parsed_handle() {
            Ok(parsed) => parsed,
            Err(error) => return self.reject("page", error),
        };
        if let Err(error) = settings.validate() {
            return self.reject("page", error);
        }

        let actor = self.identity.current();
        let next_settings = settings.clone();
        let page = self
            .run(
                "page",
                handle,
                |profile| {
                    Ok(Profile {
                        page: next_settings.apply(&profile.page)?,
                        blocks: profile.blocks.clone(),
                    })
                },
                self.store.update_page(actor.as_ref(), page_id, settings),
            )
            .await?;

        if let Some(new_handle) = new_handle.filter(|h| h != handle) {
            self.cache.invalidate(&new_handle);
            info!(from = %handle, to = %new_handle, "Handle changed");
        }
        Ok(page)
    }
}
