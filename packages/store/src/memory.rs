//! In-memory page store.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Pages are keyed by id; each page owns its block list.

use crate::settings::PageSettings;
use crate::store::PageStore;
use async_trait::async_trait;
use bio_common::{Handle, ServiceError, ServiceResult, UserId};
use bio_layout::{
    add_block, apply_layout_payload, delete_block, patch::compare_blocks, patch_content, to_engine,
    to_storage, Block, BlockContent, BlockPosition, Breakpoint, ContentPatch, GridBounds, Page,
    Profile,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct StoreState {
    pages: HashMap<String, Page>,
    blocks: HashMap<String, Vec<Block>>,
    fail_next: Option<ServiceError>,
    calls: usize,
}

impl StoreState {
    fn page_by_handle(&self, handle: &Handle) -> Option<&Page> {
        self.pages.values().find(|p| p.handle == *handle)
    }

    fn page(&self, page_id: &str) -> ServiceResult<&Page> {
        self.pages
            .get(page_id)
            .ok_or_else(|| ServiceError::NotFound(format!("page {page_id}")))
    }

    fn page_of_block(&self, block_id: &str) -> ServiceResult<&Page> {
        self.blocks
            .iter()
            .find(|(_, blocks)| blocks.iter().any(|b| b.id == block_id))
            .and_then(|(page_id, _)| self.pages.get(page_id))
            .ok_or_else(|| ServiceError::NotFound(format!("block {block_id}")))
    }

    fn blocks(&self, page_id: &str) -> &[Block] {
        self.blocks.get(page_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Count the call and consume an injected failure
    fn begin_call(&mut self) -> ServiceResult<()> {
        self.calls += 1;
        match self.fail_next.take() {
            Some(error) => {
                debug!(%error, "Returning injected failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

fn authorize(page: &Page, actor: Option<&UserId>) -> ServiceResult<()> {
    match actor {
        None => Err(ServiceError::Unauthenticated),
        Some(user) if page.owner_id != *user => {
            warn!(page_id = %page.id, user = %user, "Rejected mutation by non-owner");
            Err(ServiceError::Forbidden)
        }
        Some(_) => Ok(()),
    }
}

/// Reference persistence backend kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    state: Mutex<StoreState>,
    latency: Option<Duration>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` (tokio time, so paused clocks apply)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn round_trip(&self) -> ServiceResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.state().begin_call()
    }

    /// Make the next call of any kind fail with `error`
    pub fn fail_next(&self, error: ServiceError) {
        self.state().fail_next = Some(error);
    }

    /// Number of calls that reached the store
    pub fn call_count(&self) -> usize {
        self.state().calls
    }

    /// Register a page directly, bypassing the call counter
    pub fn create_page(
        &self,
        owner: &UserId,
        raw_handle: &str,
        title: impl Into<String>,
    ) -> ServiceResult<Page> {
        let handle = Handle::parse(raw_handle)?;
        let mut state = self.state();
        if state.page_by_handle(&handle).is_some() {
            return Err(ServiceError::Conflict(format!(
                "handle {} is taken",
                handle.canonical()
            )));
        }

        let ordering = state
            .pages
            .values()
            .filter(|p| p.owner_id == *owner)
            .count() as i64;
        let page = Page {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.clone(),
            handle,
            title: title.into(),
            description: None,
            image_url: None,
            is_public: true,
            ordering,
        };
        state.blocks.insert(page.id.clone(), Vec::new());
        state.pages.insert(page.id.clone(), page.clone());
        info!(page_id = %page.id, handle = %page.handle, "Created page");
        Ok(page)
    }

    /// Load a complete profile, replacing anything stored under its page id
    pub fn seed(&self, profile: Profile) {
        let mut state = self.state();
        state.blocks.insert(profile.page.id.clone(), profile.blocks);
        state.pages.insert(profile.page.id.clone(), profile.page);
    }

    /// Current blocks of a page in ordering order
    pub fn blocks(&self, page_id: &str) -> Vec<Block> {
        let mut blocks = self.state().blocks(page_id).to_vec();
        blocks.sort_by(compare_blocks);
        blocks
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    #[instrument(skip(self, handle, viewer), fields(handle = %handle))]
    async fn fetch_profile(
        &self,
        handle: &Handle,
        viewer: Option<&UserId>,
    ) -> ServiceResult<Profile> {
        self.round_trip().await?;

        let state = self.state();
        let page = state
            .page_by_handle(handle)
            .filter(|p| p.is_public || p.is_owned_by(viewer))
            .ok_or_else(|| ServiceError::NotFound(handle.canonical()))?
            .clone();

        let mut blocks = state.blocks(&page.id).to_vec();
        blocks.sort_by(compare_blocks);
        debug!(blocks = blocks.len(), "Fetched profile");
        Ok(Profile { page, blocks })
    }

    #[instrument(skip(self, actor, content), fields(kind = %content.kind()))]
    async fn create_block(
        &self,
        actor: Option<&UserId>,
        page_id: &str,
        content: BlockContent,
    ) -> ServiceResult<Block> {
        content.validate().map_err(ServiceError::Validation)?;
        self.round_trip().await?;

        let mut state = self.state();
        authorize(state.page(page_id)?, actor)?;

        let block = Block::new(Uuid::new_v4().to_string(), content)
            .with_created_at(Utc::now().to_rfc3339());
        let id = block.id.clone();
        let next = add_block(state.blocks(page_id), block)?;
        let created = next
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::Unexpected(format!("block {id} vanished")))?;
        state.blocks.insert(page_id.to_string(), next);

        info!(block_id = %created.id, "Created block");
        Ok(created)
    }

    #[instrument(skip(self, actor))]
    async fn delete_block(&self, actor: Option<&UserId>, block_id: &str) -> ServiceResult<()> {
        self.round_trip().await?;

        let mut state = self.state();
        let page = state.page_of_block(block_id)?;
        authorize(page, actor)?;

        let page_id = page.id.clone();
        let next = delete_block(state.blocks(&page_id), block_id)?;
        state.blocks.insert(page_id, next);
        info!("Deleted block");
        Ok(())
    }

    #[instrument(skip(self, actor, positions), fields(entries = positions.len()))]
    async fn save_layout(
        &self,
        actor: Option<&UserId>,
        page_id: &str,
        positions: Vec<BlockPosition>,
    ) -> ServiceResult<()> {
        self.round_trip().await?;

        let mut state = self.state();
        authorize(state.page(page_id)?, actor)?;

        let bounds = GridBounds::from(Breakpoint::CANONICAL);
        let blocks = state.blocks(page_id);
        let sanitized: Vec<BlockPosition> = positions
            .into_iter()
            .filter(|p| {
                let known = blocks.iter().any(|b| b.id == p.id);
                if !known {
                    debug!(block_id = %p.id, "Ignoring position for unknown block");
                }
                known
            })
            .map(|p| BlockPosition::new(p.id.clone(), to_storage(to_engine(p.rect(), bounds))))
            .collect();

        let next = apply_layout_payload(blocks, &sanitized);
        state.blocks.insert(page_id.to_string(), next);
        info!(saved = sanitized.len(), "Saved layout");
        Ok(())
    }

    #[instrument(skip(self, actor, patch), fields(kind = %patch.kind()))]
    async fn update_content(
        &self,
        actor: Option<&UserId>,
        block_id: &str,
        patch: ContentPatch,
    ) -> ServiceResult<Block> {
        self.round_trip().await?;

        let mut state = self.state();
        let page = state.page_of_block(block_id)?;
        authorize(page, actor)?;

        let page_id = page.id.clone();
        let next = patch_content(state.blocks(&page_id), block_id, &patch)?;
        let updated = next
            .iter()
            .find(|b| b.id == block_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("block {block_id}")))?;
        state.blocks.insert(page_id, next);
        info!("Updated block content");
        Ok(updated)
    }

    #[instrument(skip(self, actor, settings))]
    async fn update_page(
        &self,
        actor: Option<&UserId>,
        page_id: &str,
        settings: PageSettings,
    ) -> ServiceResult<Page> {
        settings.validate()?;
        self.round_trip().await?;

        let mut state = self.state();
        let page = state.page(page_id)?;
        authorize(page, actor)?;

        let next = settings.apply(page)?;
        if next.handle != page.handle {
            if let Some(other) = state.page_by_handle(&next.handle) {
                warn!(handle = %next.handle, other = %other.id, "Handle already taken");
                return Err(ServiceError::Conflict(format!(
                    "handle {} is taken",
                    next.handle.canonical()
                )));
            }
        }

        state.pages.insert(page_id.to_string(), next.clone());
        info!(handle = %next.handle, "Updated page settings");
        Ok(next)
    }
}
