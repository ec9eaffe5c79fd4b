use crate::settings::PageSettings;
use async_trait::async_trait;
use bio_common::{Handle, ServiceResult, UserId};
use bio_layout::{Block, BlockContent, BlockPosition, ContentPatch, Page, Profile};

/// Remote persistence service for pages and their blocks
///
/// `actor` is the signed-in user performing a mutation. `None` yields
/// [`ServiceError::Unauthenticated`](bio_common::ServiceError::Unauthenticated),
/// a user who does not own the page yields
/// [`ServiceError::Forbidden`](bio_common::ServiceError::Forbidden).
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Load a page and its blocks. Private pages are only visible to their
    /// owner; everyone else gets `NotFound`.
    async fn fetch_profile(&self, handle: &Handle, viewer: Option<&UserId>)
        -> ServiceResult<Profile>;

    /// Persist a new block at the end of the page. The store assigns the id,
    /// the creation time, the ordering and (if absent) a default layout.
    async fn create_block(
        &self,
        actor: Option<&UserId>,
        page_id: &str,
        content: BlockContent,
    ) -> ServiceResult<Block>;

    /// Remove a block and resequence the rest of the page
    async fn delete_block(&self, actor: Option<&UserId>, block_id: &str) -> ServiceResult<()>;

    /// Write canonical storage positions. Shared by reorder, resize and
    /// explicit layout saves.
    async fn save_layout(
        &self,
        actor: Option<&UserId>,
        page_id: &str,
        positions: Vec<BlockPosition>,
    ) -> ServiceResult<()>;

    async fn update_content(
        &self,
        actor: Option<&UserId>,
        block_id: &str,
        patch: ContentPatch,
    ) -> ServiceResult<Block>;

    async fn update_page(
        &self,
        actor: Option<&UserId>,
        page_id: &str,
        settings: PageSettings,
    ) -> ServiceResult<Page>;
}
