//! # Edit Session Management
//!
//! An [`EditSession`] is one owner's editor for one page. It owns the
//! editor state, the current engine layout and the layout autosave, and
//! routes every persistence call through the [`OptimisticMutator`].
//!
//! Visitors never get a session: [`EditSession::open`] hands them a
//! [`ReadOnlyView`] instead.
//!
//! Direct writes report through the same save status as the autosave:
//! `Saving` while the store call runs, then `Saved` (or `Error`). After a
//! successful write the session reloads the profile so server ids replace
//! temporary ones.
//!
//! After any authorization failure the session refuses further mutations
//! until [`EditSession::reauthenticate`] restores the owner's identity.

use crate::cache::ProfileCache;
use crate::config::EditorConfig;
use crate::debounce::DebouncedSaver;
use crate::errors::{EditorError, EditorResult};
use crate::notifier::Notifier;
use crate::optimistic::{OptimisticMutator, TEMP_BLOCK_PREFIX};
use crate::state::{placeholder_id, reduce, EditorAction, EditorState, SaveStatus};
use bio_common::{Handle, IdentityProvider, ServiceError, ServiceResult, UserId};
use bio_layout::{
    build_layouts, reorder_blocks, resize_block, Block, BlockContent, BlockDescriptor, BlockKind,
    BlockPosition, BuildOptions, ContentPatch, LayoutTable, Page, PatchError, Profile, SizePreset,
};
use bio_store::{PageSettings, PageStore};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

type SaveFuture = Pin<Box<dyn Future<Output = ServiceResult<()>> + Send>>;
type SaveLayoutFn = Box<dyn Fn(Vec<BlockPosition>) -> SaveFuture + Send + Sync>;

/// Identity that can be swapped while mutators hold it
#[derive(Clone)]
pub struct SessionIdentity {
    inner: Arc<RwLock<Arc<dyn IdentityProvider>>>,
}

impl SessionIdentity {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(provider)),
        }
    }

    pub fn replace(&self, provider: Arc<dyn IdentityProvider>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = provider;
    }
}

impl IdentityProvider for SessionIdentity {
    fn current(&self) -> Option<UserId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current()
    }
}

/// What a visitor sees
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOnlyView {
    pub profile: Profile,
    pub layout: LayoutTable,
}

pub enum ProfileView<S: PageStore + 'static> {
    ReadOnly(ReadOnlyView),
    Editable(EditSession<S>),
}

impl<S: PageStore + 'static> ProfileView<S> {
    pub fn is_read_only(&self) -> bool {
        matches!(self, ProfileView::ReadOnly(_))
    }

    pub fn into_session(self) -> Option<EditSession<S>> {
        match self {
            ProfileView::Editable(session) => Some(session),
            ProfileView::ReadOnly(_) => None,
        }
    }

    pub fn layout(&self) -> &LayoutTable {
        match self {
            ProfileView::ReadOnly(view) => &view.layout,
            ProfileView::Editable(session) => session.layout(),
        }
    }
}

fn dispatch(state: &Mutex<EditorState>, action: EditorAction) {
    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    let name = action.name();
    *guard = reduce(&guard, action);
    debug!(action = name, status = %guard.status, "Dispatched editor action");
}

pub struct EditSession<S: PageStore + 'static> {
    handle: Arc<RwLock<Handle>>,
    page_id: String,
    owner: UserId,
    identity: SessionIdentity,
    store: Arc<S>,
    mutator: OptimisticMutator<S>,
    state: Arc<Mutex<EditorState>>,
    layout: LayoutTable,
    rows: i32,
    blocked: Arc<AtomicBool>,
    autosave: DebouncedSaver<Vec<BlockPosition>, SaveLayoutFn>,
    status_watch: JoinHandle<()>,
    saved_display: Duration,
    saved_timer: Option<JoinHandle<()>>,
}

impl<S: PageStore + 'static> EditSession<S> {
    /// Load a page and decide between an editor and a read-only view
    #[instrument(skip_all, fields(handle = %handle))]
    pub async fn open(
        store: Arc<S>,
        cache: ProfileCache,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        handle: &Handle,
        config: &EditorConfig,
    ) -> EditorResult<ProfileView<S>> {
        let viewer = identity.current();
        let profile = cache
            .fetch(handle, || store.fetch_profile(handle, viewer.as_ref()))
            .await?;

        let owner = match viewer {
            Some(user) if profile.page.is_owned_by(Some(&user)) => user,
            _ => {
                let opts = BuildOptions::read_only().with_rows(config.grid_rows);
                let layout = build_layouts(&profile.descriptors(), &opts);
                info!("Opened read-only view");
                return Ok(ProfileView::ReadOnly(ReadOnlyView { profile, layout }));
            }
        };

        let identity = SessionIdentity::new(identity);
        let mutator = OptimisticMutator::new(
            Arc::clone(&store),
            cache,
            Arc::new(identity.clone()),
            notifier,
        );

        let opts = BuildOptions::editable().with_rows(config.grid_rows);
        let layout = build_layouts(&profile.descriptors(), &opts);
        let baseline = layout.canonical_payload(&persisted_ids(&profile));

        let handle = Arc::new(RwLock::new(handle.clone()));
        let state = Arc::new(Mutex::new(EditorState::new()));
        let blocked = Arc::new(AtomicBool::new(false));

        let autosave = DebouncedSaver::new(
            baseline,
            config.debounce(),
            autosave_fn(
                mutator.clone(),
                Arc::clone(&handle),
                profile.page.id.clone(),
                Arc::clone(&state),
                Arc::clone(&blocked),
            ),
        );
        let status_watch = watch_saved_timeout(&autosave, Arc::clone(&state));
        let saved_display = config.debounce().saved_display;

        info!(page_id = %profile.page.id, blocks = profile.blocks.len(), "Opened edit session");
        Ok(ProfileView::Editable(Self {
            handle,
            page_id: profile.page.id.clone(),
            owner,
            identity,
            store,
            mutator,
            state,
            layout,
            rows: config.grid_rows,
            blocked,
            autosave,
            status_watch,
            saved_display,
            saved_timer: None,
        }))
    }

    pub fn handle(&self) -> Handle {
        self.handle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Cached profile, including optimistic changes
    pub fn profile(&self) -> Option<Profile> {
        self.mutator.cache().get(&self.handle())
    }

    pub fn layout(&self) -> &LayoutTable {
        &self.layout
    }

    pub fn state(&self) -> EditorState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.state().status
    }

    /// Status of the layout autosave alone
    pub fn autosave_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    fn dispatch(&self, action: EditorAction) {
        dispatch(&self.state, action);
    }

    fn ensure_writable(&self) -> EditorResult<()> {
        if self.is_blocked() {
            return Err(EditorError::ReauthenticationRequired);
        }
        Ok(())
    }

    fn track<T>(&self, result: EditorResult<T>) -> EditorResult<T> {
        if let Err(error) = &result {
            if error.to_service_error().is_authorization() {
                warn!(%error, "Blocking edits until the owner signs in again");
                self.blocked.store(true, Ordering::SeqCst);
            }
        }
        result
    }

    /// Mirror a direct write's outcome into the save status
    fn finish_mutation<T>(&mut self, result: &EditorResult<T>, layout_saved: bool) {
        if result.is_err() {
            self.dispatch(EditorAction::MutationError);
            return;
        }
        self.dispatch(EditorAction::MutationSuccess { layout_saved });
        if self.status() != SaveStatus::Saved {
            return;
        }

        if let Some(timer) = self.saved_timer.take() {
            timer.abort();
        }
        let state = Arc::clone(&self.state);
        let display = self.saved_display;
        self.saved_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(display).await;
            dispatch(&state, EditorAction::SavedTimeout);
        }));
    }

    /// Take the server's copy after a successful write
    async fn reconcile(&mut self) {
        if let Err(error) = self.refresh().await {
            warn!(%error, "Reload after write failed, keeping optimistic profile");
        }
    }

    fn build_options(&self) -> BuildOptions<'_> {
        BuildOptions::editable().with_rows(self.rows)
    }

    /// Persisted blocks followed by placeholders
    fn descriptors(&self) -> Vec<BlockDescriptor> {
        let mut descriptors = self
            .profile()
            .map(|p| p.descriptors())
            .unwrap_or_default();
        descriptors.extend(
            self.state()
                .placeholders
                .into_iter()
                .map(|p| BlockDescriptor::new(p.id, p.kind)),
        );
        descriptors
    }

    fn persisted(&self) -> HashSet<String> {
        self.profile()
            .map(|p| persisted_ids(&p))
            .unwrap_or_default()
    }

    /// Rebuild the engine layout from the cached profile and placeholders
    fn sync_layout(&mut self) {
        let descriptors = self.descriptors();
        let layout = build_layouts(
            &descriptors,
            &self.build_options().with_existing(&self.layout),
        );
        self.layout = layout;
    }

    /// Reload the profile if the cache entry is stale
    pub async fn refresh(&mut self) -> EditorResult<Profile> {
        let handle = self.handle();
        let viewer = self.identity.current();
        let store = Arc::clone(&self.store);
        let profile = self
            .mutator
            .cache()
            .fetch(&handle, || store.fetch_profile(&handle, viewer.as_ref()))
            .await;
        let profile = self.track(profile.map_err(EditorError::from))?;
        self.sync_layout();
        Ok(profile)
    }

    /// Returns the placeholder's local id
    pub fn add_placeholder(&mut self, kind: BlockKind) -> EditorResult<String> {
        self.ensure_writable()?;
        let id = placeholder_id();
        self.dispatch(EditorAction::AddPlaceholder {
            id: id.clone(),
            kind,
        });
        self.sync_layout();
        Ok(id)
    }

    pub fn cancel_placeholder(&mut self, id: &str) -> EditorResult<()> {
        if self.state().placeholder(id).is_none() {
            return Err(EditorError::UnknownPlaceholder(id.to_string()));
        }
        self.dispatch(EditorAction::CancelPlaceholder { id: id.to_string() });
        self.layout.remove_block(id);
        Ok(())
    }

    /// Persist a placeholder with its content
    ///
    /// On failure the placeholder is put back so the user can retry.
    #[instrument(skip(self, content), fields(page_id = %self.page_id))]
    pub async fn save_placeholder(
        &mut self,
        id: &str,
        content: BlockContent,
    ) -> EditorResult<Block> {
        self.ensure_writable()?;
        let placeholder = self
            .state()
            .placeholder(id)
            .cloned()
            .ok_or_else(|| EditorError::UnknownPlaceholder(id.to_string()))?;
        if content.kind() != placeholder.kind {
            return Err(PatchError::KindMismatch {
                block: placeholder.kind,
                patch: content.kind(),
            }
            .into());
        }

        self.dispatch(EditorAction::SavePlaceholderStart { id: id.to_string() });
        self.dispatch(EditorAction::MutationStart);
        self.layout.remove_block(id);

        let result = self
            .mutator
            .add_block(&self.handle(), &self.page_id, content)
            .await;
        if result.is_err() {
            self.dispatch(EditorAction::AddPlaceholder {
                id: placeholder.id,
                kind: placeholder.kind,
            });
        }
        self.finish_mutation(&result, false);
        if result.is_ok() {
            self.reconcile().await;
        } else {
            self.sync_layout();
        }
        self.track(result)
    }

    #[instrument(skip(self), fields(page_id = %self.page_id))]
    pub async fn delete_block(&mut self, block_id: &str) -> EditorResult<()> {
        self.ensure_writable()?;
        self.dispatch(EditorAction::DeleteBlockStart {
            id: block_id.to_string(),
        });
        self.dispatch(EditorAction::MutationStart);

        let result = self.mutator.delete_block(&self.handle(), block_id).await;

        self.dispatch(EditorAction::DeleteBlockFinish {
            id: block_id.to_string(),
        });
        self.finish_mutation(&result, false);
        if result.is_ok() {
            self.layout.remove_block(block_id);
            self.reconcile().await;
        } else {
            self.sync_layout();
        }
        self.track(result)
    }

    /// Resize to a preset and persist immediately
    ///
    /// The new layout is shown while the write runs and put back on failure.
    #[instrument(skip(self), fields(page_id = %self.page_id, preset = %preset))]
    pub async fn resize(&mut self, block_id: &str, preset: SizePreset) -> EditorResult<()> {
        self.ensure_writable()?;
        let change = resize_block(
            &self.descriptors(),
            &self.layout,
            block_id,
            preset,
            &self.persisted(),
            &self.build_options(),
        )?;
        let previous = std::mem::replace(&mut self.layout, change.layout);
        self.dispatch(EditorAction::MutationStart);

        let result = self
            .mutator
            .resize(&self.handle(), &self.page_id, change.payload.clone())
            .await;
        match &result {
            Ok(()) => {
                // the write carried every position, drags included
                self.autosave.mark_saved(change.payload);
                self.finish_mutation(&result, true);
                self.reconcile().await;
            }
            Err(error) => {
                debug!(%error, "Restoring layout from before the resize");
                self.layout = previous;
                self.finish_mutation(&result, false);
            }
        }
        self.track(result)
    }

    /// Accept the grid engine's layout after a drag and schedule an autosave
    pub fn layout_changed(&mut self, engine_layout: &LayoutTable) -> EditorResult<()> {
        self.ensure_writable()?;
        let change = reorder_blocks(
            &self.descriptors(),
            engine_layout,
            &self.persisted(),
            &self.build_options(),
        );
        self.layout = change.layout.clone();
        self.dispatch(EditorAction::LayoutChanged {
            layout: change.layout,
        });

        if self.autosave.notify_changed(change.payload) {
            self.dispatch(EditorAction::RequestAutoSave);
        } else {
            self.dispatch(EditorAction::AutoSaveReverted);
        }
        Ok(())
    }

    /// Write the current layout now instead of waiting for the autosave
    #[instrument(skip(self), fields(page_id = %self.page_id))]
    pub async fn save_layout(&mut self) -> EditorResult<()> {
        self.ensure_writable()?;
        let payload = self.layout.canonical_payload(&self.persisted());
        if payload == self.autosave.last_saved() && self.autosave_status() != SaveStatus::Dirty {
            debug!("Layout already saved");
            return Ok(());
        }

        self.dispatch(EditorAction::MutationStart);
        let result = self
            .mutator
            .save_layout(&self.handle(), &self.page_id, payload.clone())
            .await;
        if result.is_ok() {
            self.autosave.mark_saved(payload);
        }
        self.finish_mutation(&result, result.is_ok());
        self.track(result)
    }

    #[instrument(skip(self, patch), fields(page_id = %self.page_id))]
    pub async fn update_content(
        &mut self,
        block_id: &str,
        patch: ContentPatch,
    ) -> EditorResult<Block> {
        self.ensure_writable()?;
        self.dispatch(EditorAction::MutationStart);
        let result = self
            .mutator
            .update_content(&self.handle(), block_id, patch)
            .await;
        self.finish_mutation(&result, false);
        if result.is_ok() {
            self.reconcile().await;
        }
        self.track(result)
    }

    #[instrument(skip(self, settings), fields(page_id = %self.page_id))]
    pub async fn update_page(&mut self, settings: PageSettings) -> EditorResult<Page> {
        self.ensure_writable()?;
        let handle = self.handle();
        self.dispatch(EditorAction::MutationStart);
        let result = self
            .mutator
            .update_page(&handle, &self.page_id, settings)
            .await;
        self.finish_mutation(&result, false);

        if let Ok(page) = &result {
            if page.handle != handle {
                *self.handle.write().unwrap_or_else(PoisonError::into_inner) = page.handle.clone();
            }
            self.reconcile().await;
        }
        self.track(result)
    }

    /// Swap the identity after a sign-in. Edits resume only when the new
    /// identity is the page owner.
    pub fn reauthenticate(&mut self, identity: Arc<dyn IdentityProvider>) -> EditorResult<()> {
        let current = identity.current();
        self.identity.replace(identity);

        if current.as_ref() == Some(&self.owner) {
            self.blocked.store(false, Ordering::SeqCst);
            info!(owner = %self.owner, "Edits unblocked");
            Ok(())
        } else {
            self.blocked.store(true, Ordering::SeqCst);
            Err(EditorError::ReadOnly)
        }
    }

    /// Stop the autosave timer. A save that already started still finishes.
    pub fn close(&self) {
        self.autosave.dispose();
        self.status_watch.abort();
        if let Some(timer) = &self.saved_timer {
            timer.abort();
        }
    }
}

impl<S: PageStore + 'static> Drop for EditSession<S> {
    fn drop(&mut self) {
        self.status_watch.abort();
        if let Some(timer) = self.saved_timer.take() {
            timer.abort();
        }
    }
}

fn persisted_ids(profile: &Profile) -> HashSet<String> {
    profile
        .blocks
        .iter()
        .filter(|b| !b.id.starts_with(TEMP_BLOCK_PREFIX))
        .map(|b| b.id.clone())
        .collect()
}

fn autosave_fn<S: PageStore + 'static>(
    mutator: OptimisticMutator<S>,
    handle: Arc<RwLock<Handle>>,
    page_id: String,
    state: Arc<Mutex<EditorState>>,
    blocked: Arc<AtomicBool>,
) -> SaveLayoutFn {
    Box::new(move |positions: Vec<BlockPosition>| -> SaveFuture {
        let mutator = mutator.clone();
        let handle = handle.read().unwrap_or_else(PoisonError::into_inner).clone();
        let page_id = page_id.clone();
        let state = Arc::clone(&state);
        let blocked = Arc::clone(&blocked);

        Box::pin(async move {
            if blocked.load(Ordering::SeqCst) {
                return Err(ServiceError::Unauthenticated);
            }

            dispatch(&state, EditorAction::AutoSaveStart);
            match mutator.reorder(&handle, &page_id, positions).await {
                Ok(()) => {
                    dispatch(&state, EditorAction::AutoSaveSuccess);
                    Ok(())
                }
                Err(error) => {
                    let error = error.to_service_error();
                    if error.is_authorization() {
                        blocked.store(true, Ordering::SeqCst);
                    }
                    dispatch(&state, EditorAction::AutoSaveError);
                    Err(error)
                }
            }
        })
    })
}

/// Mirror the autosave's `Saved → Idle` transition into the editor state
fn watch_saved_timeout<F>(
    autosave: &DebouncedSaver<Vec<BlockPosition>, F>,
    state: Arc<Mutex<EditorState>>,
) -> JoinHandle<()> {
    let mut rx = autosave.subscribe();
    tokio::spawn(async move {
        let mut previous = *rx.borrow_and_update();
        while rx.changed().await.is_ok() {
            let current = *rx.borrow_and_update();
            if previous == SaveStatus::Saved && current == SaveStatus::Idle {
                dispatch(&state, EditorAction::SavedTimeout);
            }
            previous = current;
        }
    })
}
