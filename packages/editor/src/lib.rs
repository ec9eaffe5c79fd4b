//! # Bio Editor
//!
//! Owner-side editing of a link-in-bio page.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ layout: blocks → grid layouts, patches      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditSession                         │
//! │  - Reducer over placeholders and status     │
//! │  - Optimistic writes against the cache      │
//! │  - Debounced layout autosave                │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ store: PageStore (authoritative)            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Wide layout is canonical**: the narrow layout is derived on load
//! 2. **Optimistic clients**: a failed write restores the cached snapshot
//! 3. **Server authority**: every successful write invalidates the cache
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bio_editor::{EditSession, EditorConfig, ProfileCache, ProfileView, TracingNotifier};
//!
//! let view = EditSession::open(store, ProfileCache::new(), identity,
//!     Arc::new(TracingNotifier), &handle, &EditorConfig::default()).await?;
//!
//! if let ProfileView::Editable(mut session) = view {
//!     session.resize("block-1", SizePreset::Wide).await?;
//! }
//! ```

mod cache;
mod config;
mod debounce;
mod errors;
mod notifier;
mod optimistic;
mod session;
mod state;

pub use cache::ProfileCache;
pub use config::{ConfigError, EditorConfig, DEFAULT_CONFIG_NAME};
pub use debounce::{DebounceConfig, DebouncedSaver};
pub use errors::{EditorError, EditorResult};
pub use notifier::{Notifier, RecordingNotifier, SaveNotice, TracingNotifier};
pub use optimistic::{OptimisticMutator, TEMP_BLOCK_PREFIX};
pub use session::{EditSession, ProfileView, ReadOnlyView, SessionIdentity};
pub use state::{placeholder_id, reduce, EditorAction, EditorState, Placeholder, SaveStatus};
