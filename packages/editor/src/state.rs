//! # Block Editor State Machine
//!
//! Pure reducer over [`EditorState`]. The save status cycles
//! `Idle → Dirty → Saving → Saved → Idle`, with `Error` reachable from
//! `Saving`. Direct writes (create, delete, resize, content) go through the
//! same cycle via the `Mutation*` actions. Placeholders, in-flight deletions
//! and the layout snapshot are tracked independently of the status. There is
//! no terminal state.

use bio_layout::{BlockKind, LayoutTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Dirty,
    Saving,
    Saved,
    Error,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Dirty => "dirty",
            SaveStatus::Saving => "saving",
            SaveStatus::Saved => "saved",
            SaveStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Client-only block that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub id: String,
    pub kind: BlockKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub placeholders: Vec<Placeholder>,
    pub deleting: BTreeSet<String>,
    /// Last layout observed from the grid engine
    pub pending_layout: Option<LayoutTable>,
    pub autosave_pending: bool,
    pub status: SaveStatus,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholder(&self, id: &str) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| p.id == id)
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting.contains(id)
    }

    /// True when nothing would be lost by discarding the editor
    pub fn is_settled(&self) -> bool {
        self.placeholders.is_empty() && self.pending_layout.is_none() && !self.autosave_pending
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    AddPlaceholder { id: String, kind: BlockKind },
    CancelPlaceholder { id: String },
    DeleteBlockStart { id: String },
    DeleteBlockFinish { id: String },
    SavePlaceholderStart { id: String },
    LayoutChanged { layout: LayoutTable },
    MarkDirty,
    RequestAutoSave,
    AutoSaveStart,
    AutoSaveSuccess,
    AutoSaveError,
    /// The layout was dragged back to the saved arrangement
    AutoSaveReverted,
    MutationStart,
    /// `layout_saved` is set when the write persisted the whole layout
    MutationSuccess { layout_saved: bool },
    MutationError,
    SavedTimeout,
}

/// Fresh local id for a placeholder
pub fn placeholder_id() -> String {
    format!("placeholder-{}", Uuid::new_v4())
}

impl EditorAction {
    /// `AddPlaceholder` with a fresh local id
    pub fn add_placeholder(kind: BlockKind) -> Self {
        EditorAction::AddPlaceholder {
            id: placeholder_id(),
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditorAction::AddPlaceholder { .. } => "add_placeholder",
            EditorAction::CancelPlaceholder { .. } => "cancel_placeholder",
            EditorAction::DeleteBlockStart { .. } => "delete_block_start",
            EditorAction::DeleteBlockFinish { .. } => "delete_block_finish",
            EditorAction::SavePlaceholderStart { .. } => "save_placeholder_start",
            EditorAction::LayoutChanged { .. } => "layout_changed",
            EditorAction::MarkDirty => "mark_dirty",
            EditorAction::RequestAutoSave => "request_auto_save",
            EditorAction::AutoSaveStart => "auto_save_start",
            EditorAction::AutoSaveSuccess => "auto_save_success",
            EditorAction::AutoSaveError => "auto_save_error",
            EditorAction::AutoSaveReverted => "auto_save_reverted",
            EditorAction::MutationStart => "mutation_start",
            EditorAction::MutationSuccess { .. } => "mutation_success",
            EditorAction::MutationError => "mutation_error",
            EditorAction::SavedTimeout => "saved_timeout",
        }
    }
}

pub fn reduce(state: &EditorState, action: EditorAction) -> EditorState {
    let mut next = state.clone();

    match action {
        EditorAction::AddPlaceholder { id, kind } => {
            next.placeholders.push(Placeholder { id, kind });
            next.status = SaveStatus::Dirty;
        }
        EditorAction::CancelPlaceholder { id } => {
            next.placeholders.retain(|p| p.id != id);
            // a discarded placeholder alone must not leave the editor dirty
            if next.is_settled() {
                next.status = SaveStatus::Idle;
            }
        }
        EditorAction::DeleteBlockStart { id } => {
            next.deleting.insert(id);
        }
        EditorAction::DeleteBlockFinish { id } => {
            next.deleting.remove(&id);
            if let Some(layout) = next.pending_layout.as_mut() {
                layout.remove_block(&id);
            }
        }
        EditorAction::SavePlaceholderStart { id } => {
            next.placeholders.retain(|p| p.id != id);
        }
        EditorAction::LayoutChanged { layout } => {
            next.pending_layout = Some(layout);
        }
        EditorAction::MarkDirty => {
            next.status = SaveStatus::Dirty;
        }
        EditorAction::RequestAutoSave => {
            if next.pending_layout.is_some() {
                next.autosave_pending = true;
            }
            next.status = SaveStatus::Dirty;
        }
        EditorAction::AutoSaveStart => {
            next.autosave_pending = false;
            next.status = SaveStatus::Saving;
        }
        EditorAction::AutoSaveSuccess => {
            next.pending_layout = None;
            next.status = SaveStatus::Saved;
        }
        EditorAction::AutoSaveError => {
            next.status = SaveStatus::Error;
        }
        EditorAction::AutoSaveReverted => {
            next.pending_layout = None;
            next.autosave_pending = false;
            if next.status == SaveStatus::Dirty && next.placeholders.is_empty() {
                next.status = SaveStatus::Idle;
            }
        }
        EditorAction::MutationStart => {
            next.status = SaveStatus::Saving;
        }
        EditorAction::MutationSuccess { layout_saved } => {
            if layout_saved {
                next.pending_layout = None;
                next.autosave_pending = false;
            }
            next.status = if next.placeholders.is_empty() && !next.autosave_pending {
                SaveStatus::Saved
            } else {
                SaveStatus::Dirty
            };
        }
        EditorAction::MutationError => {
            next.status = SaveStatus::Error;
        }
        EditorAction::SavedTimeout => {
            if next.status == SaveStatus::Saved {
                next.status = SaveStatus::Idle;
            }
        }
    }

    next
}
