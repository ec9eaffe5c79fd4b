//! Edit sessions against the in-memory store

use bio_common::{Handle, ServiceError, StaticIdentity, UserId};
use bio_editor::{
    EditSession, EditorConfig, EditorError, ProfileCache, ProfileView, RecordingNotifier,
    SaveStatus,
};
use bio_layout::{
    Block, BlockContent, BlockKind, Breakpoint, ContentPatch, LinkData, LinkPatch, Profile,
    SectionData, SizePreset, StorageRect,
};
use bio_store::{MemoryPageStore, PageSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

struct Setup {
    store: Arc<MemoryPageStore>,
    page_id: String,
    handle: Handle,
}

fn link(url: &str) -> BlockContent {
    BlockContent::Link(LinkData {
        url: url.into(),
        ..LinkData::default()
    })
}

fn setup() -> Setup {
    let store = Arc::new(MemoryPageStore::new());
    let page = store
        .create_page(&UserId::new("owner"), "alice", "Alice")
        .unwrap();
    store.seed(Profile {
        page: page.clone(),
        blocks: vec![
            Block::new(
                "a",
                BlockContent::Section(SectionData {
                    title: "Links".into(),
                }),
            )
            .with_ordering(0)
            .with_created_at("2024-01-01T00:00:00Z")
            .with_layout(StorageRect::new(0, 0, 4, 1)),
            Block::new("l", link("https://l.example"))
                .with_ordering(1)
                .with_created_at("2024-01-02T00:00:00Z")
                .with_layout(StorageRect::new(1, 0, 1, 1)),
        ],
    });

    Setup {
        store,
        page_id: page.id,
        handle: page.handle,
    }
}

async fn open_as(setup: &Setup, user: Option<&str>) -> ProfileView<MemoryPageStore> {
    let identity = match user {
        Some(id) => StaticIdentity::signed_in(id),
        None => StaticIdentity::anonymous(),
    };
    EditSession::open(
        Arc::clone(&setup.store),
        ProfileCache::new(),
        Arc::new(identity),
        Arc::new(RecordingNotifier::new()),
        &setup.handle,
        &EditorConfig::default(),
    )
    .await
    .unwrap()
}

async fn owner_session(setup: &Setup) -> EditSession<MemoryPageStore> {
    open_as(setup, Some("owner"))
        .await
        .into_session()
        .expect("owner gets an editable session")
}

#[tokio::test]
async fn test_visitor_gets_static_read_only_view() {
    let setup = setup();

    for viewer in [None, Some("someone-else")] {
        let view = open_as(&setup, viewer).await;
        assert!(view.is_read_only());
        let items = view.layout().get(Breakpoint::Wide);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.is_static && !item.is_draggable));
    }
}

#[tokio::test]
async fn test_private_page_is_not_found_for_visitors() {
    let setup = setup();
    let mut session = owner_session(&setup).await;
    session
        .update_page(PageSettings::visibility(false))
        .await
        .unwrap();

    let result = EditSession::open(
        Arc::clone(&setup.store),
        ProfileCache::new(),
        Arc::new(StaticIdentity::anonymous()),
        Arc::new(RecordingNotifier::new()),
        &setup.handle,
        &EditorConfig::default(),
    )
    .await;
    assert!(matches!(
        result,
        Err(EditorError::Service(ServiceError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_placeholder_cancel_then_save() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let first = session.add_placeholder(BlockKind::Link).unwrap();
    assert_eq!(session.status(), SaveStatus::Dirty);
    assert!(session.layout().contains(&first));

    session.cancel_placeholder(&first).unwrap();
    assert_eq!(session.status(), SaveStatus::Idle);
    assert!(!session.layout().contains(&first));
    assert!(session.state().placeholders.is_empty());

    let second = session.add_placeholder(BlockKind::Link).unwrap();
    let created = session
        .save_placeholder(&second, link("https://new.example"))
        .await
        .unwrap();
    assert_eq!(created.ordering, Some(2));
    assert!(session.state().placeholders.is_empty());

    let orderings: Vec<Option<i64>> = setup
        .store
        .blocks(&setup.page_id)
        .iter()
        .map(|b| b.ordering)
        .collect();
    assert_eq!(orderings, vec![Some(0), Some(1), Some(2)]);
}

#[tokio::test]
async fn test_failed_placeholder_save_keeps_placeholder() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let id = session.add_placeholder(BlockKind::Link).unwrap();
    setup
        .store
        .fail_next(ServiceError::Network("offline".into()));
    let result = session.save_placeholder(&id, link("https://new.example")).await;

    assert!(result.is_err());
    assert!(session.state().placeholder(&id).is_some());
    assert_eq!(setup.store.blocks(&setup.page_id).len(), 2);
}

#[tokio::test]
async fn test_placeholder_kind_must_match_content() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let id = session.add_placeholder(BlockKind::Text).unwrap();
    let result = session.save_placeholder(&id, link("https://new.example")).await;

    assert!(matches!(result, Err(EditorError::Patch(_))));
    assert!(session.state().placeholder(&id).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_drag_autosaves_after_quiet_period() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let mut dragged = session.layout().clone();
    dragged.item_mut(Breakpoint::Wide, "l").unwrap().x = 2;
    session.layout_changed(&dragged).unwrap();
    assert_eq!(session.status(), SaveStatus::Dirty);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(session.autosave_status(), SaveStatus::Dirty);

    sleep(Duration::from_millis(1000)).await;
    let stored = setup.store.blocks(&setup.page_id);
    let l = stored.iter().find(|b| b.id == "l").unwrap();
    assert_eq!(l.layout, Some(StorageRect::new(1, 2, 1, 1)));
    assert_eq!(session.status(), SaveStatus::Saved);

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(session.status(), SaveStatus::Idle);
}

#[tokio::test]
async fn test_resize_persists_immediately() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    session.resize("l", SizePreset::Large).await.unwrap();

    let stored = setup.store.blocks(&setup.page_id);
    let l = stored.iter().find(|b| b.id == "l").unwrap();
    assert_eq!(l.layout.map(|r| (r.w, r.h)), Some((2, 2)));
    let item = session.layout().item(Breakpoint::Wide, "l").unwrap();
    assert_eq!((item.w, item.h), (2, 2));
}

#[tokio::test]
async fn test_authorization_failure_blocks_until_owner_signs_in() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    setup.store.fail_next(ServiceError::Unauthenticated);
    let result = session.delete_block("l").await;
    assert_eq!(result, Err(EditorError::Service(ServiceError::Unauthenticated)));
    assert!(session.is_blocked());
    assert!(session.profile().unwrap().block("l").is_some());
    assert!(!session.state().is_deleting("l"));

    assert_eq!(
        session.add_placeholder(BlockKind::Link),
        Err(EditorError::ReauthenticationRequired)
    );

    assert_eq!(
        session.reauthenticate(Arc::new(StaticIdentity::signed_in("mallory"))),
        Err(EditorError::ReadOnly)
    );
    assert!(session.is_blocked());

    session
        .reauthenticate(Arc::new(StaticIdentity::signed_in("owner")))
        .unwrap();
    session.delete_block("l").await.unwrap();
    assert_eq!(setup.store.blocks(&setup.page_id).len(), 1);
    assert!(!session.layout().contains("l"));
}

#[tokio::test]
async fn test_handle_change_follows_the_page() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let page = session
        .update_page(PageSettings::handle("Alice_Links"))
        .await
        .unwrap();
    assert_eq!(page.handle.as_str(), "alice_links");
    assert_eq!(session.handle(), page.handle);

    let profile = session.refresh().await.unwrap();
    assert_eq!(profile.page.handle, page.handle);
    assert_eq!(profile.blocks.len(), 2);
}

#[tokio::test]
async fn test_created_block_can_be_edited_resized_and_deleted() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let id = session.add_placeholder(BlockKind::Link).unwrap();
    let created = session
        .save_placeholder(&id, link("https://new.example"))
        .await
        .unwrap();
    assert!(session.layout().contains(&created.id));

    let updated = session
        .update_content(
            &created.id,
            ContentPatch::Link(LinkPatch {
                title: Some("New".into()),
                ..LinkPatch::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);

    session.resize(&created.id, SizePreset::Wide).await.unwrap();
    let item = session
        .layout()
        .item(Breakpoint::Wide, &created.id)
        .unwrap();
    assert_eq!((item.w, item.h), (2, 1));

    session.delete_block(&created.id).await.unwrap();
    assert_eq!(setup.store.blocks(&setup.page_id).len(), 2);
    assert!(!session.layout().contains(&created.id));
    assert!(session.profile().unwrap().block(&created.id).is_none());
}

#[tokio::test]
async fn test_failed_resize_restores_layout() {
    let setup = setup();
    let mut session = owner_session(&setup).await;
    let before = session.layout().clone();

    setup
        .store
        .fail_next(ServiceError::Network("offline".into()));
    let result = session.resize("l", SizePreset::Large).await;

    assert!(result.is_err());
    assert_eq!(session.layout(), &before);
    assert_eq!(session.status(), SaveStatus::Error);
    assert!(session.state().pending_layout.is_none());
    let stored = setup.store.blocks(&setup.page_id);
    let l = stored.iter().find(|b| b.id == "l").unwrap();
    assert_eq!(l.layout, Some(StorageRect::new(1, 0, 1, 1)));
}

#[tokio::test(start_paused = true)]
async fn test_resize_then_cancelled_placeholder_settles() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    session.resize("l", SizePreset::Wide).await.unwrap();
    assert_eq!(session.status(), SaveStatus::Saved);

    let id = session.add_placeholder(BlockKind::Text).unwrap();
    session.cancel_placeholder(&id).unwrap();
    assert_eq!(session.status(), SaveStatus::Idle);
    assert!(session.state().is_settled());
}

#[tokio::test(start_paused = true)]
async fn test_saved_placeholder_returns_to_idle() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let id = session.add_placeholder(BlockKind::Link).unwrap();
    session
        .save_placeholder(&id, link("https://new.example"))
        .await
        .unwrap();
    assert_eq!(session.status(), SaveStatus::Saved);

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(session.status(), SaveStatus::Idle);
}

#[tokio::test]
async fn test_failed_delete_reports_error() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    setup
        .store
        .fail_next(ServiceError::Network("offline".into()));
    assert!(session.delete_block("l").await.is_err());

    assert_eq!(session.status(), SaveStatus::Error);
    assert!(session.layout().contains("l"));
    assert!(!session.is_blocked());
}

#[tokio::test(start_paused = true)]
async fn test_drag_away_and_back_settles_without_saving() {
    let setup = setup();
    let mut session = owner_session(&setup).await;
    let original = session.layout().clone();
    let calls = setup.store.call_count();

    let mut dragged = original.clone();
    dragged.item_mut(Breakpoint::Wide, "l").unwrap().x = 2;
    session.layout_changed(&dragged).unwrap();
    assert_eq!(session.status(), SaveStatus::Dirty);

    session.layout_changed(&original).unwrap();
    assert_eq!(session.status(), SaveStatus::Idle);
    assert_eq!(session.autosave_status(), SaveStatus::Idle);
    assert!(session.state().is_settled());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(setup.store.call_count(), calls);
    assert_eq!(session.status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_save_layout_flushes_pending_drag() {
    let setup = setup();
    let mut session = owner_session(&setup).await;

    let mut dragged = session.layout().clone();
    dragged.item_mut(Breakpoint::Wide, "l").unwrap().x = 2;
    session.layout_changed(&dragged).unwrap();
    session.save_layout().await.unwrap();

    let stored = setup.store.blocks(&setup.page_id);
    let l = stored.iter().find(|b| b.id == "l").unwrap();
    assert_eq!(l.layout, Some(StorageRect::new(1, 2, 1, 1)));
    assert_eq!(session.status(), SaveStatus::Saved);
    assert!(session.state().pending_layout.is_none());

    let calls = setup.store.call_count();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(setup.store.call_count(), calls);
    assert_eq!(session.status(), SaveStatus::Idle);
    assert_eq!(session.autosave_status(), SaveStatus::Idle);
}
