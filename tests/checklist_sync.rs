use mockito::{Matcher, Server, ServerGuard};
use packpal::cache::Cache;
use packpal::client::{ApiError, PackClient};
use packpal::drag::DragController;
use packpal::model::{ChecklistItem, ItemStatus};
use packpal::storage::LocalStorage;
use packpal::store::StoreError;
use packpal::sync::{Session, SyncError};
use serde_json::json;

async fn mock_checklist(server: &mut ServerGuard, items: serde_json::Value) {
    server
        .mock("GET", "/api/checklists")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"checklists": [{"id": 1, "title": "Camping", "created_at": "2024-05-01T10:00:00"}]}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/checklists/1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"checklist": {"id": 1, "title": "Camping", "items": items}}).to_string())
        .create_async()
        .await;
}

fn session_for(url: &str, dir: &std::path::Path) -> Session {
    let client = PackClient::new(url, "test-token", true).unwrap();
    Session::new(client, LocalStorage::new(dir), None)
}

#[tokio::test]
async fn test_create_then_drag_to_packed() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    mock_checklist(&mut server, json!([])).await;

    let mock_create = server
        .mock("POST", "/api/checklist-items")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(json!({
            "title": "Tent",
            "status": "To Pack",
            "checklist_id": 1
        })))
        .with_status(201)
        .with_body(json!({"item": {"id": 42, "title": "Tent"}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mock_move = server
        .mock("PUT", "/api/checklist-items/42")
        .match_body(Matcher::Json(json!({"status": "Packed"})))
        .with_status(200)
        .with_body(json!({"message": "Item updated successfully"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut session = session_for(&server.url(), dir.path());
    let report = session.load().await.unwrap();
    assert_eq!(report.checklist.map(|c| c.title), Some("Camping".to_string()));

    let created = session
        .create_item(ChecklistItem::new("Tent", None))
        .await
        .unwrap();
    assert_eq!(created.id, "42");
    assert_eq!(created.status, ItemStatus::ToPack);

    let mut drag = DragController::default();
    drag.grab("42");
    let outcome = drag.drop_on(ItemStatus::Packed, session.items());
    assert!(session.apply_drop(outcome).await.unwrap());

    let board = session.board();
    assert_eq!(board.len(), 1);
    assert!(board.column(ItemStatus::ToPack).is_empty());
    assert!(board.column(ItemStatus::Delivered).is_empty());
    let packed: Vec<&str> = board
        .column(ItemStatus::Packed)
        .iter()
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(packed, vec!["42"]);

    // dropping onto the same column sends nothing
    drag.grab("42");
    let outcome = drag.drop_on(ItemStatus::Packed, session.items());
    assert!(!session.apply_drop(outcome).await.unwrap());

    mock_create.assert();
    mock_move.assert();
}

#[tokio::test]
async fn test_failed_status_update_is_reverted() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    mock_checklist(&mut server, json!([{"id": 7, "title": "Stove", "status": "To Pack"}])).await;

    let mock_fail = server
        .mock("PUT", "/api/checklist-items/7")
        .with_status(500)
        .with_body(json!({"error": "database down"}).to_string())
        .create_async()
        .await;

    let mut session = session_for(&server.url(), dir.path());
    session.load().await.unwrap();

    let err = session.set_status("7", ItemStatus::Delivered).await.unwrap_err();
    match err {
        SyncError::Api(ApiError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(session.items()[0].status, ItemStatus::ToPack);

    // the persisted copy was rolled back as well
    let cached = Cache::load(LocalStorage::new(dir.path()));
    assert_eq!(cached.get()[0].status, ItemStatus::ToPack);

    mock_fail.assert();
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    mock_checklist(
        &mut server,
        json!([{"id": 7, "title": "Stove"}, {"id": 8, "title": "Map"}]),
    )
    .await;

    // someone else already removed it on the server
    let mock_delete = server
        .mock("DELETE", "/api/checklist-items/7")
        .with_status(404)
        .with_body(json!({"error": "Item not found"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut session = session_for(&server.url(), dir.path());
    session.load().await.unwrap();

    assert!(session.delete_item("7").await.unwrap());
    assert!(!session.delete_item("7").await.unwrap());

    let ids: Vec<&str> = session.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["8"]);
    assert!(session.board().locate("7").is_none());
    let cached = Cache::load(LocalStorage::new(dir.path()));
    assert_eq!(cached.get().len(), 1);

    mock_delete.assert();
}

#[tokio::test]
async fn test_failed_create_leaves_no_item_behind() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    mock_checklist(&mut server, json!([])).await;

    let mock_create = server
        .mock("POST", "/api/checklist-items")
        .with_status(503)
        .create_async()
        .await;

    let mut session = session_for(&server.url(), dir.path());
    session.load().await.unwrap();

    let err = session
        .create_item(ChecklistItem::new("Cooler", None))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Api(ApiError::Status { status: 503, .. })));
    assert!(session.items().is_empty());

    mock_create.assert();
}

#[tokio::test]
async fn test_server_replaces_cached_items() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let mut stale = ChecklistItem::new("Old Lamp", Some("1".into()));
    stale.id = "99".into();
    Cache::load(LocalStorage::new(dir.path()))
        .set(&[stale])
        .unwrap();

    mock_checklist(
        &mut server,
        json!([{"id": 1, "text": "Tent", "checked": true}]),
    )
    .await;

    let mut session = session_for(&server.url(), dir.path());
    assert_eq!(session.items().len(), 1);
    session.load().await.unwrap();

    assert_eq!(session.items().len(), 1);
    assert_eq!(session.items()[0].name, "Tent");
    assert_eq!(session.items()[0].status, ItemStatus::Packed);
    assert!(!session.is_offline());

    let cache = Cache::load(LocalStorage::new(dir.path()));
    assert_eq!(cache.current_checklist().as_deref(), Some("1"));
}

#[tokio::test]
async fn test_offline_shows_cache() {
    let dir = tempfile::tempdir().unwrap();
    let mut tent = ChecklistItem::new("Tent", Some("1".into()));
    tent.id = "5".into();
    let storage = LocalStorage::new(dir.path());
    let mut cache = Cache::load(storage.clone());
    cache.set(&[tent]).unwrap();
    cache.set_current_checklist("1").unwrap();

    let mut session = session_for("", dir.path());
    let report = session.load().await.unwrap();
    assert_eq!(report.warning.as_deref(), Some("Offline Mode"));
    assert_eq!(report.items, 1);
    assert_eq!(report.checklist.map(|c| c.id), Some("1".to_string()));
    assert!(session.is_offline());

    // mutations fail and are rolled back
    let err = session.set_status("5", ItemStatus::Packed).await.unwrap_err();
    assert!(matches!(err, SyncError::Api(ApiError::Offline)));
    assert_eq!(session.items()[0].status, ItemStatus::ToPack);
}

#[tokio::test]
async fn test_unauthorized_load_is_an_error() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    server
        .mock("GET", "/api/checklists")
        .with_status(401)
        .with_body(json!({"error": "Authentication required"}).to_string())
        .create_async()
        .await;

    let mut session = session_for(&server.url(), dir.path());
    let err = session.load().await.unwrap_err();
    assert_eq!(err.to_string(), "error 401: Authentication required");
    assert!(!session.is_offline());
}

#[tokio::test]
async fn test_corrupt_cache_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    LocalStorage::new(dir.path())
        .set("checklist_items", "[{\"id\": ")
        .unwrap();
    let session = session_for("", dir.path());
    assert!(session.items().is_empty());
}

#[tokio::test]
async fn test_checklist_lifecycle() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    mock_checklist(&mut server, json!([{"id": 7, "title": "Stove"}])).await;

    let mock_create = server
        .mock("POST", "/api/checklists")
        .match_body(Matcher::PartialJson(json!({"title": "Ski week"})))
        .with_status(201)
        .with_body(json!({"checklist_id": 9}).to_string())
        .create_async()
        .await;
    let mock_rename = server
        .mock("PUT", "/api/checklists/1")
        .match_body(Matcher::PartialJson(json!({"title": "Camping 2024"})))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let mock_delete = server
        .mock("DELETE", "/api/checklists/1")
        .with_status(200)
        .with_body(json!({"message": "Checklist deleted"}).to_string())
        .create_async()
        .await;

    let mut session = session_for(&server.url(), dir.path());
    session.load().await.unwrap();

    let created = session.create_checklist("  Ski week ").await.unwrap();
    assert_eq!(created.id, "9");
    assert_eq!(created.title, "Ski week");
    assert_eq!(session.checklists().len(), 2);
    assert!(matches!(
        session.create_checklist("   ").await,
        Err(SyncError::InvalidInput(_))
    ));

    session.rename_checklist("1", "Camping 2024").await.unwrap();
    assert_eq!(session.checklist().map(|c| c.title.as_str()), Some("Camping 2024"));
    assert_eq!(session.checklists()[0].title, "Camping 2024");

    session.delete_checklist("1").await.unwrap();
    assert!(session.checklist().is_none());
    assert!(session.items().is_empty());
    let ids: Vec<&str> = session.checklists().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["9"]);
    let cache = Cache::load(LocalStorage::new(dir.path()));
    assert!(cache.get().is_empty());
    assert_eq!(cache.current_checklist(), None);

    mock_create.assert();
    mock_rename.assert();
    mock_delete.assert();
}

#[tokio::test]
async fn test_failed_delete_restores_item_in_place() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    mock_checklist(
        &mut server,
        json!([{"id": 7, "title": "Stove"}, {"id": 8, "title": "Map"}]),
    )
    .await;
    let mock_delete = server
        .mock("DELETE", "/api/checklist-items/7")
        .with_status(500)
        .create_async()
        .await;

    let mut session = session_for(&server.url(), dir.path());
    session.load().await.unwrap();

    assert!(session.delete_item("7").await.is_err());
    let ids: Vec<&str> = session.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["7", "8"]);
    let cached = Cache::load(LocalStorage::new(dir.path()));
    let cached_ids: Vec<&str> = cached.get().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(cached_ids, vec!["7", "8"]);

    mock_delete.assert();
}

#[tokio::test]
async fn test_unwritable_cache_blocks_the_change() {
    let mut server = Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    mock_checklist(
        &mut server,
        json!([{"id": 7, "title": "Stove"}, {"id": 8, "title": "Map"}]),
    )
    .await;
    let mock_move = server
        .mock("PUT", "/api/checklist-items/7")
        .with_status(200)
        .with_body("{}")
        .expect(0)
        .create_async()
        .await;

    let mut session = session_for(&server.url(), &root);
    session.load().await.unwrap();

    std::fs::remove_dir_all(&root).unwrap();
    std::fs::write(&root, "not a directory").unwrap();

    let err = session.set_status("7", ItemStatus::Packed).await.unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Persist(_))));
    assert_eq!(session.items()[0].status, ItemStatus::ToPack);
    assert!(session.board().column(ItemStatus::Packed).is_empty());

    mock_move.assert();
}
