//! Integration tests for the Secret Santa backend.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, BlobStore};
use crate::exchange::ExchangeService;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let service = Arc::new(
            ExchangeService::load(BlobStore::new(pool))
                .await
                .expect("Failed to load exchange"),
        );

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            service,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_member(&self, code: &str, name: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/members"))
            .json(&json!({ "code": code, "displayName": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "creating {} failed", code);
        resp.json::<Value>().await.unwrap()["data"].clone()
    }

    async fn assignments(&self) -> Vec<Value> {
        let resp = self
            .client
            .get(self.url("/api/assignments"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json::<Value>().await.unwrap()["data"]
            .as_array()
            .unwrap()
            .clone()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    // Request without API key
    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_member_crud_flow() {
    let fixture = TestFixture::new().await;

    let alice = fixture.create_member("E1", "Alice").await;
    assert_eq!(alice["id"], 1);

    let bob = fixture.create_member("E2", "Bob").await;
    assert_eq!(bob["id"], 2);

    // Case-insensitive duplicate rejected
    let resp = fixture
        .client
        .post(fixture.url("/api/members"))
        .json(&json!({ "code": "e1", "displayName": "Impostor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DUPLICATE_IDENTIFIER");

    // Rename onto another member's code rejected
    let resp = fixture
        .client
        .put(fixture.url("/api/members/2"))
        .json(&json!({ "code": "E1", "displayName": "Bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Legitimate update
    let resp = fixture
        .client
        .put(fixture.url("/api/members/2"))
        .json(&json!({ "code": "E2", "displayName": "Robert", "interests": "chess" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["displayName"], "Robert");

    // Delete, then the id is gone and never reused
    let resp = fixture
        .client
        .delete(fixture.url("/api/members/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/members/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let carol = fixture.create_member("E3", "Carol").await;
    assert_eq!(carol["id"], 3);
}

#[tokio::test]
async fn test_import_preview_and_confirm() {
    let fixture = TestFixture::new().await;
    fixture.create_member("E2", "Existing").await;

    let rows = json!({ "rows": [
        ["S.No", "Employee ID", "Employee Name", "Interests"],
        ["1", "E1", "A", "books"],
        ["2", "e1", "B", ""],
        ["3", "e2", "X", ""],
        ["4", "E3", "C", ""],
    ]});

    let resp = fixture
        .client
        .post(fixture.url("/api/import/preview"))
        .json(&rows)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let preview = &body["data"];

    let accepted = preview["accepted"].as_array().unwrap();
    assert_eq!(accepted.len(), 2);
    assert_eq!(accepted[0]["code"], "E1");
    assert_eq!(accepted[1]["code"], "E3");

    let rejected = preview["rejected"].as_array().unwrap();
    assert_eq!(rejected.len(), 2);
    assert_eq!(rejected[0]["reason"], "duplicate-in-batch");
    assert_eq!(rejected[1]["reason"], "duplicate-in-roster");

    // Preview must not have mutated the roster
    let resp = fixture
        .client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Confirm commits the accepted candidates
    let resp = fixture
        .client
        .post(fixture.url("/api/import/confirm"))
        .json(&json!({ "candidates": accepted }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/members"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_import_missing_required_columns() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/import/preview"))
        .json(&json!({ "rows": [["S.No", "Interests"], ["1", "books"]] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "MISSING_REQUIRED_COLUMNS");
}

#[tokio::test]
async fn test_bulk_draw_requires_two_members() {
    let fixture = TestFixture::new().await;
    fixture.create_member("E1", "Loner").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/bulk"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INSUFFICIENT_MEMBERS");
}

#[tokio::test]
async fn test_bulk_draw_is_a_derangement_over_the_roster() {
    let fixture = TestFixture::new().await;
    for i in 1..=6 {
        fixture
            .create_member(&format!("E{}", i), &format!("Member {}", i))
            .await;
    }

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/bulk"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let pairs = body["data"].as_array().unwrap();

    assert_eq!(pairs.len(), 6);
    let mut receivers = HashSet::new();
    for pair in pairs {
        let giver = pair["giverId"].as_i64().unwrap();
        let receiver = pair["receiverId"].as_i64().unwrap();
        assert_ne!(giver, receiver);
        assert!(receivers.insert(receiver), "receiver drawn twice");
    }
    assert_eq!(receivers, (1..=6).collect::<HashSet<i64>>());
}

#[tokio::test]
async fn test_bulk_draw_two_members_is_deterministic() {
    let fixture = TestFixture::new().await;
    let a = fixture.create_member("E1", "A").await;
    let b = fixture.create_member("E2", "B").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/bulk"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let pairs = body["data"].as_array().unwrap();

    assert_eq!(pairs.len(), 2);
    for pair in pairs {
        if pair["giverId"] == a["id"] {
            assert_eq!(pair["receiverId"], b["id"]);
        } else {
            assert_eq!(pair["receiverId"], a["id"]);
        }
    }
}

#[tokio::test]
async fn test_individual_draw_flow() {
    let fixture = TestFixture::new().await;
    for i in 1..=4 {
        fixture
            .create_member(&format!("E{}", i), &format!("Member {}", i))
            .await;
    }

    // Draw for member 1: pool is everyone else
    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual"))
        .json(&json!({ "memberId": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["pool"].as_array().unwrap().len(), 3);

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual/select"))
        .json(&json!({ "poolIndex": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let first_receiver = body["data"]["receiverId"].as_i64().unwrap();
    assert_ne!(first_receiver, 1);

    // Draw for member 2: the first receiver is no longer in the pool
    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual"))
        .json(&json!({ "memberId": 2 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let pool_ids: Vec<i64> = body["data"]["pool"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert!(!pool_ids.contains(&first_receiver));
    assert!(!pool_ids.contains(&2));

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual/select"))
        .json(&json!({ "poolIndex": 0 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let second_receiver = body["data"]["receiverId"].as_i64().unwrap();
    assert_ne!(second_receiver, 2);
    assert_ne!(second_receiver, first_receiver);

    assert_eq!(fixture.assignments().await.len(), 2);
}

#[tokio::test]
async fn test_individual_draw_select_without_pending() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual/select"))
        .json(&json!({ "poolIndex": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_individual_draw_stale_after_drawer_deleted() {
    let fixture = TestFixture::new().await;
    for i in 1..=3 {
        fixture
            .create_member(&format!("E{}", i), &format!("Member {}", i))
            .await;
    }

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual"))
        .json(&json!({ "memberId": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The drawer vanishes while the pool is on screen
    fixture
        .client
        .delete(fixture.url("/api/members/1"))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual/select"))
        .json(&json!({ "poolIndex": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "STALE_DRAW");
    assert!(fixture.assignments().await.is_empty());
}

#[tokio::test]
async fn test_cancel_individual_draw_commits_nothing() {
    let fixture = TestFixture::new().await;
    fixture.create_member("E1", "A").await;
    fixture.create_member("E2", "B").await;

    fixture
        .client
        .post(fixture.url("/api/draws/individual"))
        .json(&json!({ "memberId": 1 }))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .delete(fixture.url("/api/draws/individual"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(fixture.assignments().await.is_empty());

    // Selecting after cancel fails
    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual/select"))
        .json(&json!({ "poolIndex": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_no_candidates_when_everyone_is_taken() {
    let fixture = TestFixture::new().await;
    fixture.create_member("E1", "A").await;
    fixture.create_member("E2", "B").await;

    // Bulk draw takes both members as receivers
    fixture
        .client
        .post(fixture.url("/api/draws/bulk"))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .post(fixture.url("/api/draws/individual"))
        .json(&json!({ "memberId": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NO_AVAILABLE_CANDIDATES");
}

#[tokio::test]
async fn test_delete_member_cascades_into_assignments() {
    let fixture = TestFixture::new().await;
    for i in 1..=4 {
        fixture
            .create_member(&format!("E{}", i), &format!("Member {}", i))
            .await;
    }

    fixture
        .client
        .post(fixture.url("/api/draws/bulk"))
        .send()
        .await
        .unwrap();
    assert_eq!(fixture.assignments().await.len(), 4);

    fixture
        .client
        .delete(fixture.url("/api/members/2"))
        .send()
        .await
        .unwrap();

    let pairs = fixture.assignments().await;
    // Member 2's own entry and the entry targeting it are both gone
    assert_eq!(pairs.len(), 2);
    for pair in &pairs {
        assert_ne!(pair["giverId"], 2);
        assert_ne!(pair["receiverId"], 2);
    }
}

#[tokio::test]
async fn test_clear_assignments() {
    let fixture = TestFixture::new().await;
    fixture.create_member("E1", "A").await;
    fixture.create_member("E2", "B").await;

    fixture
        .client
        .post(fixture.url("/api/draws/bulk"))
        .send()
        .await
        .unwrap();
    assert_eq!(fixture.assignments().await.len(), 2);

    let resp = fixture
        .client
        .delete(fixture.url("/api/assignments"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(fixture.assignments().await.is_empty());
}

#[tokio::test]
async fn test_get_assignment_for_member() {
    let fixture = TestFixture::new().await;
    let a = fixture.create_member("E1", "A").await;
    let b = fixture.create_member("E2", "B").await;

    // Before any draw: present member, no assignment
    let resp = fixture
        .client
        .get(fixture.url("/api/assignments/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].is_null());

    fixture
        .client
        .post(fixture.url("/api/draws/bulk"))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/assignments/{}", a["id"])))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], b["id"]);

    // Unknown member is a 404, not an empty assignment
    let resp = fixture
        .client
        .get(fixture.url("/api/assignments/99"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.sqlite");

    {
        let pool = init_database(&db_path).await.unwrap();
        let service = ExchangeService::load(BlobStore::new(pool)).await.unwrap();
        service
            .create_member("E1".into(), "Alice".into(), None)
            .await
            .unwrap();
        service
            .create_member("E2".into(), "Bob".into(), None)
            .await
            .unwrap();
        service.bulk_draw().await.unwrap();
        service.delete_member(2).await.unwrap();
        service.flush().await.unwrap();
    }

    // Reopen the same database: roster, counter, and assignments come back
    let pool = init_database(&db_path).await.unwrap();
    let service = ExchangeService::load(BlobStore::new(pool)).await.unwrap();

    let members = service.list_members().await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].code, "E1");

    // The deletion cascaded before the restart
    assert!(service.assignments().await.is_empty());

    // The counter did not regress: Bob's id is not reused
    let carol = service
        .create_member("E3".into(), "Carol".into(), None)
        .await
        .unwrap();
    assert_eq!(carol.id, 3);
}

#[tokio::test]
async fn test_malformed_roster_blob_degrades_to_empty() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.sqlite");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO blobs (key, value) VALUES ('roster', 'not json at all')")
        .execute(&pool)
        .await
        .unwrap();

    let service = ExchangeService::load(BlobStore::new(pool)).await.unwrap();
    assert!(service.list_members().await.is_empty());

    // Still usable after the corrupt load
    let member = service
        .create_member("E1".into(), "Alice".into(), None)
        .await
        .unwrap();
    assert_eq!(member.id, 1);
}
