//! Integration tests for the drug catalog backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::clock::ManualClock;
use crate::config::Config;
use crate::store::{paths, DocumentStore, MemoryStore};
use crate::{create_router, AppState};

const API_KEY: &str = "test-api-key";
const ADMIN: &str = "admin@example.com";
const START: i64 = 1_709_634_030_123;

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some(API_KEY.to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::at_millis(START));

        let config = Config {
            api_psk: psk.clone(),
            store_url: crate::config::MEMORY_STORE_URL.to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            catalog_timeout: Duration::from_secs(5),
        };

        let state = AppState::new(store.clone(), clock.clone(), config);
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
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-admin-email", ADMIN.parse().unwrap());
        if let Some(key) = psk {
            headers.insert("x-api-key", key.parse().unwrap());
        }

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url,
            store,
            clock,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn import_file(&self, rows: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/admin/data/import/file?fileName=drugs.json"))
            .body(rows.to_string())
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "GET {}", path);
        resp.json().await.unwrap()
    }
}

fn sample_rows() -> Value {
    json!([
        { "name": "Panadol", "newPrice": "30", "oldPrice": "24", "no": "101" },
        { "name": "", "newPrice": "5", "oldPrice": "5", "no": "102" },
        { "name": "Brufen", "newPrice": 40, "oldPrice": 50, "no": "103", "averageDiscountPercent": 10 },
        { "name": "Cataflam", "newPrice": 20, "oldPrice": 20, "no": "104" }
    ])
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
async fn test_router_rejects_admin_request_in_process() {
    let config = Config {
        api_psk: Some(API_KEY.to_string()),
        store_url: crate::config::MEMORY_STORE_URL.to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        catalog_timeout: Duration::from_secs(5),
    };
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::at_millis(START)),
        config,
    );

    let resp = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/admin/data/backups")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["message"], "Missing or invalid API key");
}

#[tokio::test]
async fn test_admin_routes_require_psk() {
    let fixture = TestFixture::new().await;
    let anonymous = Client::new();

    let resp = anonymous
        .get(fixture.url("/api/admin/logs"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = anonymous
        .get(fixture.url("/api/admin/logs"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = anonymous
        .get(fixture.url("/api/admin/logs"))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The public catalog needs no key
    let resp = anonymous
        .get(fixture.url("/api/catalog"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_dev_mode_without_psk() {
    let fixture = TestFixture::with_psk(None).await;

    let body = fixture.get_json("/api/admin/data/backups").await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_import_file_then_export_and_browse() {
    let fixture = TestFixture::new().await;

    let resp = fixture.import_file(&sample_rows()).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["importedCount"], 3);
    assert_eq!(body["data"]["message"], "Successfully imported 3 drugs");
    assert_eq!(
        body["data"]["errors"],
        json!(["Row 2: Missing or invalid name"])
    );

    // Export returns exactly what was written
    let body = fixture.get_json("/api/admin/data/export").await;
    let exported: Value = serde_json::from_str(body["data"].as_str().unwrap()).unwrap();
    let stored = fixture.store.get(paths::CATALOG).await.unwrap().unwrap();
    assert_eq!(exported, stored);
    assert_eq!(exported[0]["id"], format!("drug_{}_0", START));
    assert_eq!(exported[0]["priceChange"], 6.0);
    assert_eq!(exported[0]["priceChangePercent"], 25.0);
    assert_eq!(exported[1]["name"], "Brufen");
    assert_eq!(exported[1]["originalOrder"], 2);
    assert_eq!(exported[1]["updateDate"], "2024-03-05");

    // The public catalog shows the same entries
    let body = fixture.get_json("/api/catalog").await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["pageSize"], 16);
    assert_eq!(body["data"]["items"][0]["name"], "Panadol");
    assert_eq!(body["data"]["lastUpdated"], "2024-03-05T10:20:30.123Z");

    let logs = fixture.get_json("/api/admin/logs").await;
    assert_eq!(logs["data"][0]["action"], "import_from_file");
    assert_eq!(logs["data"][0]["adminEmail"], ADMIN);
    assert_eq!(
        logs["data"][0]["details"],
        "Imported 3 drugs from file: drugs.json"
    );
}

#[tokio::test]
async fn test_import_failures_write_nothing() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/data/import/file"))
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "IMPORT_FAILED");
    assert_eq!(body["error"]["message"], "Invalid JSON format in file");

    let resp = fixture.import_file(&json!({ "name": "A" })).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "File must contain an array of drug objects"
    );

    let resp = fixture
        .import_file(&json!([{ "name": "A", "newPrice": 0, "oldPrice": 1, "no": "1" }]))
        .await;
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "No valid drugs found in file");
    assert_eq!(
        body["error"]["details"]["errors"],
        json!(["Row 1: Missing or invalid newPrice"])
    );

    assert!(fixture.store.writes().await.is_empty());
}

#[tokio::test]
async fn test_mutations_require_admin_email() {
    let fixture = TestFixture::new().await;
    let client = Client::new();

    let resp = client
        .delete(fixture.url("/api/admin/data"))
        .header("x-api-key", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    assert!(fixture.store.writes().await.is_empty());
}

#[tokio::test]
async fn test_import_from_url() {
    let fixture = TestFixture::new().await;
    let source = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drugs.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_rows()))
        .mount(&source)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&source)
        .await;

    let url = format!("{}/drugs.json", source.uri());
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/data/import/url"))
        .json(&json!({ "url": url }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["importedCount"], 3);
    assert_eq!(
        body["data"]["message"],
        "Successfully imported 3 drugs from URL"
    );

    let logs = fixture.get_json("/api/admin/logs").await;
    assert_eq!(logs["data"][0]["action"], "import_from_url");
    assert_eq!(
        logs["data"][0]["details"],
        format!("Imported 3 drugs from URL: {}", url)
    );

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/data/import/url"))
        .json(&json!({ "url": format!("{}/missing.json", source.uri()) }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "Import from URL failed: Failed to fetch data: 404 Not Found"
    );

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/data/import/url"))
        .json(&json!({ "url": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_delete_all_backup_and_restore() {
    let fixture = TestFixture::new().await;
    fixture.import_file(&sample_rows()).await;
    let before = fixture.get_json("/api/admin/data/export").await;

    fixture.clock.advance_millis(1_000);
    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/data"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let backup_id = (START + 1_000).to_string();
    assert_eq!(body["data"]["backupId"], backup_id);

    let emptied = fixture.get_json("/api/admin/data/export").await;
    assert_eq!(emptied["data"], "null");

    let catalog = fixture.get_json("/api/catalog").await;
    assert_eq!(catalog["data"]["total"], 0);

    let backups = fixture.get_json("/api/admin/data/backups").await;
    assert_eq!(backups["data"], json!([backup_id]));

    fixture.clock.advance_millis(1_000);
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/data/restore"))
        .json(&json!({ "backupId": backup_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["restoredFrom"], backup_id);

    let after = fixture.get_json("/api/admin/data/export").await;
    assert_eq!(after["data"], before["data"]);

    let logs = fixture.get_json("/api/admin/logs").await;
    let actions: Vec<&str> = logs["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["restore_data", "delete_all_data", "import_from_file"]
    );
    assert_eq!(
        logs["data"][0]["details"],
        format!("Restored data from backup: {}", backup_id)
    );
}

#[tokio::test]
async fn test_restore_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/data/restore"))
        .json(&json!({ "backupId": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/data/restore"))
        .json(&json!({ "backupId": "../drugs" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert!(fixture.store.writes().await.is_empty());
}

#[tokio::test]
async fn test_catalog_query_filters() {
    let fixture = TestFixture::new().await;
    fixture.import_file(&sample_rows()).await;

    let body = fixture
        .get_json("/api/catalog?change=decreased&hasDiscount=true")
        .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Brufen");

    let body = fixture.get_json("/api/catalog?sort=price&order=desc").await;
    let names: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Brufen", "Panadol", "Cataflam"]);

    let body = fixture.get_json("/api/catalog?q=103").await;
    assert_eq!(body["data"]["items"][0]["no"], "103");
}

#[tokio::test]
async fn test_admin_entry_crud() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/drugs"))
        .json(&json!({ "name": "Panadol Extra", "newPrice": "45.5", "oldPrice": 40 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["slot"], "1");
    assert_eq!(body["data"]["entry"]["updateDate"], "2024-03-05");

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/drugs/1"))
        .json(&json!({ "name": "Panadol Extra", "newPrice": 50, "oldPrice": 40, "no": "P-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let catalog = fixture.get_json("/api/catalog").await;
    assert_eq!(catalog["data"]["total"], 1);
    assert_eq!(catalog["data"]["items"][0]["no"], "P-1");
    assert_eq!(catalog["data"]["items"][0]["priceChangePercent"], 25.0);
    assert_eq!(catalog["data"]["lastUpdated"], "2024-03-05");

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/drugs"))
        .json(&json!({ "name": "No price" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/drugs/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .delete(fixture.url("/api/admin/drugs/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let catalog = fixture.get_json("/api/catalog").await;
    assert_eq!(catalog["data"]["total"], 0);
}

#[tokio::test]
async fn test_content_pages() {
    let fixture = TestFixture::new().await;

    let body = fixture.get_json("/api/admin/pages/about").await;
    assert_eq!(body["data"], Value::Null);

    let page = json!({ "title": "About us", "body": "Prices updated daily." });
    let resp = fixture
        .client
        .put(fixture.url("/api/admin/pages/about"))
        .json(&page)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body = fixture.get_json("/api/admin/pages/about").await;
    assert_eq!(body["data"], page);

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/pages/secrets"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
