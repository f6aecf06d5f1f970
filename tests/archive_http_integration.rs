//! Integration tests for the archive lifecycle over HTTP.
//!
//! Each test spins up the full Axum app on a random port and drives it with
//! reqwest, exercising the real REST contract.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

use contact_archive::archive::Archiver;
use contact_archive::config::ArchiveConfig;
use contact_archive::contacts::{ContactStore, JsonContactStore};
use contact_archive::server::create_app;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-step delay for the archive worker in these tests.
const STEP: Duration = Duration::from_millis(20);

/// Start the app on a random port, return its base URL.
async fn start_server(dir: &Path) -> String {
    let store: Arc<dyn ContactStore> =
        Arc::new(JsonContactStore::new(dir.join("contacts.json")));
    let archiver = Archiver::new(ArchiveConfig {
        steps: 3,
        step_delay: STEP,
    });
    let app = create_app(store, archiver, dir.to_path_buf());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

async fn archive(client: &reqwest::Client, base: &str, method: reqwest::Method) -> Value {
    client
        .request(method, format!("{base}/contacts/archive"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// Poll until the archive reports `status`, recording every progress value seen.
async fn poll_until(client: &reqwest::Client, base: &str, status: &str) -> Vec<f64> {
    let mut seen = Vec::new();
    loop {
        let snap = archive(client, base, reqwest::Method::GET).await;
        seen.push(snap["progress"].as_f64().unwrap());
        if snap["status"] == status {
            return seen;
        }
        sleep(STEP / 4).await;
    }
}

#[tokio::test]
async fn full_archive_lifecycle() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let base = start_server(dir.path()).await;
        let client = reqwest::Client::new();

        let created = client
            .post(format!("{base}/contacts/new"))
            .json(&serde_json::json!({"first": "Ann", "email": "ann@example.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), reqwest::StatusCode::CREATED);

        let idle = archive(&client, &base, reqwest::Method::GET).await;
        assert_eq!(idle["status"], "idle");

        let started = archive(&client, &base, reqwest::Method::POST).await;
        assert_eq!(started["status"], "running");
        let generation = started["generation"].as_u64().unwrap();

        // A second start while running is ignored.
        let again = archive(&client, &base, reqwest::Method::POST).await;
        assert_eq!(again["generation"].as_u64().unwrap(), generation);

        let seen = poll_until(&client, &base, "complete").await;
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(*seen.last().unwrap(), 1.0);

        let file = client
            .get(format!("{base}/contacts/archive/file"))
            .send()
            .await
            .unwrap();
        assert_eq!(file.status(), reqwest::StatusCode::OK);
        let contacts: Value = file.json().await.unwrap();
        assert_eq!(contacts[0]["email"], "ann@example.com");

        let reset = archive(&client, &base, reqwest::Method::DELETE).await;
        assert_eq!(reset["status"], "idle");
        assert_eq!(reset["progress"], 0.0);

        let refused = client
            .get(format!("{base}/contacts/archive/file"))
            .send()
            .await
            .unwrap();
        assert_eq!(refused.status(), reqwest::StatusCode::CONFLICT);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reset_mid_run_stays_idle() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let base = start_server(dir.path()).await;
        let client = reqwest::Client::new();

        archive(&client, &base, reqwest::Method::POST).await;
        sleep(STEP + STEP / 2).await;
        let reset = archive(&client, &base, reqwest::Method::DELETE).await;
        assert_eq!(reset["status"], "idle");

        // Outlast the stale worker's whole schedule.
        sleep(STEP * 6).await;
        let snap = archive(&client, &base, reqwest::Method::GET).await;
        assert_eq!(snap["status"], "idle");
        assert_eq!(snap["progress"], 0.0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn listing_embeds_archive_snapshot() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let base = start_server(dir.path()).await;
        let client = reqwest::Client::new();

        archive(&client, &base, reqwest::Method::POST).await;
        let page: Value = client
            .get(format!("{base}/contacts"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(page["archive"]["status"], "running");
    })
    .await
    .expect("test timed out");
}
