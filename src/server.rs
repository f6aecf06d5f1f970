//! Router assembly and serving.

use std::path::PathBuf;
use std::sync::Arc;

use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::archive::{ARTIFACT_NAME, ArchiveRouteState, Archiver, archive_routes};
use crate::config::AppConfig;
use crate::contacts::{ContactRouteState, ContactStore, JsonContactStore, contact_routes};

/// Build the full application router.
///
/// Every route shares the same `Archiver`, so all handlers observe one job.
pub fn create_app(store: Arc<dyn ContactStore>, archiver: Archiver, data_dir: PathBuf) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .merge(contact_routes(ContactRouteState {
            store,
            archiver: archiver.clone(),
        }))
        .merge(archive_routes(ArchiveRouteState { archiver, data_dir }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Load contacts, bind the configured port, and serve until the process exits.
pub async fn run(config: AppConfig) -> crate::error::Result<()> {
    // The contacts file doubles as the archive artifact.
    let contacts_path = config.data_dir.join(ARTIFACT_NAME);
    let store: Arc<dyn ContactStore> = Arc::new(JsonContactStore::load(&contacts_path).await?);
    let archiver = Archiver::new(config.archive.clone());

    info!(
        contacts = %store.path().display(),
        steps = config.archive.steps,
        step_delay = ?config.archive.step_delay,
        "Configuration loaded"
    );

    let app = create_app(store, archiver, config.data_dir.clone());
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    serve(listener, app).await
}

/// Serve `app` on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, app: Router) -> crate::error::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Contact server started");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Redirect {
    Redirect::to("/contacts")
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "contact-archive"
    }))
}
