//! HTTP server for the freightload API.
//!
//! # API Endpoints
//!
//! | Method | Path                                   | Description                     |
//! |--------|----------------------------------------|---------------------------------|
//! | GET    | `/health`                              | Health check                    |
//! | GET    | `/api/docs`                            | Endpoint listing                |
//! | GET    | `/api/logs`                            | SSE stream for real-time logs   |
//! | POST   | `/api/generate/{kind}`                 | Generate offers from CSV        |
//! | POST   | `/api/csv/upload/{type}`               | Replace a canonical CSV         |
//! | GET    | `/api/csv/info/{type}`                 | Inspect a canonical CSV         |
//! | GET    | `/api/csv/backups`                     | List CSV backups                |
//! | POST   | `/api/csv/restore/{filename}`          | Restore a CSV backup            |
//! | *      | `/api/timocom/freight-offers/...`      | Freight offer proxy             |
//! | *      | `/api/timocom/vehicle-space-offers/...`| Vehicle space offer proxy       |

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method, Uri},
    response::{sse::Event, Json, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::logs::{log_info, log_warning, LOG_BROADCASTER};
use super::types::{ServerError, ServerResult};
use super::{csv, generate, offers};
use crate::bulk::BulkOptions;
use crate::client::{OfferApi, TimocomClient};
use crate::config::Settings;
use crate::error::ConfigError;
use crate::models::OfferKind;
use crate::storage::CsvStore;

/// Uploads above this size are rejected.
const UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<CsvStore>,
    /// The exchange client, or why it could not be built.
    api: Result<Arc<dyn OfferApi>, ConfigError>,
    environment: Option<&'static str>,
}

impl AppState {
    pub fn new(settings: Settings, api: Result<Arc<dyn OfferApi>, ConfigError>) -> Self {
        let store = CsvStore::new(&settings.data_dir, settings.backup_retention);
        Self {
            settings: Arc::new(settings),
            store: Arc::new(store),
            api,
            environment: None,
        }
    }

    /// State backed by a real client configured from `TIMOCOM_*` variables.
    ///
    /// Missing credentials do not stop the server; routes that need the
    /// client answer 500 with a hint instead.
    pub fn from_env(settings: Settings) -> Self {
        match TimocomClient::from_env() {
            Ok(client) => {
                let environment = client.environment().as_str();
                let mut state = Self::new(settings, Ok(Arc::new(client)));
                state.environment = Some(environment);
                state
            }
            Err(e) => Self::new(settings, Err(e)),
        }
    }

    /// The exchange client, or a configuration error for the caller.
    pub fn api(&self) -> Result<Arc<dyn OfferApi>, ServerError> {
        self.api.clone().map_err(ServerError::Config)
    }

    pub fn credentials_configured(&self) -> bool {
        self.api.is_ok()
    }

    /// Run `f` against the store on the blocking pool.
    pub async fn with_store<T, E, F>(&self, f: F) -> ServerResult<T>
    where
        F: FnOnce(&CsvStore) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<ServerError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| ServerError::Internal(format!("storage task failed: {}", e)))?
            .map_err(Into::into)
    }

    pub fn bulk_options(&self) -> BulkOptions {
        BulkOptions {
            concurrency: self.settings.bulk_concurrency,
            retry_delay: self.settings.retry_delay,
            batch_delay: self.settings.batch_delay,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let mut timocom = Router::new();
    for kind in OfferKind::ALL {
        timocom = timocom.nest(&format!("/{}", kind.route_segment()), offers::routes(kind));
    }

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/docs", get(docs))
        .route("/api/logs", get(sse_logs))
        .nest("/api/generate", generate::routes())
        .nest("/api/csv", csv::routes())
        .nest("/api/timocom", timocom)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let port = settings.port;
    let state = AppState::from_env(settings);

    if let Err(e) = &state.api {
        log_warning(format!("⚠️  {} ({})", e, e.hint()));
        log_warning("Offer routes will answer 500 until credentials are set");
    }

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_info(format!("🚀 Freightload server running on http://localhost:{}", port));
    log_info("   POST /api/generate/{freight|vehicle-space|all}");
    log_info("   POST /api/csv/upload/{freight|vehicle}");
    log_info("   *    /api/timocom/{freight-offers|vehicle-space-offers}");
    log_info("   GET  /api/docs   - Endpoint listing");
    log_info("   GET  /api/logs   - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "freightload",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment,
        "credentialsConfigured": state.credentials_configured(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn docs() -> Json<Value> {
    let mut offer_routes = Vec::new();
    for kind in OfferKind::ALL {
        let base = format!("/api/timocom/{}", kind.route_segment());
        offer_routes.extend([
            json!({ "method": "GET", "path": base, "description": format!("List our {}s", kind.label()) }),
            json!({ "method": "POST", "path": base, "description": format!("Create a {}", kind.label()) }),
            json!({ "method": "GET", "path": format!("{}/{{id}}", base), "description": "Fetch one offer" }),
            json!({ "method": "DELETE", "path": format!("{}/{{id}}", base), "description": "Delete one offer" }),
            json!({ "method": "POST", "path": format!("{}/bulk", base), "description": "Submit an array of offers" }),
            json!({ "method": "POST", "path": format!("{}/delete-all", base), "description": "Delete every offer, body {\"confirm\": true}" }),
        ]);
    }

    Json(json!({
        "service": "freightload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "system": [
                { "method": "GET", "path": "/health", "description": "Health check" },
                { "method": "GET", "path": "/api/docs", "description": "This listing" },
                { "method": "GET", "path": "/api/logs", "description": "SSE log stream" },
            ],
            "generate": [
                { "method": "POST", "path": "/api/generate/freight", "description": "Generate freight offers, body {count, autoPost}" },
                { "method": "POST", "path": "/api/generate/vehicle-space", "description": "Generate vehicle space offers, body {count, autoPost}" },
                { "method": "POST", "path": "/api/generate/all", "description": "Generate both kinds" },
            ],
            "csv": [
                { "method": "POST", "path": "/api/csv/upload/{type}", "description": "Upload freight or vehicle CSV (multipart field 'file')" },
                { "method": "GET", "path": "/api/csv/info/{type}", "description": "Inspect the current CSV" },
                { "method": "GET", "path": "/api/csv/backups", "description": "List backups" },
                { "method": "POST", "path": "/api/csv/restore/{filename}", "description": "Restore a backup" },
            ],
            "offers": offer_routes,
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // lagged receivers skip what they missed
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn not_found(method: Method, uri: Uri) -> ServerError {
    ServerError::NotFound(format!("Route not found: {} {}", method, uri.path()))
}
