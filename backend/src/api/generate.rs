//! Offer generation routes.
//!
//! `POST /api/generate/{freight|vehicle-space|all}` with an optional body
//! `{"count": 1..=10000, "autoPost": false}`. Records are always exported
//! to JSON; with `autoPost` they are also submitted through the bulk
//! procedure.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::logs::log_info;
use super::server::AppState;
use super::types::{ServerError, ServerResult};
use crate::bulk::submit_offers;
use crate::generator::{generate_offers, validate_count, DEFAULT_COUNT};
use crate::models::OfferKind;

pub fn routes() -> Router<AppState> {
    Router::new().route("/{kind}", post(generate))
}

/// Validated request body.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GenerateRequest {
    count: usize,
    auto_post: bool,
}

impl GenerateRequest {
    /// An empty body means defaults.
    fn parse(body: &[u8]) -> ServerResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self {
                count: DEFAULT_COUNT,
                auto_post: false,
            });
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ServerError::bad_request(format!("Malformed JSON body: {}", e)))?;
        let Value::Object(fields) = value else {
            return Err(ServerError::bad_request("Body must be a JSON object"));
        };

        let count = match fields.get("count") {
            None | Some(Value::Null) => DEFAULT_COUNT,
            Some(Value::Number(n)) => {
                let n = n
                    .as_i64()
                    .ok_or_else(|| ServerError::bad_request(format!("count must be an integer, got {}", n)))?;
                validate_count(n)?
            }
            Some(Value::String(s)) => {
                let n = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ServerError::bad_request(format!("count must be an integer, got '{}'", s)))?;
                validate_count(n)?
            }
            Some(other) => {
                return Err(ServerError::bad_request(format!("count must be an integer, got {}", other)))
            }
        };

        let auto_post = match fields.get("autoPost") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(ServerError::bad_request(format!("autoPost must be a boolean, got {}", other)))
            }
        };

        Ok(Self { count, auto_post })
    }
}

async fn generate(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let kinds: Vec<OfferKind> = match segment.as_str() {
        "all" => OfferKind::ALL.to_vec(),
        other => vec![OfferKind::from_generate_segment(other).ok_or_else(|| {
            ServerError::bad_request(format!(
                "Unknown offer kind '{}', expected 'freight', 'vehicle-space' or 'all'",
                other
            ))
        })?],
    };

    let request = GenerateRequest::parse(&body)?;
    // fail on credentials before generating anything
    if request.auto_post {
        state.api()?;
    }

    let job_id = Uuid::new_v4();
    log_info(format!(
        "🧾 Job {}: {} x {} ({})",
        job_id,
        request.count,
        segment,
        if request.auto_post { "generate + post" } else { "generate only" }
    ));

    let mut results = Map::new();
    for kind in &kinds {
        let result = run_kind(&state, *kind, request).await?;
        if kinds.len() == 1 {
            let status = if request.auto_post { StatusCode::CREATED } else { StatusCode::OK };
            let mut body = result;
            body["jobId"] = json!(job_id.to_string());
            return Ok((status, Json(body)));
        }
        results.insert(kind.generate_segment().to_string(), result);
    }

    let status = if request.auto_post { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(json!({
            "success": true,
            "jobId": job_id.to_string(),
            "results": results,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    ))
}

/// Generate, export and optionally submit one kind.
async fn run_kind(state: &AppState, kind: OfferKind, request: GenerateRequest) -> ServerResult<Value> {
    let count = request.count;
    let (report, export_path) = state
        .with_store(move |store| -> ServerResult<_> {
            let report = generate_offers(kind, store.csv_path(kind), count)?;
            let export_path = store.export_offers(kind, &report.offers)?;
            Ok((report, export_path))
        })
        .await?;

    let mut body = json!({
        "success": true,
        "type": kind.generate_segment(),
        "count": report.offers.len(),
        "usableRows": report.usable_rows,
        "variations": report.variations,
        "skippedRows": report.skipped,
        "exportPath": export_path.display().to_string(),
        "timestamp": Utc::now().to_rfc3339(),
    });

    if request.auto_post {
        let api = state.api()?;
        let payloads = report
            .offers
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServerError::Internal(format!("cannot serialize offers: {}", e)))?;
        let submission = submit_offers(api.as_ref(), kind, &payloads, state.bulk_options()).await;
        body["submission"] = json!(submission);
    } else {
        body["data"] = json!(report.offers);
    }

    Ok(body)
}
