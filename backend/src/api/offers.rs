//! Offer proxy routes, mounted once per offer kind.
//!
//! | Method | Path          | Description                              |
//! |--------|---------------|------------------------------------------|
//! | GET    | `/`           | List our offers                          |
//! | POST   | `/`           | Create one offer                         |
//! | GET    | `/{id}`       | Fetch one offer                          |
//! | DELETE | `/{id}`       | Delete one offer                         |
//! | POST   | `/bulk`       | Submit an array through the bulk procedure |
//! | POST   | `/delete-all` | Delete every offer, needs `{"confirm": true}` |

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::Value;

use super::logs::{log_info, log_success};
use super::server::AppState;
use super::types::{success, ServerError, ServerResult};
use crate::bulk::{delete_all, submit_offers};
use crate::client::ApiResponse;
use crate::models::OfferKind;

pub fn routes(kind: OfferKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_offers).post(create_offer))
        .route("/bulk", post(bulk_create))
        .route("/delete-all", post(delete_all_offers))
        .route("/{id}", get(get_offer).delete(delete_offer))
        .layer(Extension(kind))
}

async fn list_offers(
    State(state): State<AppState>,
    Extension(kind): Extension<OfferKind>,
) -> ServerResult<Json<ApiResponse>> {
    let api = state.api()?;
    Ok(Json(api.list(kind).await?))
}

async fn get_offer(
    State(state): State<AppState>,
    Extension(kind): Extension<OfferKind>,
    Path(id): Path<String>,
) -> ServerResult<Json<ApiResponse>> {
    let id = required_id(&id)?;
    let api = state.api()?;
    Ok(Json(api.get(kind, id).await?))
}

async fn create_offer(
    State(state): State<AppState>,
    Extension(kind): Extension<OfferKind>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<ApiResponse>)> {
    let Json(mut offer) = body.map_err(|e| ServerError::bad_request(e.body_text()))?;
    prepare_offer(kind, &mut offer).map_err(ServerError::BadRequest)?;

    let api = state.api()?;
    let created = api.create(kind, &offer).await?;
    log_success(format!("Created {}", kind.label()));
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_offer(
    State(state): State<AppState>,
    Extension(kind): Extension<OfferKind>,
    Path(id): Path<String>,
) -> ServerResult<Json<ApiResponse>> {
    let id = required_id(&id)?;
    let api = state.api()?;
    let deleted = api.delete(kind, id).await?;
    log_info(format!("🗑️  Deleted {} {}", kind.label(), id));
    Ok(Json(deleted))
}

/// Body is a JSON array of offers, or `{"offers": [...]}`.
async fn bulk_create(
    State(state): State<AppState>,
    Extension(kind): Extension<OfferKind>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let Json(body) = body.map_err(|e| ServerError::bad_request(e.body_text()))?;
    let mut offers = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("offers") {
            Some(Value::Array(items)) => items,
            _ => return Err(ServerError::bad_request("Expected an array of offers")),
        },
        _ => return Err(ServerError::bad_request("Expected an array of offers")),
    };

    if offers.is_empty() {
        return Err(ServerError::bad_request("No offers to submit"));
    }

    let mut invalid = Vec::new();
    for (index, offer) in offers.iter_mut().enumerate() {
        if let Err(reason) = prepare_offer(kind, offer) {
            invalid.push(format!("#{}: {}", index, reason));
        }
    }
    if !invalid.is_empty() {
        return Err(ServerError::bad_request(format!(
            "{} invalid offer(s): {}",
            invalid.len(),
            invalid.join("; ")
        )));
    }

    let api = state.api()?;
    let result = submit_offers(api.as_ref(), kind, &offers, state.bulk_options()).await;
    Ok((StatusCode::CREATED, success(result)))
}

/// Needs `{"confirm": true}`; anything else is rejected before any call.
async fn delete_all_offers(
    State(state): State<AppState>,
    Extension(kind): Extension<OfferKind>,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<Json<Value>> {
    let confirmed = matches!(&body, Ok(Json(v)) if v.get("confirm") == Some(&Value::Bool(true)));
    if !confirmed {
        return Err(ServerError::bad_request(format!(
            "Deleting all {}s requires {{\"confirm\": true}}",
            kind.label()
        )));
    }

    let api = state.api()?;
    let result = delete_all(api.as_ref(), kind, state.settings.delete_delay).await?;
    Ok(success(result))
}

fn required_id(id: &str) -> ServerResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ServerError::bad_request("Offer id is required"));
    }
    Ok(id)
}

/// Check the customer reference and fill in `objectType` when absent.
fn prepare_offer(kind: OfferKind, offer: &mut Value) -> Result<(), String> {
    let Some(fields) = offer.as_object_mut() else {
        return Err("offer must be a JSON object".to_string());
    };

    let has_customer = match fields.get("customer").and_then(|c| c.get("id")) {
        Some(Value::Number(_)) => true,
        Some(Value::String(s)) => !s.trim().is_empty(),
        _ => false,
    };
    if !has_customer {
        return Err("customer.id is required".to_string());
    }

    fields
        .entry("objectType")
        .or_insert_with(|| Value::String(kind.object_type().to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prepare_offer_injects_object_type() {
        let mut offer = json!({ "customer": { "id": 7 } });
        prepare_offer(OfferKind::VehicleSpace, &mut offer).unwrap();
        assert_eq!(offer["objectType"], "vehicleSpaceOffer");

        let mut explicit = json!({ "objectType": "custom", "customer": { "id": "7" } });
        prepare_offer(OfferKind::Freight, &mut explicit).unwrap();
        assert_eq!(explicit["objectType"], "custom");
    }

    #[test]
    fn test_prepare_offer_requires_customer() {
        assert!(prepare_offer(OfferKind::Freight, &mut json!({})).is_err());
        assert!(prepare_offer(OfferKind::Freight, &mut json!({ "customer": {} })).is_err());
        assert!(prepare_offer(OfferKind::Freight, &mut json!({ "customer": { "id": " " } })).is_err());
        assert!(prepare_offer(OfferKind::Freight, &mut json!([1])).is_err());
    }

    #[test]
    fn test_required_id() {
        assert_eq!(required_id(" abc ").unwrap(), "abc");
        assert!(required_id("  ").is_err());
    }
}
