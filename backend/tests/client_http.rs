use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use freightload::client::{OfferApi, TimocomClient};
use freightload::config::TimocomConfig;
use freightload::error::ApiError;
use freightload::models::OfferKind;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;

/// base64("user:secret")
const EXPECTED_AUTH: &str = "Basic dXNlcjpzZWNyZXQ=";
const COMPANY_ID: &str = "4711";

type StubResponse = (StatusCode, Json<Value>);

fn check_request(headers: &HeaderMap, query: &HashMap<String, String>) -> Result<(), StubResponse> {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if auth != Some(EXPECTED_AUTH) {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "title": "Unauthorized" }))));
    }
    if query.get("timocom_id").map(String::as_str) != Some(COMPANY_ID) {
        return Err((StatusCode::FORBIDDEN, Json(json!({ "title": "missing timocom_id" }))));
    }
    Ok(())
}

async fn list(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> StubResponse {
    if let Err(rejected) = check_request(&headers, &query) {
        return rejected;
    }
    (
        StatusCode::OK,
        Json(json!({ "payload": [{ "id": "f-1" }, { "id": "f-2" }] })),
    )
}

async fn create(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(mut offer): Json<Value>,
) -> StubResponse {
    if let Err(rejected) = check_request(&headers, &query) {
        return rejected;
    }
    if offer.get("customer").is_none() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "title": "customer is required" })),
        );
    }
    offer["id"] = json!("f-new");
    (StatusCode::CREATED, Json(offer))
}

async fn fetch(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Path(id): Path<String>,
) -> StubResponse {
    if let Err(rejected) = check_request(&headers, &query) {
        return rejected;
    }
    (StatusCode::OK, Json(json!({ "id": id })))
}

async fn remove(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Result<StatusCode, StubResponse> {
    check_request(&headers, &query)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/my-freight-offers", get(list).post(create))
        .route("/my-freight-offers/{id}", get(fetch).delete(remove))
        .route(
            "/my-vehicle-space-offers",
            get(|| async { (StatusCode::BAD_GATEWAY, "Bad Gateway") }),
        )
        .route(
            "/my-vehicle-space-offers/{id}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "late"
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, password: &str) -> TimocomClient {
    TimocomClient::new(TimocomConfig::new("user", password, COMPANY_ID, base_url)).unwrap()
}

#[tokio::test]
async fn test_list_sends_auth_and_company_id() {
    let base = spawn_upstream().await;

    let response = client(&base, "secret").list(OfferKind::Freight).await.unwrap();

    assert!(response.success);
    assert_eq!(response.data["payload"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_wrong_credentials_surface_upstream_status() {
    let base = spawn_upstream().await;

    let err = client(&base, "wrong").list(OfferKind::Freight).await.unwrap_err();

    match err {
        ApiError::Upstream { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body["title"], "Unauthorized");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_posts_json_body() {
    let base = spawn_upstream().await;

    let offer = json!({ "objectType": "freightOffer", "customer": { "id": 1 } });
    let response = client(&base, "secret").create(OfferKind::Freight, &offer).await.unwrap();

    assert_eq!(response.data["id"], "f-new");
    assert_eq!(response.data["customer"]["id"], 1);
}

#[tokio::test]
async fn test_create_validation_error_is_upstream_4xx() {
    let base = spawn_upstream().await;

    let err = client(&base, "secret")
        .create(OfferKind::Freight, &json!({ "objectType": "freightOffer" }))
        .await
        .unwrap_err();

    assert_eq!(err.upstream_status(), Some(422));
}

#[tokio::test]
async fn test_get_and_delete_by_id() {
    let base = spawn_upstream().await;
    let c = client(&base, "secret");

    let found = c.get(OfferKind::Freight, "abc-1").await.unwrap();
    assert_eq!(found.data["id"], "abc-1");

    let deleted = c.delete(OfferKind::Freight, "abc-1").await.unwrap();
    assert!(deleted.success);
    assert_eq!(deleted.data, Value::Null);
}

#[tokio::test]
async fn test_non_json_error_body_kept_as_text() {
    let base = spawn_upstream().await;

    let err = client(&base, "secret").list(OfferKind::VehicleSpace).await.unwrap_err();

    match err {
        ApiError::Upstream { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, json!("Bad Gateway"));
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let base = spawn_upstream().await;
    let config = TimocomConfig::new("user", "secret", COMPANY_ID, base).with_timeout(Duration::from_millis(200));
    let c = TimocomClient::new(config).unwrap();

    let err = c.get(OfferKind::VehicleSpace, "slow").await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr), "secret")
        .list(OfferKind::Freight)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
