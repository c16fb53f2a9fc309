#![allow(dead_code)]

use async_trait::async_trait;
use freightload::api::{router, AppState};
use freightload::client::{offer_id, ApiResponse, OfferApi};
use freightload::config::Settings;
use freightload::error::{ApiError, ApiResult, ConfigError};
use freightload::models::OfferKind;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FREIGHT_CSV: &str = "\
customer_id,contact_first_name,contact_last_name,description,weight_t,length_m,loading_city,unloading_city
101,Ann,Meyer,Pallets of tiles,12.5,7.2,Berlin,Hamburg
102,Bob,Schulz,Steel coils,20,13.6,Munich,Cologne
103,Cem,Yilmaz,Boxes,3,2.4,Leipzig,Dresden
";

/// In-memory exchange recording every call.
#[derive(Default)]
pub struct FakeApi {
    pub offers: Mutex<Vec<(OfferKind, Value)>>,
    pub creates: AtomicUsize,
    pub deletes: AtomicUsize,
    /// Create calls fail with this upstream status when set.
    pub reject_creates: Option<u16>,
    /// Delete calls for these ids fail with 409.
    pub locked_ids: Vec<String>,
    next_id: AtomicUsize,
}

impl FakeApi {
    pub fn with_offers(kind: OfferKind, offers: Vec<Value>) -> Self {
        Self {
            offers: Mutex::new(offers.into_iter().map(|o| (kind, o)).collect()),
            ..Default::default()
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_creates: Some(status),
            ..Default::default()
        }
    }

    pub fn locking(mut self, ids: &[&str]) -> Self {
        self.locked_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn count(&self, kind: OfferKind) -> usize {
        self.offers.lock().unwrap().iter().filter(|(k, _)| *k == kind).count()
    }
}

#[async_trait]
impl OfferApi for FakeApi {
    async fn list(&self, kind: OfferKind) -> ApiResult<ApiResponse> {
        let offers: Vec<Value> = self
            .offers
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, o)| o.clone())
            .collect();
        Ok(ApiResponse::ok(json!({ "payload": offers })))
    }

    async fn get(&self, kind: OfferKind, id: &str) -> ApiResult<ApiResponse> {
        self.offers
            .lock()
            .unwrap()
            .iter()
            .find(|(k, o)| *k == kind && offer_id(o).as_deref() == Some(id))
            .map(|(_, o)| ApiResponse::ok(o.clone()))
            .ok_or(ApiError::Upstream {
                status: 404,
                body: json!({ "title": "Not Found" }),
            })
    }

    async fn create(&self, kind: OfferKind, offer: &Value) -> ApiResult<ApiResponse> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.reject_creates {
            return Err(ApiError::Upstream {
                status,
                body: json!({ "title": "rejected" }),
            });
        }

        let id = format!("offer-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut stored = offer.clone();
        stored["id"] = json!(id);
        self.offers.lock().unwrap().push((kind, stored.clone()));
        Ok(ApiResponse::ok(stored))
    }

    async fn delete(&self, kind: OfferKind, id: &str) -> ApiResult<ApiResponse> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.locked_ids.iter().any(|locked| locked == id) {
            return Err(ApiError::Upstream {
                status: 409,
                body: json!({ "title": "offer is locked" }),
            });
        }
        let mut offers = self.offers.lock().unwrap();
        let before = offers.len();
        offers.retain(|(k, o)| !(*k == kind && offer_id(o).as_deref() == Some(id)));
        if offers.len() == before {
            return Err(ApiError::Upstream {
                status: 404,
                body: Value::Null,
            });
        }
        Ok(ApiResponse::ok(Value::Null))
    }
}

/// Settings rooted at `data_dir` with every pause set to zero.
pub fn fast_settings(data_dir: &Path) -> Settings {
    Settings {
        data_dir: data_dir.to_path_buf(),
        retry_delay: Duration::ZERO,
        batch_delay: Duration::ZERO,
        delete_delay: Duration::ZERO,
        ..Settings::default()
    }
}

pub fn app_with(data_dir: &Path, api: Arc<FakeApi>) -> axum::Router {
    let state = AppState::new(fast_settings(data_dir), Ok(api as Arc<dyn OfferApi>));
    router(state)
}

pub fn app_without_credentials(data_dir: &Path) -> axum::Router {
    let state = AppState::new(fast_settings(data_dir), Err(ConfigError::MissingVar("TIMOCOM_USERNAME")));
    router(state)
}
