//! Response envelopes and the HTTP error type.
//!
//! Successful handlers answer `{success: true, data, timestamp}`; errors
//! answer `{success: false, error, details?, hint?, timestamp}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::api::logs::log_error;
use crate::error::{ApiError, ConfigError, CsvError, GenerateError, StorageError};

/// Errors a handler can answer with.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request, rejected before any work.
    #[error("{0}")]
    BadRequest(String),

    /// No route matches.
    #[error("{0}")]
    NotFound(String),

    /// Client configuration unusable when a route needs the client.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Generate(#[from] GenerateError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ServerError::BadRequest(message.into())
    }

    /// Status, details and hint for this error.
    fn parts(&self) -> (StatusCode, Option<Value>, Option<String>) {
        match self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, None, None),
            ServerError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                None,
                Some("See GET /api/docs for available endpoints".to_string()),
            ),
            ServerError::Config(e) => (StatusCode::INTERNAL_SERVER_ERROR, None, Some(e.hint())),
            ServerError::Api(e) => api_parts(e),
            ServerError::Storage(e) => match e {
                StorageError::InvalidBackupName(_) | StorageError::Csv(_) => {
                    (StatusCode::BAD_REQUEST, None, None)
                }
                StorageError::BackupNotFound(_) => (
                    StatusCode::NOT_FOUND,
                    None,
                    Some("List available backups with GET /api/csv/backups".to_string()),
                ),
                StorageError::Io(_) | StorageError::Json(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, None, None)
                }
            },
            ServerError::Generate(e) => match e {
                GenerateError::InvalidCount { .. } => (StatusCode::BAD_REQUEST, None, None),
                GenerateError::Csv(CsvError::NotFound(_)) => (
                    StatusCode::BAD_REQUEST,
                    None,
                    Some("Upload a CSV first with POST /api/csv/upload/{freight|vehicle}".to_string()),
                ),
                GenerateError::Csv(_) => (StatusCode::INTERNAL_SERVER_ERROR, None, None),
            },
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None, None),
        }
    }
}

fn api_parts(e: &ApiError) -> (StatusCode, Option<Value>, Option<String>) {
    match e {
        ApiError::Upstream { status, body } => {
            let code = if (400..500).contains(status) {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (
                code,
                Some(json!({ "upstreamStatus": status, "upstreamBody": body })),
                None,
            )
        }
        ApiError::Transport(_) => (StatusCode::INTERNAL_SERVER_ERROR, None, None),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, details, hint) = self.parts();
        if status.is_server_error() {
            log_error(format!("❌ {}", self));
        }

        let mut body = error_response(&self.to_string());
        if let Some(details) = details {
            body["details"] = details;
        }
        if let Some(hint) = hint {
            body["hint"] = Value::String(hint);
        }

        (status, Json(body)).into_response()
    }
}

/// Create an error body.
pub fn error_response(error: &str) -> Value {
    json!({
        "success": false,
        "error": error,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

/// Wrap `data` in the success envelope.
pub fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": data,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServerError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(ServerError::bad_request("no")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(ConfigError::MissingVar("TIMOCOM_ID").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ApiError::Upstream { status: 404, body: Value::Null }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Upstream { status: 503, body: Value::Null }.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(GenerateError::InvalidCount { count: 0, max: 10 }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StorageError::InvalidBackupName("../x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(GenerateError::Csv(CsvError::NoUsableRows(2)).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_details_attached() {
        let err: ServerError = ApiError::Upstream {
            status: 422,
            body: json!({"detail": "bad date"}),
        }
        .into();
        let (_, details, _) = err.parts();
        let details = details.unwrap();
        assert_eq!(details["upstreamStatus"], 422);
        assert_eq!(details["upstreamBody"]["detail"], "bad date");
    }

    #[test]
    fn test_config_error_has_hint() {
        let err: ServerError = ConfigError::MissingVar("TIMOCOM_USERNAME").into();
        let (_, _, hint) = err.parts();
        assert!(hint.unwrap().contains("TIMOCOM_USERNAME"));
    }

    #[test]
    fn test_envelopes() {
        let body = error_response("nope");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "nope");

        let Json(ok) = success(vec![1, 2]);
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"][1], 2);
    }
}
