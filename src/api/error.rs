use crate::model::{NarrativeError, ProviderError, ServiceError, StorageError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    /// 400 - missing or invalid input
    BadRequest(String),
    /// 404 - unknown symbol, asset or record
    NotFound(String),
    /// 502 - a market-data provider failed
    Upstream(String),
    /// 503 - narrative analysis has no model configured
    Unavailable(String),
    /// 500
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = ErrorBody {
            error: error_type.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NoData(msg) => ApiError::NotFound(msg),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound("record not found".into()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<NarrativeError> for ApiError {
    fn from(err: NarrativeError) -> Self {
        match err {
            NarrativeError::Unconfigured => ApiError::Unavailable(err.to_string()),
            other => ApiError::Internal(format!("LLM error: {}", other)),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Provider(e) => e.into(),
            ServiceError::Narrative(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let status = |e: ApiError| e.into_response().status();
        assert_eq!(
            status(ProviderError::NoData("ZZZZ".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(ProviderError::Status(429).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(StorageError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(NarrativeError::Malformed("prose".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ServiceError::Narrative(NarrativeError::Unconfigured).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
