//! HTTP error mapping for the deployment API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use movelift_core::DeployError;
use serde_json::json;
use uuid::Uuid;

/// API-level error, shaped for an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request itself is unusable; nothing was queued.
    #[error("{0}")]
    BadRequest(String),

    /// Unknown job identifier.
    #[error("job not found: {0}")]
    NotFound(Uuid),

    /// Anything the caller cannot fix.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        match &err {
            DeployError::InvalidNetwork(_)
            | DeployError::InvalidNamedAddresses(_)
            | DeployError::InvalidPublishMode(_)
            | DeployError::MissingSeed
            | DeployError::UnsupportedFormat(_) => ApiError::BadRequest(err.to_string()),
            DeployError::JobNotFound(id) => ApiError::NotFound(*id),
            _ => ApiError::Internal(err.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal error serving request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_validation_maps_to_bad_request() {
        let api: ApiError = DeployError::InvalidNetwork("moonnet".to_string()).into();
        assert!(matches!(api, ApiError::BadRequest(_)));

        let api: ApiError = DeployError::MissingSeed.into();
        assert!(matches!(api, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_pipeline_failures_map_to_internal() {
        let api: ApiError = DeployError::UnrecognizedOutput.into();
        assert!(matches!(api, ApiError::Internal(_)));
    }

    #[test]
    fn test_unknown_job_maps_to_not_found() {
        let id = Uuid::new_v4();
        let api: ApiError = DeployError::JobNotFound(id).into();
        assert!(matches!(api, ApiError::NotFound(found) if found == id));
    }
}
