use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rpc_forwarder::ForwardError;
use serde::Serialize;
use thiserror::Error;

/// Every failure the HTTP surface can report. Each one renders as
/// `{"error": <stable code>, "detail": <text>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("origin '{0}' is not allowed")]
    OriginNotAllowed(String),
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("websocket upgrade required: {0}")]
    UpgradeRequired(String),
    #[error("upstream request failed: {0}")]
    BadGateway(String),
    #[error("no route for {method} {path}")]
    NotFound { path: String, method: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::OriginNotAllowed(_) => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::UpgradeRequired(_) => StatusCode::UPGRADE_REQUIRED,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Stable machine-readable code for the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::OriginNotAllowed(_) => "origin_not_allowed",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::InvalidJson(_) => "invalid_json",
            ApiError::UpgradeRequired(_) => "upgrade_required",
            ApiError::BadGateway(_) => "bad_gateway",
            ApiError::NotFound { .. } => "not_found",
        }
    }
}

impl From<ForwardError> for ApiError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::PayloadTooLarge { limit, .. } => ApiError::PayloadTooLarge { limit },
            ForwardError::Encode(err) => ApiError::InvalidJson(err.to_string()),
            other => ApiError::BadGateway(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (path, method) = match &self {
            ApiError::NotFound { path, method } => (Some(path.as_str()), Some(method.as_str())),
            _ => (None, None),
        };
        let body = ErrorBody {
            error: self.code(),
            detail: self.to_string(),
            path,
            method,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_found_carries_path_and_method() {
        let (status, body) = body_json(ApiError::NotFound {
            path: "/nope".into(),
            method: "GET".into(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["path"], "/nope");
        assert_eq!(body["method"], "GET");
        assert!(body["detail"].as_str().unwrap().contains("/nope"));
    }

    #[tokio::test]
    async fn other_errors_have_only_error_and_detail() {
        let (status, body) = body_json(ApiError::BadGateway("timeout".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "bad_gateway");
        assert_eq!(body["detail"], "upstream request failed: timeout");
        assert_eq!(body.as_object().unwrap().len(), 2);
    }

    #[test]
    fn forward_errors_map_to_gateway_failures() {
        let err: ApiError = ForwardError::Status {
            status: 500,
            body: "{}".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "bad_gateway");

        let err: ApiError = ForwardError::Timeout("20s".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err: ApiError = ForwardError::PayloadTooLarge { size: 10, limit: 5 }.into();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn statuses_are_never_success() {
        for err in [
            ApiError::OriginNotAllowed("x".into()),
            ApiError::PayloadTooLarge { limit: 1 },
            ApiError::InvalidJson("x".into()),
            ApiError::UpgradeRequired("x".into()),
            ApiError::BadGateway("x".into()),
        ] {
            assert!(!err.status().is_success(), "{}", err.code());
        }
    }
}
