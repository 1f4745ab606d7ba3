use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fleetgate_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Wire shape of every error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let interface = self.0;
        let status =
            StatusCode::from_u16(interface.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(
                event_name = "http.request.failed",
                correlation_id = %interface.correlation_id(),
                status = status.as_u16(),
                error = %interface,
                "request failed"
            );
        } else {
            warn!(
                event_name = "http.request.rejected",
                correlation_id = %interface.correlation_id(),
                status = status.as_u16(),
                error = %interface,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: interface.public_message(),
            correlation_id: interface.correlation_id().to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(interface.correlation_id()) {
            response.headers_mut().insert(CORRELATION_HEADER, value);
        }
        response
    }
}

/// Request correlation id: the caller's `x-correlation-id` header, or a fresh
/// uuid. Stored in the request extensions so every extractor sees the same id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn from_parts(parts: &mut Parts) -> Self {
        if let Some(existing) = parts.extensions.get::<CorrelationId>() {
            return existing.clone();
        }

        let id = parts
            .headers
            .get(CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty() && value.len() <= 128)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let correlation_id = CorrelationId(id);
        parts.extensions.insert(correlation_id.clone());
        correlation_id
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tags an application failure with this request's id.
    pub fn fail(&self, error: ApplicationError) -> ApiError {
        ApiError(error.into_interface(self.0.clone()))
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::Request, response::IntoResponse};
    use fleetgate_core::errors::{ApplicationError, DomainError};

    use super::{CorrelationId, CORRELATION_HEADER};

    #[tokio::test]
    async fn error_response_carries_public_message_and_correlation_id() {
        let (mut parts, _) = Request::builder()
            .header(CORRELATION_HEADER, "req-42")
            .body(())
            .expect("request")
            .into_parts();
        let correlation_id = CorrelationId::from_parts(&mut parts);
        assert_eq!(correlation_id.as_str(), "req-42");

        let response = correlation_id
            .fail(ApplicationError::from(DomainError::Validation("driverName is required".into())))
            .into_response();
        assert_eq!(response.status().as_u16(), 400);
        assert_eq!(
            response.headers().get(CORRELATION_HEADER).and_then(|v| v.to_str().ok()),
            Some("req-42")
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["correlationId"], "req-42");
        assert!(json["error"].as_str().unwrap_or_default().contains("driverName"));
    }

    #[tokio::test]
    async fn persistence_detail_is_not_exposed() {
        let response = CorrelationId("req-7".to_string())
            .fail(ApplicationError::Persistence("disk I/O error at page 12".into()))
            .into_response();
        assert_eq!(response.status().as_u16(), 503);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(!text.contains("page 12"));
    }

    #[test]
    fn generated_id_is_reused_within_one_request() {
        let (mut parts, _) = Request::builder().body(()).expect("request").into_parts();
        let first = CorrelationId::from_parts(&mut parts);
        let second = CorrelationId::from_parts(&mut parts);
        assert_eq!(first, second);
        assert!(!first.as_str().is_empty());
    }
}
