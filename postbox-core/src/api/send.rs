//! POST /send

use crate::domain::{DispatchResponse, SendRequest};
use crate::service::MailDispatcher;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;

/// Dispatch one message. Always answers with the `{statusCode, body}` shape.
pub async fn send(
    State(dispatcher): State<Arc<MailDispatcher>>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> DispatchResponse {
    match payload {
        Ok(Json(request)) => dispatcher.handle(request).await,
        Err(rejection) => {
            warn!("Rejected send request: {}", rejection.body_text());
            DispatchResponse::failed(rejection.body_text())
        }
    }
}

impl IntoResponse for DispatchResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::STATUS_FAILED;

    #[test]
    fn test_success_maps_to_200() {
        let response = DispatchResponse::sent("<id@acme.test>".to_string(), None).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_failure_maps_to_400() {
        let failed = DispatchResponse::failed("boom");
        assert_eq!(failed.status_code, STATUS_FAILED);
        assert_eq!(failed.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
