//! HTTP error boundary: every handler failure leaves through [`ApiError`].

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metabridge_core::ExchangeError;
use tracing::{error, warn};

#[derive(Debug)]
pub struct ApiError(pub ExchangeError);

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ExchangeError::InvalidRequest(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ExchangeError::MissingParameter(_)
            | ExchangeError::InvalidRequest(_)
            | ExchangeError::MalformedPackage(_) => StatusCode::BAD_REQUEST,
            ExchangeError::DuplicateTitle(_) | ExchangeError::DuplicateId(_) => StatusCode::CONFLICT,
            ExchangeError::NotFound(_) | ExchangeError::UnknownPeer(_) => StatusCode::NOT_FOUND,
            ExchangeError::PeerUnavailable(_) => StatusCode::BAD_GATEWAY,
            ExchangeError::Translation(_) | ExchangeError::Seed(_) | ExchangeError::Package(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "request failed");
        } else {
            warn!(status = %status, error = %self.0, "request rejected");
        }
        (status, Json(serde_json::json!({ "message": self.0.to_string() }))).into_response()
    }
}
