/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / plain-text error body)
 * - VerifyError / PolicyError / ChatError を統一的に変換
 * - エラーは必ずログ + Sentry へ送る
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::VerifyError;
use crate::services::chat::ChatError;
use crate::services::policy::PolicyError;
use crate::services::telemetry;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request body: {0}")]
    InvalidInput(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("request denied by policy")]
    Forbidden { status: StatusCode },

    #[error("request verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::UnsupportedContentType(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Forbidden { status } => *status,
            AppError::Verification(_) => StatusCode::UNAUTHORIZED,
            AppError::Policy(_) | AppError::Chat(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let event_id = telemetry::report(&self);
        tracing::error!(
            error = %self,
            status = status.as_u16(),
            sentry_event_id = %event_id,
            "request failed"
        );

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn body_is_the_error_message() {
        let res = AppError::InvalidInput("expected value at line 1 column 1".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            &body[..],
            b"invalid request body: expected value at line 1 column 1"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::Forbidden {
                status: StatusCode::OK
            }
            .status(),
            StatusCode::OK
        );
        assert_eq!(
            AppError::Verification(VerifyError::SignatureMismatch).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Chat(ChatError::Api("not_in_channel".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::UnsupportedContentType("bogus".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
