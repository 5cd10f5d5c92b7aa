use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::model::AuthContext;

/// Handler で、 AuthContext を受け取るための extractor
/// verify middleware が request.extensions() に insert 済みである前提
/// 見つからない場合は middleware 未設定の配線ミスなので 500
#[derive(Debug, Clone)]
pub struct VerifiedAuth(pub AuthContext);

impl<S> FromRequestParts<S> for VerifiedAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(VerifiedAuth)
            .ok_or_else(|| {
                tracing::error!("AuthContext missing; verify middleware not applied");
                AppError::Internal
            })
    }
}
