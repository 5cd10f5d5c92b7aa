/*
 * Responsibility
 * - POST /msg/{*path}
 * - normalize (extractor) → 認可 (data.auth) → dispatch (data.msg.<schema>)
 * - 各段の失敗は AppError として返す
 */
use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
};

use crate::api::extractors::{NormalizedBody, VerifiedAuth};
use crate::error::AppError;
use crate::model::{AuthQueryInput, MessageQueryInput, Schema};
use crate::state::AppState;

pub async fn post_message(
    State(state): State<AppState>,
    Path(path): Path<String>,
    VerifiedAuth(auth): VerifiedAuth,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    NormalizedBody(body): NormalizedBody,
) -> Result<StatusCode, AppError> {
    let schema = Schema::from_path(&path);
    if schema.as_str().is_empty() {
        return Err(AppError::InvalidInput("empty schema".into()));
    }

    let auth_input = AuthQueryInput::new(&method, uri.path(), &headers, auth);
    state.gate.check(&auth_input).await?;

    let input = MessageQueryInput::from_auth(auth_input, body);
    state.dispatcher.dispatch(&schema, &input).await?;

    Ok(StatusCode::OK)
}
