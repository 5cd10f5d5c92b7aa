/*
 * Responsibility
 * - URL 構造を定義
 * - /health は認証なし、/msg/{*path} には verifier chain を route_layer で適用
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{health::health, message::post_message};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let msg = Router::new().route("/msg/{*path}", post(post_message));
    let msg = middleware::auth::verify::apply(msg, state);

    Router::new().route("/health", get(health)).merge(msg)
}
