//! verifier chain を実行 → AuthContext を extensions に入れる
//!
//! - body は署名検証のために一度バッファし、後段 (normalizer) のために戻す
//! - soft failure の scheme は evidence なしで通す。hard failure (SNS) のみ 401

use std::error::Error as _;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::InboundRequest;
use crate::state::AppState;

/// `/msg/*` に verifier chain を掛ける。
///
/// `route_layer` なので、マッチしないパスでは検証しない (404 のまま)。
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, verify_middleware))
}

async fn verify_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();

    // size は RequestBodyLimitLayer 側で制限済み (Content-Length なしの場合はここで超過が分かる)
    let body = to_bytes(body, usize::MAX).await.map_err(|e| {
        if exceeds_body_limit(&e) {
            AppError::PayloadTooLarge
        } else {
            AppError::InvalidInput(format!("failed to read body: {e}"))
        }
    })?;

    let inbound = InboundRequest {
        headers: parts.headers.clone(),
        body: body.clone(),
    };

    let auth = match state.verifiers.authenticate(&inbound).await {
        Ok(auth) => auth,
        Err(err) => {
            tracing::warn!(error = %err, "request verification failed");
            return Err(err.into());
        }
    };

    // middleware → extractor への受け渡し
    let mut req = Request::from_parts(parts, Body::from(body));
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// body 読み込みエラーの source chain に LengthLimitError が含まれるか
fn exceeds_body_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
