/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - verifier chain / authorization gate / dispatcher
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - 起動後は読み取り専用 (リクエスト処理中に書き換えない)
 */
use std::sync::Arc;

use crate::services::auth::VerifierChain;
use crate::services::authz::AuthorizationGate;
use crate::services::dispatch::MessageDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub verifiers: Arc<VerifierChain>,
    pub gate: AuthorizationGate,
    pub dispatcher: MessageDispatcher,
}

impl AppState {
    pub fn new(
        verifiers: VerifierChain,
        gate: AuthorizationGate,
        dispatcher: MessageDispatcher,
    ) -> Self {
        Self {
            verifiers: Arc::new(verifiers),
            gate,
            dispatcher,
        }
    }
}
