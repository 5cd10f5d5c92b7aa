/*
 * Responsibility
 * - ドメインロジック (HTTP から独立)
 *   - auth: verifier chain / AuthContext 集約
 *   - authz: 認可 query
 *   - dispatch: message query → chat 送信
 *   - policy / chat: 外部依存の trait と実装
 *   - telemetry: Sentry
 */
pub mod auth;
pub mod authz;
pub mod chat;
pub mod dispatch;
pub mod policy;
pub mod telemetry;
