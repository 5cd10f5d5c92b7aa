/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - http: 全ルート共通の transport 系 layer
 * - auth: /msg 配下の verifier chain
 */
pub mod auth;
pub mod http;
