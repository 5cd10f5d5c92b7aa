/*
 * Responsibility
 * - GET /health (疎通用)
 * - body はバージョン付きの固定文字列
 */
pub async fn health() -> String {
    format!("OK:{}", env!("CARGO_PKG_VERSION"))
}
