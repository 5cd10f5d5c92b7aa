/*
 * Responsibility
 * - HTTP surface (routes() の re-export など)
 * - /health と /msg/{*path} のみ
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
