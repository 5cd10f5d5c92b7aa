/*
 * Responsibility
 * - handler が受け取る extractor の公開
 *   - VerifiedAuth: middleware が入れた AuthContext
 *   - NormalizedBody: Content-Type に従って decode 済みの body
 */
mod auth_ctx;
mod body;

pub use auth_ctx::VerifiedAuth;
pub use body::NormalizedBody;
