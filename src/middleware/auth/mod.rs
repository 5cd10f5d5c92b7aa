/*
 * Responsibility
 * - 認証系 middleware の束ね
 * - verify: verifier chain を実行し AuthContext を extensions に入れる
 */
pub mod verify;
