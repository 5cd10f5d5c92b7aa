/*
 * Responsibility
 * - リクエスト単位で生成・破棄されるドメイン型
 * - policy engine との入出力 (JSON 契約) の型定義
 */
pub mod auth;
pub mod message;
pub mod query;
pub mod schema;

pub use auth::{AuthContext, AwsSnsAuth, Claims, Evidence, GitHubAppAuth};
pub use message::{Message, MessageField};
pub use query::{AuthQueryInput, AuthQueryOutput, MessageQueryInput, MessageQueryOutput};
pub use schema::Schema;
