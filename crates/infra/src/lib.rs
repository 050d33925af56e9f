//! `casebridge-infra`: SQLite persistence for the practice backend.
//!
//! - `db`: connection pool + migration runner
//! - `store`: one repository per table family, handed out by [`Database`]
//! - `kv` / `sessions`: expiring key-value storage, login sessions and OAuth state

pub mod db;
pub mod error;
pub mod kv;
pub mod schema;
pub mod sessions;
pub mod store;

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use kv::{InMemoryKvStore, KvStore, SqliteKvStore};
pub use sessions::{OAuthStates, SessionManager};
pub use store::ConversationScope;
