pub mod kv;
pub mod sqlite;

pub use kv::{InMemoryStore, KeyValueStore};
pub use sqlite::SqliteStore;
