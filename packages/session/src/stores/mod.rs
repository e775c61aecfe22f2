//! Key-value backends for the session store.
//!
//! - `MemoryKeyValueStore` - process-local, lost on exit (tests, previews)
//! - `SqliteKeyValueStore` - SQLite file, survives restarts

pub mod memory;
pub mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;
