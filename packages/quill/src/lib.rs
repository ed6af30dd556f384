//! Umbrella crate for Quill document storage.
//!
//! Re-exports the core contract from `quill-store` together with every
//! built-in backend, and provides [`register_builtin_stores`] to wire all
//! of their URI schemes up at once:
//!
//! ```rust
//! quill::register_builtin_stores();
//!
//! let store = quill::new_store("memory:").unwrap();
//! store.update("/Front Page", "welcome!").unwrap();
//! assert_eq!(store.get("/Front Page").unwrap().content, "welcome!");
//! ```
//!
//! Registered schemes:
//!
//! | scheme   | backend                 | example URI               |
//! |----------|-------------------------|---------------------------|
//! | `memory` | [`MemoryDocumentStore`] | `memory:`                 |
//! | `file`   | [`FileDocumentStore`]   | `file:///var/wiki`        |
//! | `sqlite` | [`SqliteDocumentStore`] | `sqlite:///var/wiki.db`   |

pub use quill_store::{
    name, new_store, register_store, stamp, Document, DocumentStore, Error, MemoryDocumentStore,
    StoreFactory, MAX_CONTENT_SIZE,
};

pub use quill_file_store::FileDocumentStore;
pub use quill_sqlite_store::SqliteDocumentStore;

/// Registers every built-in backend's URI scheme. Safe to call more than
/// once.
pub fn register_builtin_stores() {
    MemoryDocumentStore::register();
    quill_file_store::register();
    quill_sqlite_store::register();
}
