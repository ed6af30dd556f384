//! Core Quill document storage contract.
//!
//! Quill stores wiki pages as [`Document`]s in a Name-addressable store with
//! immutable versions. This crate defines the pieces every backend shares:
//!
//! - [`name`]: validation and segment conversion for document Names
//! - [`Document`]: one immutable version of one page
//! - [`Error`]: the closed error taxonomy all backends must produce
//! - [`DocumentStore`]: the contract backends implement
//! - [`register_store`] / [`new_store`]: URI scheme to backend constructor mapping
//! - [`MemoryDocumentStore`]: the in-memory reference backend
//!
//! Backend crates (`quill-file-store`, `quill-sqlite-store`) implement
//! [`DocumentStore`] and register themselves under a URI scheme so that
//! callers can obtain a store from a connection URI:
//!
//! ```rust
//! use quill_store::{new_store, MemoryDocumentStore};
//!
//! MemoryDocumentStore::register();
//! let store = new_store("memory:").unwrap();
//! store.update("/Front Page", "welcome!").unwrap();
//! assert_eq!(store.get("/Front Page").unwrap().content, "welcome!");
//! ```

mod document;
mod error;
mod memory;
pub mod name;
mod registry;
pub mod stamp;
mod store;

pub use document::{Document, MAX_CONTENT_SIZE};
pub use error::Error;
pub use memory::MemoryDocumentStore;
pub use registry::{new_store, register_store, StoreFactory};
pub use store::DocumentStore;
