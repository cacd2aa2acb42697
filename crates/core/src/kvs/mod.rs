//! The module defining the document store collaborator.
//!
//! The schema compiler needs six operations from a store, defined by the
//! [`Datastore`] trait: find one, find many with limit and skip, insert one,
//! update one with upsert, delete one and count. Records address their
//! collection through the typed helpers on [`Store`].
//!
//! The following engine is bundled:
//! - `mem`: an in-memory store keeping documents in insertion order

mod api;
mod ds;
pub mod filter;
mod mem;

pub use api::Datastore;
pub use ds::{Store, collection, to_document};
pub use mem::MemStore;

/// A stored document. An alias for a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A document filter. An alias for a JSON object, see [`filter`].
pub type Filter = serde_json::Map<String, serde_json::Value>;
