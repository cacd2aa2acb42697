//! This module defines the API for a document store.

use crate::err::Error;
use crate::kvs::{Document, Filter};

pub mod requirements {
	//! The store is shared by every in-flight resolver, so on non-WASM
	//! targets it must be `Send + Sync`.

	/// This trait defines WASM requirements for a document store.
	#[cfg(target_family = "wasm")]
	pub trait StoreRequirements {}

	/// Implements the `StoreRequirements` trait for all types.
	#[cfg(target_family = "wasm")]
	impl<T> StoreRequirements for T {}

	/// This trait defines non-WASM requirements for a document store.
	#[cfg(not(target_family = "wasm"))]
	pub trait StoreRequirements: Send + Sync {}

	/// Implements the `StoreRequirements` trait for all types that are
	/// `Send + Sync`.
	#[cfg(not(target_family = "wasm"))]
	impl<T: Send + Sync> StoreRequirements for T {}
}

/// This trait defines the operations the schema compiler needs from a
/// document store.
///
/// Every operation is addressed by a collection name, which the typed
/// helpers on [`super::Store`] derive from the record name. Filters are JSON
/// objects of equality and operator conditions, see [`super::filter`].
#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
pub trait Datastore: requirements::StoreRequirements {
	/// Get the name of the store implementation.
	fn kind(&self) -> &'static str;

	/// Fetch the first document matching the filter.
	///
	/// A filter which matches nothing is not an error, it yields [`None`].
	async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, Error>;

	/// Fetch the documents matching the filter, skipping the first `skip`
	/// matches and returning at most `limit` of the remainder. A limit of zero
	/// is no limit at all, the same as [`None`].
	async fn find_many(
		&self,
		collection: &str,
		filter: &Filter,
		limit: Option<u64>,
		skip: u64,
	) -> Result<Vec<Document>, Error>;

	/// Insert a new document.
	async fn insert_one(&self, collection: &str, document: Document) -> Result<(), Error>;

	/// Set the given members on the first document matching the filter, and
	/// return the updated document.
	///
	/// When nothing matches and `upsert` is set, a new document is created
	/// from the equality conditions of the filter and the given members.
	async fn update_one(
		&self,
		collection: &str,
		filter: &Filter,
		set: Document,
		upsert: bool,
	) -> Result<Option<Document>, Error>;

	/// Delete the first document matching the filter. Returns whether a
	/// document was deleted.
	async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, Error>;

	/// Count the documents matching the filter.
	async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, Error>;
}
