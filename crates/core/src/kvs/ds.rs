use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::err::Error;
use crate::gql::Record;
use crate::kvs::api::Datastore;
use crate::kvs::{Document, Filter};
use crate::names;

/// A shared handle to a document store, with typed helpers which derive the
/// collection from the record being stored.
#[derive(Clone)]
pub struct Store {
	inner: Arc<dyn Datastore>,
}

impl fmt::Debug for Store {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Store").field("kind", &self.inner.kind()).finish()
	}
}

impl Deref for Store {
	type Target = dyn Datastore;
	fn deref(&self) -> &Self::Target {
		self.inner.as_ref()
	}
}

impl<D: Datastore + 'static> From<D> for Store {
	fn from(ds: D) -> Self {
		Self::new(ds)
	}
}

/// The collection name records of this type are stored in.
pub fn collection<T: Record>() -> String {
	names::collection_name(T::NAME)
}

/// Serializes a record into a document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, Error> {
	match serde_json::to_value(value)? {
		Value::Object(doc) => Ok(doc),
		other => Err(Error::InvalidDocument(other.to_string())),
	}
}

fn decode<T: Record>(doc: Document) -> Result<T, Error> {
	Ok(serde_json::from_value(Value::Object(doc))?)
}

impl Store {
	pub fn new(ds: impl Datastore + 'static) -> Self {
		Self {
			inner: Arc::new(ds),
		}
	}

	pub fn from_arc(inner: Arc<dyn Datastore>) -> Self {
		Self {
			inner,
		}
	}

	/// Fetch the first record matching the filter.
	pub async fn find<T: Record>(&self, filter: &Filter) -> Result<Option<T>, Error> {
		match self.inner.find_one(&collection::<T>(), filter).await? {
			Some(doc) => decode(doc).map(Some),
			None => Ok(None),
		}
	}

	/// Fetch a page of records matching the filter.
	pub async fn find_many<T: Record>(
		&self,
		filter: &Filter,
		limit: Option<u64>,
		skip: u64,
	) -> Result<Vec<T>, Error> {
		let docs = self.inner.find_many(&collection::<T>(), filter, limit, skip).await?;
		docs.into_iter().map(decode).collect()
	}

	pub async fn count<T: Record>(&self, filter: &Filter) -> Result<u64, Error> {
		self.inner.count(&collection::<T>(), filter).await
	}

	/// Insert a new record.
	pub async fn save<T: Record>(&self, record: &T) -> Result<(), Error> {
		self.inner.insert_one(&collection::<T>(), to_document(record)?).await
	}

	/// Upsert the first record matching the filter and return its new state.
	///
	/// Members which serialize to `null` are left untouched, so a partially
	/// filled record only updates the members it carries.
	pub async fn update<T: Record>(&self, filter: &Filter, record: &T) -> Result<T, Error> {
		let mut set = to_document(record)?;
		set.retain(|_, v| !v.is_null());
		match self.inner.update_one(&collection::<T>(), filter, set, true).await? {
			Some(doc) => decode(doc),
			None => Err(Error::Ds(format!("upsert into {} returned no document", collection::<T>()))),
		}
	}

	/// Delete the first record matching the filter.
	pub async fn delete<T: Record>(&self, filter: &Filter) -> Result<bool, Error> {
		self.inner.delete_one(&collection::<T>(), filter).await
	}
}
