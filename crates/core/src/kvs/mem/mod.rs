use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::err::Error;
use crate::kvs::api::Datastore;
use crate::kvs::filter::{self, assign, matches};
use crate::kvs::{Document, Filter};

/// The member holding a document's identifier.
const ID: &str = "_id";

/// An in-memory document store.
///
/// Collections keep their documents in insertion order, which is also the
/// order in which queries return them.
#[derive(Default)]
pub struct MemStore {
	collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemStore {
	/// Create a new, empty, in-memory store
	pub fn new() -> Self {
		Self::default()
	}
}

fn position(docs: &[Document], filter: &Filter) -> Result<Option<usize>, Error> {
	for (i, doc) in docs.iter().enumerate() {
		if matches(doc, filter)? {
			return Ok(Some(i));
		}
	}
	Ok(None)
}

#[async_trait::async_trait]
impl Datastore for MemStore {
	fn kind(&self) -> &'static str {
		"memory"
	}

	async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, Error> {
		let lock = self.collections.read().await;
		let Some(docs) = lock.get(collection) else {
			return Ok(None);
		};
		Ok(position(docs, filter)?.map(|i| docs[i].clone()))
	}

	async fn find_many(
		&self,
		collection: &str,
		filter: &Filter,
		limit: Option<u64>,
		skip: u64,
	) -> Result<Vec<Document>, Error> {
		let lock = self.collections.read().await;
		let Some(docs) = lock.get(collection) else {
			return Ok(Vec::new());
		};
		let limit = limit.filter(|l| *l > 0);
		let mut out = Vec::new();
		let mut skipped = 0;
		for doc in docs {
			if limit.is_some_and(|l| out.len() as u64 >= l) {
				break;
			}
			if !matches(doc, filter)? {
				continue;
			}
			if skipped < skip {
				skipped += 1;
				continue;
			}
			out.push(doc.clone());
		}
		Ok(out)
	}

	async fn insert_one(&self, collection: &str, mut document: Document) -> Result<(), Error> {
		if !document.contains_key(ID) {
			document.insert(ID.to_owned(), Value::String(uuid::Uuid::new_v4().to_string()));
		}
		trace!("Inserting document into {collection}");
		self.collections.write().await.entry(collection.to_owned()).or_default().push(document);
		Ok(())
	}

	async fn update_one(
		&self,
		collection: &str,
		filter: &Filter,
		set: Document,
		upsert: bool,
	) -> Result<Option<Document>, Error> {
		let mut lock = self.collections.write().await;
		let docs = lock.entry(collection.to_owned()).or_default();
		let doc = match position(docs, filter)? {
			Some(i) => &mut docs[i],
			None if upsert => {
				let mut doc = filter::seed(filter);
				if !doc.contains_key(ID) {
					doc.insert(ID.to_owned(), Value::String(uuid::Uuid::new_v4().to_string()));
				}
				trace!("Upserting document into {collection}");
				docs.push(doc);
				let last = docs.len() - 1;
				&mut docs[last]
			}
			None => return Ok(None),
		};
		for (path, value) in set {
			assign(doc, &path, value);
		}
		Ok(Some(doc.clone()))
	}

	async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<bool, Error> {
		let mut lock = self.collections.write().await;
		let Some(docs) = lock.get_mut(collection) else {
			return Ok(false);
		};
		match position(docs, filter)? {
			Some(i) => {
				docs.remove(i);
				Ok(true)
			}
			None => Ok(false),
		}
	}

	async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, Error> {
		let lock = self.collections.read().await;
		let Some(docs) = lock.get(collection) else {
			return Ok(0);
		};
		let mut n = 0;
		for doc in docs {
			if matches(doc, filter)? {
				n += 1;
			}
		}
		Ok(n)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use test_log::test;

	use super::*;

	fn doc(v: Value) -> Document {
		match v {
			Value::Object(o) => o,
			_ => unreachable!(),
		}
	}

	#[test(tokio::test)]
	async fn find_many_applies_filter_then_skip_then_limit() {
		let ds = MemStore::new();
		for i in 1..=6 {
			let kind = if i == 4 {
				"other"
			} else {
				"tag"
			};
			ds.insert_one("tags", doc(json!({"n": i, "kind": kind}))).await.unwrap();
		}
		let filter = doc(json!({"kind": "tag"}));
		let res = ds.find_many("tags", &filter, Some(2), 1).await.unwrap();
		let ns: Vec<_> = res.iter().map(|d| d["n"].clone()).collect();
		assert_eq!(ns, vec![json!(2), json!(3)]);
		let res = ds.find_many("tags", &filter, Some(10), 2).await.unwrap();
		let ns: Vec<_> = res.iter().map(|d| d["n"].clone()).collect();
		assert_eq!(ns, vec![json!(3), json!(5), json!(6)]);
		assert_eq!(ds.count("tags", &filter).await.unwrap(), 5);
		assert!(ds.find_many("missing", &filter, None, 0).await.unwrap().is_empty());
	}

	#[test(tokio::test)]
	async fn zero_limit_is_unbounded() {
		let ds = MemStore::new();
		for i in 1..=4 {
			ds.insert_one("tags", doc(json!({"n": i}))).await.unwrap();
		}
		let all = Document::new();
		assert_eq!(ds.find_many("tags", &all, Some(0), 0).await.unwrap().len(), 4);
		assert_eq!(ds.find_many("tags", &all, Some(0), 3).await.unwrap().len(), 1);
	}

	#[test(tokio::test)]
	async fn insert_assigns_identifiers() {
		let ds = MemStore::new();
		ds.insert_one("tags", doc(json!({"name": "a"}))).await.unwrap();
		ds.insert_one("tags", doc(json!({"_id": "fixed", "name": "b"}))).await.unwrap();
		let a = ds.find_one("tags", &doc(json!({"name": "a"}))).await.unwrap().unwrap();
		assert!(a["_id"].is_string());
		let b = ds.find_one("tags", &doc(json!({"_id": "fixed"}))).await.unwrap().unwrap();
		assert_eq!(b["name"], json!("b"));
	}

	#[test(tokio::test)]
	async fn update_and_upsert() {
		let ds = MemStore::new();
		let filter = doc(json!({"organization_id": "org"}));
		assert!(ds.update_one("settings", &filter, doc(json!({"a": 1})), false).await.unwrap().is_none());
		let created = ds
			.update_one("settings", &filter, doc(json!({"a": 1})), true)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(created["organization_id"], json!("org"));
		assert_eq!(created["a"], json!(1));
		let updated = ds
			.update_one("settings", &filter, doc(json!({"a": 2, "nested.b": true})), true)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(updated["a"], json!(2));
		assert_eq!(updated["nested"], json!({"b": true}));
		assert_eq!(ds.count("settings", &Filter::new()).await.unwrap(), 1);
	}

	#[test(tokio::test)]
	async fn delete_removes_first_match() {
		let ds = MemStore::new();
		ds.insert_one("tags", doc(json!({"name": "a"}))).await.unwrap();
		ds.insert_one("tags", doc(json!({"name": "a"}))).await.unwrap();
		assert!(ds.delete_one("tags", &doc(json!({"name": "a"}))).await.unwrap());
		assert_eq!(ds.count("tags", &Filter::new()).await.unwrap(), 1);
		assert!(!ds.delete_one("tags", &doc(json!({"name": "b"}))).await.unwrap());
		assert!(!ds.delete_one("other", &Filter::new()).await.unwrap());
	}

	#[test(tokio::test)]
	async fn invalid_filters_are_errors() {
		let ds = MemStore::new();
		ds.insert_one("tags", doc(json!({"name": "a"}))).await.unwrap();
		let res = ds.find_one("tags", &doc(json!({"name": {"$where": "x"}}))).await;
		assert!(matches!(res, Err(Error::InvalidFilter(_))));
	}
}
