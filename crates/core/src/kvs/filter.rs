//! Evaluation of document filters.
//!
//! A filter is a JSON object. Each member names a document path, which may
//! be dotted to reach into nested objects, and a condition. A plain value is
//! an equality condition, which also matches arrays containing the value. An
//! object whose keys all start with `$` is a set of operator conditions.
//! `$and` and `$or` at the top level combine nested filters.

use serde_json::{Map, Value};

use crate::err::Error;
use crate::kvs::{Document, Filter};

/// Resolves a dotted path inside a document.
pub(crate) fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
	let mut parts = path.split('.');
	let mut current = doc.get(parts.next()?)?;
	for part in parts {
		current = match current {
			Value::Object(o) => o.get(part)?,
			Value::Array(a) => a.get(part.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}
	Some(current)
}

/// Sets a value at a dotted path, creating intermediate objects.
pub(crate) fn assign(doc: &mut Document, path: &str, value: Value) {
	match path.split_once('.') {
		None => {
			doc.insert(path.to_owned(), value);
		}
		Some((head, rest)) => {
			let entry = doc.entry(head.to_owned()).or_insert_with(|| Value::Object(Map::new()));
			if !entry.is_object() {
				*entry = Value::Object(Map::new());
			}
			if let Value::Object(inner) = entry {
				assign(inner, rest, value);
			}
		}
	}
}

fn is_operator_set(cond: &Value) -> bool {
	match cond {
		Value::Object(o) => !o.is_empty() && o.keys().all(|k| k.starts_with('$')),
		_ => false,
	}
}

fn equals(found: Option<&Value>, expected: &Value) -> bool {
	match found {
		None => expected.is_null(),
		Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
		Some(v) => v == expected,
	}
}

fn operator(found: Option<&Value>, op: &str, arg: &Value) -> Result<bool, Error> {
	match op {
		"$eq" => Ok(equals(found, arg)),
		"$ne" => Ok(!equals(found, arg)),
		"$in" | "$nin" => {
			let Value::Array(options) = arg else {
				return Err(Error::InvalidFilter(format!("{op} expects an array")));
			};
			let hit = options.iter().any(|o| equals(found, o));
			Ok(hit == (op == "$in"))
		}
		"$exists" => match arg {
			Value::Bool(b) => Ok(found.is_some() == *b),
			_ => Err(Error::InvalidFilter("$exists expects a boolean".to_owned())),
		},
		_ => Err(Error::InvalidFilter(format!("unsupported operator {op}"))),
	}
}

fn combine(doc: &Document, op: &str, arg: &Value) -> Result<bool, Error> {
	let Value::Array(filters) = arg else {
		return Err(Error::InvalidFilter(format!("{op} expects an array of filters")));
	};
	let mut results = filters.iter().map(|f| match f {
		Value::Object(f) => matches(doc, f),
		_ => Err(Error::InvalidFilter(format!("{op} expects an array of filters"))),
	});
	match op {
		"$and" => results.try_fold(true, |acc, r| r.map(|r| acc && r)),
		_ => results.try_fold(false, |acc, r| r.map(|r| acc || r)),
	}
}

/// Checks whether a document satisfies every condition of the filter. An
/// empty filter matches everything.
pub fn matches(doc: &Document, filter: &Filter) -> Result<bool, Error> {
	for (path, cond) in filter {
		let ok = match path.as_str() {
			"$and" | "$or" => combine(doc, path, cond)?,
			p if p.starts_with('$') => {
				return Err(Error::InvalidFilter(format!("unsupported operator {p}")));
			}
			_ => {
				let found = lookup(doc, path);
				match cond {
					Value::Object(ops) if is_operator_set(cond) => {
						let mut ok = true;
						for (op, arg) in ops {
							ok &= operator(found, op, arg)?;
						}
						ok
					}
					_ => equals(found, cond),
				}
			}
		};
		if !ok {
			return Ok(false);
		}
	}
	Ok(true)
}

/// The members of a filter which an upserted document should start from:
/// every plain equality condition outside of `$and` and `$or`.
pub(crate) fn seed(filter: &Filter) -> Document {
	let mut doc = Document::new();
	for (path, cond) in filter {
		if path.starts_with('$') {
			continue;
		}
		match cond {
			Value::Object(ops) if is_operator_set(cond) => {
				if let Some(v) = ops.get("$eq") {
					assign(&mut doc, path, v.clone());
				}
			}
			_ => assign(&mut doc, path, cond.clone()),
		}
	}
	doc
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn doc(v: Value) -> Document {
		match v {
			Value::Object(o) => o,
			_ => unreachable!(),
		}
	}

	#[test]
	fn equality_and_paths() {
		let d = doc(json!({"name": "a", "meta": {"org": "x"}, "tags": ["vip", "new"]}));
		assert!(matches(&d, &doc(json!({}))).unwrap());
		assert!(matches(&d, &doc(json!({"name": "a"}))).unwrap());
		assert!(!matches(&d, &doc(json!({"name": "b"}))).unwrap());
		assert!(matches(&d, &doc(json!({"meta.org": "x"}))).unwrap());
		assert!(matches(&d, &doc(json!({"tags": "vip"}))).unwrap());
		assert!(matches(&d, &doc(json!({"missing": null}))).unwrap());
		assert!(matches(&d, &doc(json!({"meta": {"org": "x"}}))).unwrap());
	}

	#[test]
	fn operators() {
		let d = doc(json!({"name": "a", "count": 3}));
		assert!(matches(&d, &doc(json!({"name": {"$ne": "b"}}))).unwrap());
		assert!(matches(&d, &doc(json!({"count": {"$in": [1, 3]}}))).unwrap());
		assert!(matches(&d, &doc(json!({"count": {"$nin": [1, 2]}}))).unwrap());
		assert!(matches(&d, &doc(json!({"name": {"$exists": true}}))).unwrap());
		assert!(matches(&d, &doc(json!({"other": {"$exists": false}}))).unwrap());
		assert!(matches(&d, &doc(json!({"$or": [{"name": "z"}, {"count": 3}]}))).unwrap());
		assert!(!matches(&d, &doc(json!({"$and": [{"name": "a"}, {"count": 4}]}))).unwrap());
		assert!(matches(&d, &doc(json!({"name": {"$regex": "a"}}))).is_err());
		assert!(matches(&d, &doc(json!({"count": {"$in": 3}}))).is_err());
	}

	#[test]
	fn seeds_upserts_from_equalities() {
		let f = doc(json!({"organization_id": "org", "meta.kind": {"$eq": "x"}, "n": {"$ne": 1}}));
		assert_eq!(Value::Object(seed(&f)), json!({"organization_id": "org", "meta": {"kind": "x"}}));
	}
}
