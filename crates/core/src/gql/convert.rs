//! Conversions between serialized records and wire values.
//!
//! Output values are serialized with serde and then walked with the compiled
//! [`Shape`], which renames members to their wire names and reports missing
//! members as explicit nulls. Arguments take the inverse walk.

use async_graphql::dynamic::FieldValue;
use async_graphql::indexmap::IndexMap;
use async_graphql::{Name, Value as GqlValue};
use serde_json::Value as Json;

use super::error::{GqlError, argument_error};
use super::types::Shape;

/// Converts a serialized value into the wire value of its compiled shape.
pub fn to_wire(value: Json, shape: &Shape) -> Result<GqlValue, GqlError> {
	match (value, shape) {
		(_, Shape::Unit) => Ok(GqlValue::Boolean(true)),
		(Json::Null, _) => Ok(GqlValue::Null),
		(Json::Array(items), Shape::List(inner)) => Ok(GqlValue::List(
			items.into_iter().map(|v| to_wire(v, inner)).collect::<Result<_, _>>()?,
		)),
		(Json::Object(mut members), Shape::Object(ty)) => {
			let mut out = IndexMap::with_capacity(ty.fields().len());
			for f in ty.fields() {
				let v = match members.remove(f.ident) {
					Some(v) => to_wire(v, &f.shape)?,
					None => GqlValue::Null,
				};
				out.insert(Name::new(&f.wire), v);
			}
			Ok(GqlValue::Object(out))
		}
		(value, Shape::Object(ty)) => Err(GqlError::InternalError(format!(
			"Expected an object for `{}`, found {value}",
			ty.name()
		))),
		(value, _) => GqlValue::from_json(value).map_err(|e| GqlError::InternalError(e.to_string())),
	}
}

/// Wraps a wire value for the GraphQL engine. Lists of records are split
/// into their elements so every element resolves its own fields.
pub fn field_value(value: GqlValue, shape: &Shape) -> Option<FieldValue<'static>> {
	match (value, shape) {
		(GqlValue::Null, _) => None,
		(GqlValue::List(items), Shape::List(inner)) => Some(FieldValue::list(
			items.into_iter().map(|v| field_value(v, inner).unwrap_or(FieldValue::NULL)),
		)),
		(value, _) => Some(FieldValue::value(value)),
	}
}

/// Converts a wire argument into the serialized form of its compiled shape.
pub fn from_wire(value: &GqlValue, shape: &Shape) -> Result<Json, GqlError> {
	match (value, shape) {
		(GqlValue::Null, _) => Ok(Json::Null),
		(GqlValue::List(items), Shape::List(inner)) => {
			items.iter().map(|v| from_wire(v, inner)).collect::<Result<Vec<_>, _>>().map(Json::Array)
		}
		// A single value is accepted where a list is expected
		(value, Shape::List(inner)) => Ok(Json::Array(vec![from_wire(value, inner)?])),
		(GqlValue::Object(members), Shape::Object(ty)) => {
			let mut out = serde_json::Map::new();
			for f in ty.fields() {
				if let Some(v) = members.get(f.wire.as_str()) {
					out.insert(f.ident.to_owned(), from_wire(v, &f.shape)?);
				}
			}
			Ok(Json::Object(out))
		}
		(value, _) => value.clone().into_json().map_err(|e| argument_error(e.to_string())),
	}
}
