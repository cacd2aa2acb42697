//! The validation pass run over assembled argument records.
//!
//! Rules are checked against the serialized form of the record, before it
//! is deserialized, so a failure never reaches the wrapped callable.

use regex::Regex;
use serde_json::Value as Json;

use super::describe::Rule;
use super::error::{GqlError, schema_error};
use super::types::{Shape, WireField};

/// A validation rule, ready to be checked.
#[derive(Clone, Debug)]
pub(crate) enum Constraint {
	Required,
	OneOf(&'static [&'static str]),
	MinLen(usize),
	MaxLen(usize),
	Min(f64),
	Max(f64),
	Pattern(Regex),
}

/// Prepares the declared rules of a field. Patterns are compiled here so an
/// invalid expression fails schema compilation.
pub(crate) fn compile(wire: &str, rules: &[Rule]) -> Result<Vec<Constraint>, GqlError> {
	rules
		.iter()
		.map(|rule| {
			Ok(match rule {
				Rule::Required => Constraint::Required,
				Rule::OneOf(v) => Constraint::OneOf(v),
				Rule::MinLen(n) => Constraint::MinLen(*n),
				Rule::MaxLen(n) => Constraint::MaxLen(*n),
				Rule::Min(n) => Constraint::Min(*n),
				Rule::Max(n) => Constraint::Max(*n),
				Rule::Pattern(re) => Constraint::Pattern(Regex::new(re).map_err(|e| {
					schema_error(format!("Invalid pattern on field `{wire}`: {e}"))
				})?),
			})
		})
		.collect()
}

fn is_empty(value: Option<&Json>) -> bool {
	match value {
		None | Some(Json::Null) => true,
		Some(Json::String(s)) => s.is_empty(),
		Some(Json::Array(a)) => a.is_empty(),
		Some(_) => false,
	}
}

fn length(value: &Json) -> Option<usize> {
	match value {
		Json::String(s) => Some(s.chars().count()),
		Json::Array(a) => Some(a.len()),
		_ => None,
	}
}

fn number(value: &Json) -> Option<f64> {
	match value {
		Json::Number(n) => n.as_f64(),
		// Decimals are carried as strings
		Json::String(s) => s.parse::<crate::val::Decimal>().ok().map(|d| d.to_f64()),
		_ => None,
	}
}

fn violation(wire: &str, msg: impl std::fmt::Display) -> GqlError {
	GqlError::ValidationError(format!("{wire}: {msg}"))
}

fn check_field(field: &WireField, value: Option<&Json>) -> Result<(), GqlError> {
	for c in field.rules.iter() {
		if let Constraint::Required = c {
			if is_empty(value) {
				return Err(violation(&field.wire, "is required"));
			}
			continue;
		}
		let Some(value) = value.filter(|v| !v.is_null()) else {
			continue;
		};
		match c {
			Constraint::Required => {}
			Constraint::OneOf(options) => {
				let ok = match value {
					Json::String(s) => options.iter().any(|o| o == s),
					Json::Array(items) => items
						.iter()
						.all(|v| v.as_str().is_some_and(|s| options.iter().any(|o| *o == s))),
					_ => false,
				};
				if !ok {
					return Err(violation(
						&field.wire,
						format_args!("must be one of {}", options.join(", ")),
					));
				}
			}
			Constraint::MinLen(n) => {
				if length(value).is_some_and(|l| l < *n) {
					return Err(violation(&field.wire, format_args!("must be at least {n} long")));
				}
			}
			Constraint::MaxLen(n) => {
				if length(value).is_some_and(|l| l > *n) {
					return Err(violation(&field.wire, format_args!("must be at most {n} long")));
				}
			}
			Constraint::Min(n) => {
				if number(value).is_some_and(|v| v < *n) {
					return Err(violation(&field.wire, format_args!("must be at least {n}")));
				}
			}
			Constraint::Max(n) => {
				if number(value).is_some_and(|v| v > *n) {
					return Err(violation(&field.wire, format_args!("must be at most {n}")));
				}
			}
			Constraint::Pattern(re) => {
				let ok = match value {
					Json::String(s) => re.is_match(s),
					_ => false,
				};
				if !ok {
					return Err(violation(
						&field.wire,
						format_args!("does not match the pattern {}", re.as_str()),
					));
				}
			}
		}
	}
	// Descend into nested records
	match (value, &field.shape) {
		(Some(v), shape) => nested(v, shape),
		(None, _) => Ok(()),
	}
}

fn nested(value: &Json, shape: &Shape) -> Result<(), GqlError> {
	match (value, shape) {
		(Json::Object(_), Shape::Object(ty)) => check(value, ty.fields()),
		(Json::Array(items), Shape::List(inner)) => {
			items.iter().try_for_each(|item| nested(item, inner))
		}
		_ => Ok(()),
	}
}

/// Checks the serialized form of an assembled record against the rules of
/// its fields, stopping at the first violation.
pub(crate) fn check(value: &Json, fields: &[WireField]) -> Result<(), GqlError> {
	let object = value.as_object();
	for field in fields {
		check_field(field, object.and_then(|o| o.get(field.ident)))?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn invalid_patterns_fail_compilation() {
		assert!(compile("email", &[Rule::Pattern("[a-")]).is_err());
		assert_eq!(compile("email", &[Rule::Pattern("^.+@.+$"), Rule::Required]).unwrap().len(), 2);
	}

	#[test]
	fn emptiness() {
		assert!(is_empty(None));
		assert!(is_empty(Some(&json!(null))));
		assert!(is_empty(Some(&json!(""))));
		assert!(is_empty(Some(&json!([]))));
		assert!(!is_empty(Some(&json!(0))));
		assert!(!is_empty(Some(&json!(false))));
	}

	#[test]
	fn numbers_read_decimal_strings() {
		assert_eq!(number(&json!("1.5")), Some(1.5));
		assert_eq!(number(&json!(3)), Some(3.0));
		assert_eq!(number(&json!(true)), None);
	}
}
