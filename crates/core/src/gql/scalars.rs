use async_graphql::Value as GqlValue;
use async_graphql::dynamic::Scalar;

use crate::val::Decimal;

pub const DECIMAL: &str = "Decimal";
pub const DATETIME: &str = "DateTime";
pub const JSON: &str = "JSON";

/// Decimals travel as strings so no precision is lost to floating point.
pub fn decimal() -> Scalar {
	Scalar::new(DECIMAL)
		.description("Big decimal type.")
		.validator(|v| matches!(v, GqlValue::String(s) if s.is_empty() || s.parse::<Decimal>().is_ok()))
}

pub fn datetime() -> Scalar {
	Scalar::new(DATETIME)
		.description("An ISO 8601 encoded date and time.")
		.validator(|v| {
			matches!(v, GqlValue::String(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok())
		})
}

pub fn json() -> Scalar {
	Scalar::new(JSON).description("An opaque JSON value.")
}

/// Every custom scalar the compiled types may refer to.
pub fn all() -> [Scalar; 3] {
	[decimal(), datetime(), json()]
}
