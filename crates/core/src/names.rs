//! Identifier normalization between record declarations, GraphQL wire names
//! and document-store collection names.

use inflector::Inflector;

/// Converts a capitalized identifier into its lowercase, underscore
/// separated wire form.
///
/// `ContactSettings` becomes `contact_settings`, `UserID` becomes `user_id`
/// and identifiers which are already snake cased pass through unchanged.
pub fn to_snake_case(name: &str) -> String {
	name.to_snake_case()
}

/// Pluralizes the last word of a snake cased identifier.
pub fn pluralize(name: &str) -> String {
	if name.is_empty() {
		return String::new();
	}
	name.to_plural()
}

/// The document-store collection, and list query, name for a record.
pub fn collection_name(record: &str) -> String {
	pluralize(&to_snake_case(record))
}
