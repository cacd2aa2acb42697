use thiserror::Error;

/// An error originating from the document store or from value decoding.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// There was a problem with the underlying datastore
	#[error("There was a problem with the underlying datastore: {0}")]
	Ds(String),

	/// The filter could not be applied
	#[error("The filter is not valid: {0}")]
	InvalidFilter(String),

	/// The document is not a JSON object
	#[error("Expected a document object but found {0}")]
	InvalidDocument(String),

	/// A document could not be encoded or decoded
	#[error("Unable to encode or decode a document: {0}")]
	Serde(#[from] serde_json::Error),

	/// The value could not be parsed as a decimal
	#[error("Invalid decimal value '{0}'")]
	InvalidDecimal(String),

	/// The operation was cancelled before it completed
	#[error("The operation was cancelled")]
	Cancelled,
}
