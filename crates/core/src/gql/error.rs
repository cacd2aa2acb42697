use async_graphql::ErrorExtensions;
use thiserror::Error;

use crate::iam;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Database error: {0}")]
	DbError(crate::err::Error),
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Invalid argument: {0}")]
	ArgumentError(String),
	#[error("Validation failed: {0}")]
	ValidationError(String),
	#[error("Action not permitted")]
	NotPermitted,
	#[error("Authentication failed: {0}")]
	AuthError(iam::Error),
	#[error("The request was cancelled")]
	Cancelled,
	#[error("Internal Error: {0}")]
	InternalError(String),
}

impl GqlError {
	/// The code reported in the `extensions.code` member of the error.
	pub fn code(&self) -> &'static str {
		match self {
			GqlError::DbError(crate::err::Error::Cancelled) => "CANCELLED",
			GqlError::DbError(_) => "STORE",
			GqlError::SchemaError(_) => "INTERNAL",
			GqlError::ResolverError(_) => "RESOLVER",
			GqlError::ArgumentError(_) => "BAD_ARGUMENT",
			GqlError::ValidationError(_) => "VALIDATION",
			GqlError::NotPermitted => "FORBIDDEN",
			GqlError::AuthError(_) => "UNAUTHENTICATED",
			GqlError::Cancelled => "CANCELLED",
			GqlError::InternalError(_) => "INTERNAL",
		}
	}
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}

pub fn argument_error(msg: impl Into<String>) -> GqlError {
	GqlError::ArgumentError(msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

impl From<crate::err::Error> for GqlError {
	fn from(value: crate::err::Error) -> Self {
		GqlError::DbError(value)
	}
}

impl From<iam::Error> for GqlError {
	fn from(value: iam::Error) -> Self {
		GqlError::AuthError(value)
	}
}

impl From<String> for GqlError {
	fn from(value: String) -> Self {
		GqlError::ResolverError(value)
	}
}

impl From<&str> for GqlError {
	fn from(value: &str) -> Self {
		GqlError::ResolverError(value.to_owned())
	}
}

impl From<GqlError> for async_graphql::Error {
	fn from(value: GqlError) -> Self {
		let code = value.code();
		async_graphql::Error::new(value.to_string())
			.extend_with(|_, ext| ext.set("code", code.to_owned()))
	}
}
