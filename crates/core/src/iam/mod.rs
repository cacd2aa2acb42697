use http::HeaderMap;
use thiserror::Error;

pub mod auth;

pub use self::auth::*;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	#[error("There was no authentication token in the request")]
	MissingToken,

	#[error("The authentication token is invalid: {0}")]
	InvalidToken(String),

	#[error("The identity provider failed: {0}")]
	Provider(String),
}

impl From<Error> for String {
	fn from(e: Error) -> String {
		e.to_string()
	}
}

/// Resolves the identity of the caller from an incoming request.
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
	/// Inspect the request headers and return the caller's identity
	async fn resolve(&self, headers: &HeaderMap) -> Result<Auth, Error>;
}

/// An identity resolver which returns the same identity for every request.
pub struct Fixed(pub Auth);

#[async_trait::async_trait]
impl IdentityResolver for Fixed {
	async fn resolve(&self, _: &HeaderMap) -> Result<Auth, Error> {
		Ok(self.0.clone())
	}
}

/// An identity resolver which rejects every request.
pub struct Deny;

#[async_trait::async_trait]
impl IdentityResolver for Deny {
	async fn resolve(&self, _: &HeaderMap) -> Result<Auth, Error> {
		Err(Error::MissingToken)
	}
}
