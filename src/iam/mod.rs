//! Resolves the identity of the caller of every request.

mod jwt;

use std::sync::Arc;

use neodeliver_core::iam::{Auth, Fixed, IdentityResolver};

pub use self::jwt::JwtResolver;

/// The scheme expected in the `Authorization` header
pub const BEARER: &str = "Bearer";

/// The identity every request acts as when no secret is configured.
pub fn development() -> Auth {
	let mut auth = Auth::new(
		"oauth0|token",
		"auth0|655c75b291c2f4235db683fa",
		"56cde8c6-5af5-11ee-8c99-0242ac120002",
	)
	.with_scope("users:read");
	auth.token = std::env::var("AUTH0_ACCESS_TOKEN").ok();
	auth
}

/// Selects the identity resolver of the server.
pub fn resolver(secret: Option<&str>) -> Arc<dyn IdentityResolver> {
	match secret {
		Some(secret) => Arc::new(JwtResolver::new(secret)),
		None => {
			warn!("No token secret is configured, every request acts as the development identity");
			Arc::new(Fixed(development()))
		}
	}
}
