use async_trait::async_trait;
use http::HeaderMap;
use http::header::AUTHORIZATION;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use neodeliver_core::iam::{Auth, Error, IdentityResolver};
use serde::{Deserialize, Serialize};

use super::BEARER;

/// The claims of an identity token.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Claims {
	pub sub: String,
	#[serde(default)]
	pub user_id: String,
	#[serde(default)]
	pub org_id: String,
	/// Space separated permission scopes
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nbf: Option<i64>,
}

impl Claims {
	pub fn new(sub: &str, user_id: &str, org_id: &str) -> Self {
		Self {
			sub: sub.to_owned(),
			user_id: user_id.to_owned(),
			org_id: org_id.to_owned(),
			..Default::default()
		}
	}
}

impl From<Claims> for Auth {
	fn from(claims: Claims) -> Auth {
		let mut auth = Auth::new(claims.sub, claims.user_id, claims.org_id);
		for scope in claims.scope.iter().flat_map(|s| s.split_whitespace()) {
			auth = auth.with_scope(scope);
		}
		auth
	}
}

/// Resolves identities from HS256 signed bearer tokens.
pub struct JwtResolver {
	key: DecodingKey,
	validation: Validation,
}

impl JwtResolver {
	pub fn new(secret: &str) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.validate_nbf = true;
		Self {
			key: DecodingKey::from_secret(secret.as_bytes()),
			validation,
		}
	}
}

fn bearer(headers: &HeaderMap) -> Result<&str, Error> {
	let header = headers.get(AUTHORIZATION).ok_or(Error::MissingToken)?;
	let header = header.to_str().map_err(|e| Error::InvalidToken(e.to_string()))?;
	match header.split_once(' ') {
		Some((scheme, token)) if scheme.eq_ignore_ascii_case(BEARER) => Ok(token.trim()),
		_ => Err(Error::MissingToken),
	}
}

#[async_trait]
impl IdentityResolver for JwtResolver {
	async fn resolve(&self, headers: &HeaderMap) -> Result<Auth, Error> {
		// Log the authentication type
		trace!("Attempting token authentication");
		// Retrieve just the token
		let token = bearer(headers)?;
		// Verify the signature and the time claims
		let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
			debug!("The authentication token was rejected: {e}");
			Error::InvalidToken(e.to_string())
		})?;
		if data.claims.user_id.is_empty() || data.claims.org_id.is_empty() {
			return Err(Error::InvalidToken("the token carries no user or organization".to_owned()));
		}
		let mut auth = Auth::from(data.claims);
		auth.token = Some(token.to_owned());
		Ok(auth)
	}
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use jsonwebtoken::{EncodingKey, Header, encode};
	use test_log::test;

	use super::*;

	const SECRET: &str = "secret";

	fn token(claims: &Claims, secret: &str) -> String {
		encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
			.unwrap()
	}

	fn headers(value: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(AUTHORIZATION, value.parse().unwrap());
		headers
	}

	fn claims() -> Claims {
		Claims {
			scope: Some("users:read contacts:write".to_owned()),
			exp: Some(Utc::now().timestamp() + 3600),
			..Claims::new("auth0|sub", "user-1", "org-1")
		}
	}

	#[test(tokio::test)]
	async fn valid_tokens_resolve() {
		let jwt = token(&claims(), SECRET);
		let auth = JwtResolver::new(SECRET).resolve(&headers(&format!("Bearer {jwt}"))).await.unwrap();
		assert_eq!(auth.subject, "auth0|sub");
		assert_eq!(auth.user_id, "user-1");
		assert_eq!(auth.organization_id, "org-1");
		assert!(auth.has_scope("users:read"));
		assert!(auth.has_scope("contacts:write"));
		assert_eq!(auth.token.as_deref(), Some(jwt.as_str()));
	}

	#[test(tokio::test)]
	async fn missing_tokens_are_rejected() {
		let res = JwtResolver::new(SECRET).resolve(&HeaderMap::new()).await;
		assert!(matches!(res, Err(Error::MissingToken)));
		let res = JwtResolver::new(SECRET).resolve(&headers("Basic dXNlcjpwYXNz")).await;
		assert!(matches!(res, Err(Error::MissingToken)));
	}

	#[test(tokio::test)]
	async fn forged_tokens_are_rejected() {
		let jwt = token(&claims(), "other");
		let res = JwtResolver::new(SECRET).resolve(&headers(&format!("Bearer {jwt}"))).await;
		assert!(matches!(res, Err(Error::InvalidToken(_))));
	}

	#[test(tokio::test)]
	async fn expired_tokens_are_rejected() {
		let claims = Claims {
			exp: Some(Utc::now().timestamp() - 3600),
			..claims()
		};
		let jwt = token(&claims, SECRET);
		let res = JwtResolver::new(SECRET).resolve(&headers(&format!("bearer {jwt}"))).await;
		assert!(matches!(res, Err(Error::InvalidToken(_))));
	}

	#[test(tokio::test)]
	async fn tokens_need_an_organization() {
		let claims = Claims {
			org_id: String::new(),
			..claims()
		};
		let jwt = token(&claims, SECRET);
		let res = JwtResolver::new(SECRET).resolve(&headers(&format!("Bearer {jwt}"))).await;
		assert!(matches!(res, Err(Error::InvalidToken(_))));
	}
}
