use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The identity and permissions of the caller of a request.
///
/// Resolvers receive it by declaring a parameter of this type. It is
/// resolved at most once per request, the first time a resolver or guard
/// asks for it.
#[derive(Clone, Default, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Auth {
	/// The subject of the identity token
	pub subject: String,
	/// The user the request acts as
	pub user_id: String,
	/// The organization the user belongs to
	pub organization_id: String,
	/// The raw bearer token the identity was resolved from, if any
	#[serde(skip)]
	pub token: Option<String>,
	/// The permission scopes granted to the caller
	pub scopes: BTreeSet<String>,
}

impl Auth {
	pub fn new(
		subject: impl Into<String>,
		user_id: impl Into<String>,
		organization_id: impl Into<String>,
	) -> Self {
		Self {
			subject: subject.into(),
			user_id: user_id.into(),
			organization_id: organization_id.into(),
			token: None,
			scopes: BTreeSet::new(),
		}
	}

	/// Grant an additional scope
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.insert(scope.into());
		self
	}

	/// Check if the caller was granted a scope
	pub fn has_scope(&self, scope: &str) -> bool {
		self.scopes.contains(scope)
	}

	/// Check if the identity carries no user
	pub fn is_anon(&self) -> bool {
		self.user_id.is_empty()
	}
}
