//! The application modules served by the GraphQL endpoint.

mod contacts;
mod settings;

use neodeliver_core::filter;
use neodeliver_core::gql::{Builder, GqlError, Schema};
use neodeliver_core::iam::Auth;
use neodeliver_core::kvs::{Filter, Store};

pub use self::contacts::Contacts;
pub use self::settings::Settings;

/// Compiles every application module into a schema served over `store`.
pub fn schema(store: impl Into<Store>) -> Result<Schema, GqlError> {
	let mut builder = Builder::new(store);
	builder.module(&Settings).module(&Contacts);
	builder.build()
}

/// Selects the documents of the caller's organization.
async fn by_organization(auth: Auth) -> Filter {
	filter!("organization_id" => auth.organization_id)
}

/// Generates a new document id carrying a kind prefix.
fn new_id(prefix: &str) -> String {
	format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
