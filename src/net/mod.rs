//! The HTTP transport of the GraphQL endpoint.

mod gql;
mod signals;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router};
use http::HeaderValue;
use http::header::{AUTHORIZATION, SERVER};
use neodeliver_core::cnf::SERVER_NAME;
use neodeliver_core::gql::Schema;
use neodeliver_core::iam::IdentityResolver;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::ServiceBuilderExt;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::MakeRequestUuid;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::cnf::HTTP_MAX_BODY_SIZE;
use crate::err::Error;

/// The settings of the web server.
pub struct Config {
	pub bind: SocketAddr,
	pub identity: Arc<dyn IdentityResolver>,
	pub query_timeout: Duration,
}

/// The state shared by every request.
#[derive(Clone)]
pub struct AppState {
	pub schema: Schema,
	pub identity: Arc<dyn IdentityResolver>,
	pub query_timeout: Duration,
	/// Cancels every request in flight when the server is forced to stop
	pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
	// Specify headers to be obfuscated from all requests/responses
	let headers: Arc<[_]> = Arc::new([AUTHORIZATION]);
	// Build the middleware to our service.
	let service = ServiceBuilder::new()
		.catch_panic()
		.set_x_request_id(MakeRequestUuid)
		.propagate_x_request_id()
		.sensitive_request_headers(headers)
		.layer(TraceLayer::new_for_http())
		.layer(SetResponseHeaderLayer::if_not_present(SERVER, HeaderValue::from_static(SERVER_NAME)))
		.layer(RequestBodyLimitLayer::new(*HTTP_MAX_BODY_SIZE));
	Router::new().merge(gql::router()).layer(Extension(state)).layer(service)
}

pub async fn init(config: Config, schema: Schema) -> Result<(), Error> {
	let shutdown = CancellationToken::new();
	let state = AppState {
		schema,
		identity: config.identity,
		query_timeout: config.query_timeout,
		shutdown: shutdown.clone(),
	};
	let app = router(state);
	// Bind the listener before reporting the server as started
	let listener = TcpListener::bind(config.bind).await?;
	info!("Started web server on {}", config.bind);
	axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
		.with_graceful_shutdown(signals::graceful_shutdown(shutdown))
		.await?;
	info!("Web server stopped. Bye!");
	Ok(())
}
