use std::net::SocketAddr;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Extension;
use axum::Router;
use axum::extract::{ConnectInfo, FromRequest, Request};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use http::Method;
use neodeliver_core::dbs::Session;

use super::AppState;
use crate::cnf::{GRAPHQL_ENDPOINT, REQUEST_ID_HEADER};

pub(super) fn router<S>() -> Router<S>
where
	S: Clone + Send + Sync + 'static,
{
	Router::new().route(GRAPHQL_ENDPOINT, get(handler).post(handler))
}

pub async fn graphiql() -> impl IntoResponse {
	Html(GraphiQLSource::build().endpoint(GRAPHQL_ENDPOINT).finish())
}

/// Builds the session of a request from its transport metadata.
fn session(state: &AppState, req: &Request) -> Session {
	let mut session = Session::new(state.identity.clone())
		.with_headers(req.headers().clone())
		.with_cancellation(state.shutdown.child_token())
		.with_timeout(state.query_timeout);
	if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
		session = session.with_ip(addr.ip().to_string());
	}
	if let Some(id) = req.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
		session = session.with_id(id);
	}
	session
}

async fn handler(Extension(state): Extension<AppState>, req: Request) -> Response {
	// Without a query, a browser is asking for the exploration page
	if req.method() == Method::GET && req.uri().query().is_none_or(str::is_empty) {
		return graphiql().await.into_response();
	}
	let session = session(&state, &req);
	let request = match <GraphQLRequest>::from_request(req, &()).await {
		Ok(request) => request.into_inner(),
		Err(e) => return e.into_response(),
	};
	trace!("Executing a GraphQL request for {:?}", session.id);
	GraphQLResponse::from(state.schema.execute(request.data(session)).await).into_response()
}
