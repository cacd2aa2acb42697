//! # Neodeliver Core
//!
//! This crate is the schema compiler behind the neodeliver GraphQL endpoint.
//! Application modules describe their records and hand plain async functions to
//! the [`gql::Builder`], which derives the GraphQL types, argument parsers,
//! validators and document-store queries from those declarations.
//!
//! The HTTP transport, identity provider and error tracking are collaborators
//! handed in at construction time; see [`kvs::Datastore`],
//! [`iam::IdentityResolver`] and [`fault::FaultReporter`].

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod dbs;
pub mod err;
pub mod fault;
pub mod gql;
pub mod iam;
pub mod kvs;
pub mod names;
pub mod val;
