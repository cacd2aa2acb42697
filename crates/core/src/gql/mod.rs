//! The schema compiler.
//!
//! Records describe themselves through [`Record`], callables take
//! [`FromCall`] parameters, and the [`Builder`] turns both into a GraphQL
//! schema executing against the document store.

pub mod args;
pub mod convert;
pub mod describe;
pub mod error;
pub mod handler;
pub mod query;
pub mod resolver;
pub mod scalars;
pub mod schema;
pub mod types;
mod validate;

pub use self::args::{Args, Argument, ById, Call, FromCall, Meta, Slot};
pub use self::describe::{Describe, Direction, Field, Kind, Override, Record, RecordRef, Rule};
pub use self::error::GqlError;
pub use self::handler::{Handler, IntoFieldResult};
pub use self::query::{QueryConfig, Queryable};
pub use self::resolver::{Guard, Scope};
pub use self::schema::{Builder, FieldConfig, Module};
pub use self::types::{CompiledType, Resolved, Shape, TypeGraph, WireField};

pub use async_graphql::dynamic::Schema;
