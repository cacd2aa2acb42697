//! The generic query builder.
//!
//! A record registered as queryable gets a field reading it straight from
//! the document store: the single record form finds one document, the list
//! form finds a page of documents. An optional filter callable, compiled
//! like any other callable, produces the store filter of each call.

use std::sync::Arc;

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::TypeRef;
use futures::FutureExt;
use serde_json::Value as Json;

use super::args::{Argument, Call};
use super::describe::{Direction, Kind, Record, RecordRef};
use super::error::{GqlError, argument_error, internal_error, resolver_error, schema_error};
use super::handler::Handler;
use super::resolver::{self, Binding, Guard, Run};
use super::schema::Builder;
use super::types::{Resolved, TypeGraph};
use crate::cnf;
use crate::kvs::{Datastore, Document, Filter};
use crate::names;

/// A record, or a list of records, which can be queried.
pub trait Queryable: 'static {
	type Item: Record;
	/// Whether the query returns a page of records
	const MANY: bool;
}

impl<T: Record> Queryable for T {
	type Item = T;
	const MANY: bool = false;
}

impl<T: Record> Queryable for Vec<T> {
	type Item = T;
	const MANY: bool = true;
}

type After = Arc<dyn Fn(&Call, Json) -> Result<Json, GqlError> + Send + Sync>;

fn decode_as<T: Record>(doc: Document) -> Result<Json, GqlError> {
	let record: T = serde_json::from_value(Json::Object(doc)).map_err(|e| {
		GqlError::DbError(crate::err::Error::InvalidDocument(format!("{}: {e}", T::NAME)))
	})?;
	serde_json::to_value(&record).map_err(|e| internal_error(e.to_string()))
}

fn fallback_as<T: Record>(organization: &str) -> Result<Json, GqlError> {
	match T::fallback() {
		Some(make) => serde_json::to_value(make(organization)).map_err(|e| internal_error(e.to_string())),
		None => Ok(Json::Null),
	}
}

/// The execution plan of a compiled query.
struct Plan {
	many: bool,
	collection: String,
	decode: fn(Document) -> Result<Json, GqlError>,
	fallback: Option<fn(&str) -> Result<Json, GqlError>>,
	filter: Option<Run>,
	after: Vec<After>,
}

fn page(call: &Call, name: &str, default: i64) -> Result<u64, GqlError> {
	let value = match call.arg(name) {
		None | Some(GqlValue::Null) => default,
		Some(GqlValue::Number(n)) => n.as_i64().ok_or_else(|| argument_error(format!("`{name}` must be an integer")))?,
		Some(other) => return Err(argument_error(format!("`{name}` must be an integer, found {other}"))),
	};
	u64::try_from(value).map_err(|_| argument_error(format!("`{name}` must not be negative")))
}

impl Plan {
	async fn resolve(&self, call: Call) -> Result<Json, GqlError> {
		let filter = match &self.filter {
			Some(run) => match run(call.clone()).await? {
				Json::Object(filter) => filter,
				// No filter matches everything
				Json::Null => Filter::new(),
				other => {
					return Err(resolver_error(format!("A filter must be an object, found {other}")));
				}
			},
			None => Filter::new(),
		};
		trace!("Querying {} with filter {filter:?}", self.collection);
		let mut value = match self.many {
			false => self.find_one(&call, &filter).await?,
			true => self.find_page(&call, &filter).await?,
		};
		for after in self.after.iter() {
			value = after(&call, value)?;
		}
		Ok(value)
	}

	async fn find_one(&self, call: &Call, filter: &Filter) -> Result<Json, GqlError> {
		match call.store().find_one(&self.collection, filter).await? {
			Some(doc) => (self.decode)(doc),
			None => match self.fallback {
				Some(fallback) => {
					let auth = call.session().auth().await?;
					debug!("No document in {}, using the default", self.collection);
					fallback(&auth.organization_id)
				}
				None => Ok(Json::Null),
			},
		}
	}

	async fn find_page(&self, call: &Call, filter: &Filter) -> Result<Json, GqlError> {
		let first = page(call, "first", *cnf::DEFAULT_PAGE_SIZE)?;
		let offset = page(call, "offset", 0)?;
		let store: &dyn Datastore = &**call.store();
		let docs = store.find_many(&self.collection, filter, Some(first), offset).await?;
		docs.into_iter().map(self.decode).collect::<Result<Vec<_>, _>>().map(Json::Array)
	}
}

/// A query being registered, before it is attached to the schema.
pub(crate) struct PendingQuery {
	pub name: String,
	plan: Plan,
	output: Resolved,
	filter_args: Vec<Argument>,
	extra: Vec<Argument>,
	guard: Option<Arc<dyn Guard>>,
	description: Option<String>,
	deprecation: Option<String>,
}

impl PendingQuery {
	pub(crate) fn new<Q: Queryable>(graph: &mut TypeGraph) -> Result<Self, GqlError> {
		let record = Kind::Record(RecordRef::of::<Q::Item>());
		let (name, kind) = match Q::MANY {
			false => {
				let name = match <Q::Item as Record>::graphql_name() {
					Some(name) => name.to_owned(),
					None => names::to_snake_case(<Q::Item as Record>::NAME),
				};
				(name, Kind::Option(Box::new(record)))
			}
			true => (names::collection_name(<Q::Item as Record>::NAME), Kind::List(Box::new(record))),
		};
		let output = graph.resolve(&kind, Direction::Output, true)?;
		let fallback = <Q::Item as Record>::fallback().map(|_| fallback_as::<Q::Item> as fn(&str) -> Result<Json, GqlError>);
		Ok(Self {
			name,
			plan: Plan {
				many: Q::MANY,
				collection: names::collection_name(<Q::Item as Record>::NAME),
				decode: decode_as::<Q::Item>,
				fallback,
				filter: None,
				after: Vec::new(),
			},
			output,
			filter_args: Vec::new(),
			extra: Vec::new(),
			guard: None,
			description: <Q::Item as Record>::description().map(str::to_owned),
			deprecation: <Q::Item as Record>::deprecation().map(str::to_owned),
		})
	}

	pub(crate) fn into_binding(self) -> Result<Binding, GqlError> {
		let mut arguments = self.filter_args;
		if self.plan.many {
			arguments.push(
				Argument::new("first", TypeRef::named(TypeRef::INT))
					.default_value(*cnf::DEFAULT_PAGE_SIZE)
					.description("take first n items of list"),
			);
			arguments.push(
				Argument::new("offset", TypeRef::named(TypeRef::INT))
					.default_value(0)
					.description("skip n items of list"),
			);
		}
		for arg in self.extra {
			if arguments.iter().any(|a| a.name == arg.name) {
				return Err(schema_error(format!(
					"Query `{}` declares the argument `{}` twice",
					self.name, arg.name
				)));
			}
			arguments.push(arg);
		}
		let plan = Arc::new(self.plan);
		let run: Run = Arc::new(move |call: Call| {
			let plan = plan.clone();
			async move { plan.resolve(call).await }.boxed()
		});
		Ok(Binding {
			name: self.name,
			output: self.output,
			arguments,
			guard: self.guard,
			run,
			description: self.description,
			deprecation: self.deprecation,
		})
	}
}

/// Configures a registered query. Obtained from [`Builder::query`].
pub struct QueryConfig<'a> {
	builder: &'a mut Builder,
	index: Option<usize>,
}

impl<'a> QueryConfig<'a> {
	pub(crate) fn new(builder: &'a mut Builder, index: Option<usize>) -> Self {
		Self {
			builder,
			index,
		}
	}

	fn pending(&mut self) -> Option<&mut PendingQuery> {
		self.index.and_then(|i| self.builder.pending.get_mut(i))
	}

	/// Produces the store filter of every call with the given callable,
	/// adding the arguments it declares to the query.
	pub fn filter<H, P>(mut self, handler: H) -> Self
	where
		H: Handler<P>,
		P: 'static,
	{
		if self.index.is_none() {
			return self;
		}
		match resolver::compile(&mut self.builder.graph, handler) {
			Ok((arguments, run)) => {
				if let Some(pending) = self.pending() {
					pending.filter_args = arguments;
					pending.plan.filter = Some(run);
				}
			}
			Err(e) => self.builder.errors.push(e),
		}
		self
	}

	/// Declares an additional argument on the query
	pub fn arg(mut self, arg: Argument) -> Self {
		if let Some(pending) = self.pending() {
			pending.extra.push(arg);
		}
		self
	}

	/// Post-processes the resolved value of every call
	pub fn after<F>(mut self, f: F) -> Self
	where
		F: Fn(&Call, Json) -> Result<Json, GqlError> + Send + Sync + 'static,
	{
		if let Some(pending) = self.pending() {
			pending.plan.after.push(Arc::new(f));
		}
		self
	}

	pub fn guard(mut self, guard: impl Guard) -> Self {
		if let Some(pending) = self.pending() {
			pending.guard = Some(Arc::new(guard));
		}
		self
	}

	pub fn description(mut self, text: impl Into<String>) -> Self {
		if let Some(pending) = self.pending() {
			pending.description = Some(text.into());
		}
		self
	}

	pub fn deprecation(mut self, text: impl Into<String>) -> Self {
		if let Some(pending) = self.pending() {
			pending.deprecation = Some(text.into());
		}
		self
	}
}
