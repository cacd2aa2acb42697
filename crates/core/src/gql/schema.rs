//! The schema assembler.
//!
//! Application modules register their queries and mutations with a
//! [`Builder`] at startup. Registration compiles each callable right away,
//! but errors are collected and only reported by [`Builder::build`], so a
//! module can register everything in one pass.

use std::collections::HashSet;
use std::sync::Arc;

use async_graphql::dynamic::{Object, Schema};

use super::error::{GqlError, schema_error};
use super::handler::{Handler, handler_name};
use super::query::{PendingQuery, QueryConfig, Queryable};
use super::resolver::{Binding, Env, Guard};
use super::scalars;
use super::types::TypeGraph;
use crate::cnf::{MUTATION_ROOT, QUERY_ROOT};
use crate::fault::{FaultReporter, TracingReporter};
use crate::kvs::Store;

/// A set of queries and mutations registered together.
pub trait Module {
	fn register(&self, builder: &mut Builder);
}

/// Configures a registered query or mutation callable.
pub struct FieldConfig<'a> {
	binding: Option<&'a mut Binding>,
}

impl FieldConfig<'_> {
	/// Resolve the field only when the guard allows it
	pub fn guard(mut self, guard: impl Guard) -> Self {
		if let Some(b) = self.binding.as_deref_mut() {
			b.guard = Some(Arc::new(guard));
		}
		self
	}

	pub fn description(mut self, text: impl Into<String>) -> Self {
		if let Some(b) = self.binding.as_deref_mut() {
			b.description = Some(text.into());
		}
		self
	}

	pub fn deprecation(mut self, text: impl Into<String>) -> Self {
		if let Some(b) = self.binding.as_deref_mut() {
			b.deprecation = Some(text.into());
		}
		self
	}
}

/// Collects and compiles every field of the schema.
pub struct Builder {
	store: Store,
	reporter: Arc<dyn FaultReporter>,
	pub(crate) graph: TypeGraph,
	pub(crate) pending: Vec<PendingQuery>,
	pub(crate) errors: Vec<GqlError>,
	queries: Vec<Binding>,
	mutations: Vec<Binding>,
}

impl Builder {
	pub fn new(store: impl Into<Store>) -> Self {
		Self {
			store: store.into(),
			reporter: Arc::new(TracingReporter),
			graph: TypeGraph::new(),
			pending: Vec::new(),
			errors: Vec::new(),
			queries: Vec::new(),
			mutations: Vec::new(),
		}
	}

	/// Report unexpected faults to the given collaborator
	pub fn with_reporter(mut self, reporter: Arc<dyn FaultReporter>) -> Self {
		self.reporter = reporter;
		self
	}

	fn compile<H, P>(&mut self, name: Result<String, GqlError>, handler: H) -> Option<Binding>
	where
		H: Handler<P>,
		P: 'static,
	{
		match name.and_then(|name| Binding::handler(&mut self.graph, name, handler)) {
			Ok(binding) => Some(binding),
			Err(e) => {
				self.errors.push(e);
				None
			}
		}
	}

	fn push(list: &mut Vec<Binding>, binding: Option<Binding>) -> FieldConfig<'_> {
		match binding {
			Some(binding) => {
				list.push(binding);
				FieldConfig {
					binding: list.last_mut(),
				}
			}
			None => FieldConfig {
				binding: None,
			},
		}
	}

	/// Registers a mutation named after the callable
	pub fn mutation<H, P>(&mut self, handler: H) -> FieldConfig<'_>
	where
		H: Handler<P>,
		P: 'static,
	{
		let binding = self.compile(handler_name::<H>(), handler);
		Self::push(&mut self.mutations, binding)
	}

	/// Registers a mutation with an explicit name
	pub fn mutation_named<H, P>(&mut self, name: &str, handler: H) -> FieldConfig<'_>
	where
		H: Handler<P>,
		P: 'static,
	{
		let binding = self.compile(Ok(name.to_owned()), handler);
		Self::push(&mut self.mutations, binding)
	}

	/// Registers a query field resolved by a callable named after it
	pub fn query_fn<H, P>(&mut self, handler: H) -> FieldConfig<'_>
	where
		H: Handler<P>,
		P: 'static,
	{
		let binding = self.compile(handler_name::<H>(), handler);
		Self::push(&mut self.queries, binding)
	}

	/// Registers a query field resolved by a callable with an explicit name
	pub fn query_fn_named<H, P>(&mut self, name: &str, handler: H) -> FieldConfig<'_>
	where
		H: Handler<P>,
		P: 'static,
	{
		let binding = self.compile(Ok(name.to_owned()), handler);
		Self::push(&mut self.queries, binding)
	}

	/// Registers a document store query of a record, or of a page of
	/// records when `Q` is a `Vec`.
	pub fn query<Q: Queryable>(&mut self) -> QueryConfig<'_> {
		match PendingQuery::new::<Q>(&mut self.graph) {
			Ok(pending) => {
				trace!("Registering query {}", pending.name);
				self.pending.push(pending);
				let index = self.pending.len() - 1;
				QueryConfig::new(self, Some(index))
			}
			Err(e) => {
				self.errors.push(e);
				QueryConfig::new(self, None)
			}
		}
	}

	pub fn module(&mut self, module: &impl Module) -> &mut Self {
		module.register(self);
		self
	}

	/// Assembles the schema, failing on the first compilation error.
	pub fn build(mut self) -> Result<Schema, GqlError> {
		if !self.errors.is_empty() {
			for e in self.errors.iter() {
				error!("Compilation of the schema failed: {e}");
			}
			return Err(self.errors.swap_remove(0));
		}
		let mut queries = std::mem::take(&mut self.queries);
		for pending in std::mem::take(&mut self.pending) {
			queries.push(pending.into_binding()?);
		}
		if queries.is_empty() {
			return Err(schema_error("The schema has no queries"));
		}
		let env = Env {
			store: self.store.clone(),
			reporter: self.reporter.clone(),
		};
		let query = root(QUERY_ROOT, queries, &env)?;
		let mutation = match self.mutations.is_empty() {
			true => None,
			false => Some(root(MUTATION_ROOT, std::mem::take(&mut self.mutations), &env)?),
		};
		let mut schema = Schema::build(QUERY_ROOT, mutation.as_ref().map(|_| MUTATION_ROOT), None)
			.register(query);
		if let Some(mutation) = mutation {
			schema = schema.register(mutation);
		}
		for scalar in scalars::all() {
			schema = schema.register(scalar);
		}
		for ty in self.graph.take_types() {
			schema = schema.register(ty);
		}
		debug!("Assembled a schema with {} record types", self.graph.len());
		schema
			.data(self.store)
			.finish()
			.map_err(|e| schema_error(format!("There was an error generating the schema: {e:?}")))
	}
}

fn root(name: &str, bindings: Vec<Binding>, env: &Env) -> Result<Object, GqlError> {
	let mut seen = HashSet::new();
	let mut object = Object::new(name);
	for binding in bindings {
		if !seen.insert(binding.name.clone()) {
			return Err(schema_error(format!("Field `{}` of {name} is registered twice", binding.name)));
		}
		debug!("Adding field {} to {name}", binding.name);
		object = object.field(binding.into_field(env));
	}
	Ok(object)
}
