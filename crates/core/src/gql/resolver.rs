//! The resolver compiler.
//!
//! Wraps a compiled callable into a field of the schema. Every invocation
//! checks the guard, runs the callable and converts its result into the
//! wire shape of the field. Unexpected faults are caught at this boundary,
//! handed to the fault reporter, and raised again.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value as Json;

use super::args::{Argument, Call, Slot};
use super::convert;
use super::describe::Direction;
use super::error::{GqlError, schema_error};
use super::handler::{Handler, IntoFieldResult};
use super::types::{Resolved, TypeGraph};
use crate::cnf;
use crate::dbs::Session;
use crate::fault::{Fault, FaultReporter};
use crate::kvs::Store;

/// Decides whether the caller may resolve a field.
#[async_trait::async_trait]
pub trait Guard: Send + Sync + 'static {
	async fn check(&self, session: &Session) -> bool;
}

#[async_trait::async_trait]
impl<F> Guard for F
where
	F: Fn(&Session) -> bool + Send + Sync + 'static,
{
	async fn check(&self, session: &Session) -> bool {
		self(session)
	}
}

/// A guard which requires the caller to hold a permission scope.
#[derive(Clone, Copy, Debug)]
pub struct Scope(pub &'static str);

#[async_trait::async_trait]
impl Guard for Scope {
	async fn check(&self, session: &Session) -> bool {
		match session.auth().await {
			Ok(auth) => auth.has_scope(self.0),
			Err(e) => {
				debug!("Denying the `{}` scope: {e}", self.0);
				false
			}
		}
	}
}

/// A compiled callable producing its serialized result.
pub(crate) type Run = Arc<dyn Fn(Call) -> BoxFuture<'static, Result<Json, GqlError>> + Send + Sync>;

/// The collaborators shared by every compiled field.
#[derive(Clone)]
pub(crate) struct Env {
	pub store: Store,
	pub reporter: Arc<dyn FaultReporter>,
}

/// Compiles the parameter list of a handler once, returning the arguments
/// it declares and a reusable invocation.
pub(crate) fn compile<H, P>(graph: &mut TypeGraph, handler: H) -> Result<(Vec<Argument>, Run), GqlError>
where
	H: Handler<P>,
	P: 'static,
{
	let slots: Arc<[Slot]> = H::slots(graph)?.into();
	let mut arguments: Vec<Argument> = Vec::new();
	for slot in slots.iter() {
		if let Slot::Arguments(set) = slot {
			for arg in set.arguments() {
				if arguments.iter().any(|a| a.name == arg.name) {
					return Err(schema_error(format!("Argument `{}` is declared twice", arg.name)));
				}
				arguments.push(arg);
			}
		}
	}
	let run: Run = Arc::new(move |call: Call| {
		let fut = handler.call(call, slots.clone());
		async move { fut.await?.into_result() }.boxed()
	});
	Ok((arguments, run))
}

/// A compiled field, ready to be attached to a root object.
pub(crate) struct Binding {
	pub name: String,
	pub output: Resolved,
	pub arguments: Vec<Argument>,
	pub guard: Option<Arc<dyn Guard>>,
	pub run: Run,
	pub description: Option<String>,
	pub deprecation: Option<String>,
}

impl Binding {
	/// Compiles a handler into a binding named `name`.
	pub(crate) fn handler<H, P>(graph: &mut TypeGraph, name: String, handler: H) -> Result<Self, GqlError>
	where
		H: Handler<P>,
		P: 'static,
	{
		let output = graph.resolve(&<H::Output as IntoFieldResult>::kind(), Direction::Output, true)?;
		let (arguments, run) = compile(graph, handler)?;
		trace!("Compiled field {name} with {} arguments", arguments.len());
		Ok(Self {
			name,
			output,
			arguments,
			guard: None,
			run,
			description: None,
			deprecation: None,
		})
	}

	pub(crate) fn into_field(self, env: &Env) -> Field {
		let Binding {
			name,
			output,
			arguments,
			guard,
			run,
			description,
			deprecation,
		} = self;
		let env = env.clone();
		let shared: Arc<str> = Arc::from(name.as_str());
		let shape = output.shape.clone();
		let mut field = Field::new(name, output.type_ref, move |ctx| {
			let env = env.clone();
			let name = shared.clone();
			let shape = shape.clone();
			let guard = guard.clone();
			let run = run.clone();
			FieldFuture::new(async move {
				let call = Call::new(&ctx, &name, &env.store);
				trace!("Resolving field {name} with arguments {:?}", ctx.args.as_index_map());
				let res = execute(&env, guard, run, call)
					.await
					.and_then(|value| convert::to_wire(value, &shape));
				match res {
					Ok(value) => Ok(convert::field_value(value, &shape)),
					// A failed field resolves to null, its siblings still resolve
					Err(e) => {
						debug!("Field {name} failed: {e}");
						let e = async_graphql::Error::from(e).into_server_error(ctx.item.pos);
						ctx.add_error(ctx.set_error_path(e));
						Ok(None)
					}
				}
			})
		});
		for arg in arguments.iter() {
			field = field.argument(arg.input());
		}
		if let Some(text) = description {
			field = field.description(text);
		}
		if let Some(text) = deprecation {
			field = field.deprecation(Some(text.as_str()));
		}
		field
	}
}

/// Runs one invocation under the recovery boundary, racing it against the
/// cancellation of the session.
async fn execute(
	env: &Env,
	guard: Option<Arc<dyn Guard>>,
	run: Run,
	call: Call,
) -> Result<Json, GqlError> {
	let session = call.session().clone();
	let field = call.field().to_owned();
	let work = async move {
		if let Some(guard) = guard {
			if !guard.check(call.session()).await {
				return Err(GqlError::NotPermitted);
			}
		}
		run(call).await
	};
	let res = tokio::select! {
		biased;
		_ = session.done() => {
			debug!("Field {field} was cancelled");
			return Err(GqlError::Cancelled);
		}
		res = AssertUnwindSafe(work).catch_unwind() => res,
	};
	match res {
		Ok(res) => res,
		Err(payload) => {
			let fault = Fault::new(field, session.id.clone(), &*payload);
			env.reporter.report(&fault);
			env.reporter.flush(cnf::fault_flush_timeout()).await;
			std::panic::resume_unwind(payload)
		}
	}
}
