//! The argument and injection compiler.
//!
//! Every parameter of a registered callable implements [`FromCall`]. Once,
//! while the schema is compiled, each parameter reports the [`Slot`] it
//! fills: call metadata, the caller's identity, or a record of wire
//! arguments. On every call the parameter is then extracted from the
//! [`Call`] using that slot.

use std::sync::Arc;

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{InputValue, ResolverContext, TypeRef};
use async_graphql::indexmap::IndexMap;
use async_graphql::Name;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::convert;
use super::describe::{Direction, Field, Record, RecordRef};
use super::error::{GqlError, argument_error, internal_error, schema_error};
use super::types::{TypeGraph, WireField};
use super::validate;
use crate::dbs::Session;
use crate::iam::Auth;
use crate::kvs::Store;

/// The state of one invocation of a compiled field.
#[derive(Clone, Debug)]
pub struct Call {
	field: Arc<str>,
	args: IndexMap<Name, GqlValue>,
	session: Session,
	store: Store,
}

impl Call {
	pub(crate) fn new(ctx: &ResolverContext<'_>, field: &Arc<str>, store: &Store) -> Self {
		Self {
			field: field.clone(),
			args: ctx.args.as_index_map().clone(),
			session: ctx.data_opt::<Session>().cloned().unwrap_or_default(),
			store: store.clone(),
		}
	}
	#[cfg(test)]
	pub(crate) fn detached(field: &str, args: IndexMap<Name, GqlValue>) -> Self {
		Self {
			field: Arc::from(field),
			args,
			session: Session::default(),
			store: Store::new(crate::kvs::MemStore::new()),
		}
	}
	/// The name of the field being resolved
	pub fn field(&self) -> &str {
		&self.field
	}
	/// A raw wire argument of the call
	pub fn arg(&self, name: &str) -> Option<&GqlValue> {
		self.args.get(name)
	}
	pub fn session(&self) -> &Session {
		&self.session
	}
	pub fn store(&self) -> &Store {
		&self.store
	}
}

/// One argument declared on a compiled field.
#[derive(Clone, Debug)]
pub struct Argument {
	pub name: String,
	pub type_ref: TypeRef,
	pub description: Option<String>,
	pub default: Option<GqlValue>,
}

impl Argument {
	pub fn new(name: impl Into<String>, type_ref: impl Into<TypeRef>) -> Self {
		Self {
			name: name.into(),
			type_ref: type_ref.into(),
			description: None,
			default: None,
		}
	}

	pub fn description(mut self, text: impl Into<String>) -> Self {
		self.description = Some(text.into());
		self
	}

	pub fn default_value(mut self, value: impl Into<GqlValue>) -> Self {
		self.default = Some(value.into());
		self
	}

	pub(crate) fn input(&self) -> InputValue {
		let mut input = InputValue::new(&self.name, self.type_ref.clone());
		if let Some(text) = &self.description {
			input = input.description(text);
		}
		if let Some(value) = &self.default {
			input = input.default_value(value.clone());
		}
		input
	}
}

/// The compiled argument declarations of one argument record.
#[derive(Debug)]
pub struct ArgumentSet {
	record: &'static str,
	fields: Vec<WireField>,
}

impl ArgumentSet {
	pub(crate) fn compile(graph: &mut TypeGraph, r: RecordRef) -> Result<Self, GqlError> {
		if let Some(f) = (r.fields)().iter().find(|f| f.embed) {
			return Err(schema_error(format!(
				"Argument record `{}` embeds `{}`, which is not supported in arguments",
				r.name, f.ident
			)));
		}
		let fields = graph.fields(r, Direction::Input)?;
		Ok(Self {
			record: r.name,
			fields,
		})
	}

	/// The wire arguments, in declaration order
	pub fn arguments(&self) -> Vec<Argument> {
		self.fields
			.iter()
			.map(|f| {
				let mut arg = Argument::new(&f.wire, f.type_ref.clone());
				arg.description = f.description.map(str::to_owned);
				arg
			})
			.collect()
	}

	/// Assembles and validates the record from the wire arguments.
	pub(crate) fn assemble<T: Record>(
		&self,
		args: &IndexMap<Name, GqlValue>,
	) -> Result<T, GqlError> {
		let mut members = serde_json::Map::new();
		for f in self.fields.iter() {
			if let Some(v) = args.get(f.wire.as_str()) {
				members.insert(f.ident.to_owned(), convert::from_wire(v, &f.shape)?);
			}
		}
		let value = Json::Object(members);
		trace!("Assembled {} from the arguments: {value}", self.record);
		validate::check(&value, &self.fields)?;
		serde_json::from_value(value).map_err(|e| argument_error(format!("{}: {e}", self.record)))
	}
}

/// The slot a callable parameter fills.
#[derive(Clone, Debug)]
pub enum Slot {
	/// Request scoped call metadata
	Meta,
	/// The identity of the caller
	Identity,
	/// A record assembled from wire arguments
	Arguments(Arc<ArgumentSet>),
}

/// A type which can be a parameter of a registered callable.
#[async_trait::async_trait]
pub trait FromCall: Sized + Send + 'static {
	/// Reports the slot of the parameter, once at compile time
	fn slot(graph: &mut TypeGraph) -> Result<Slot, GqlError>;
	/// Extracts the parameter from the call
	async fn from_call(call: &Call, slot: &Slot) -> Result<Self, GqlError>;
}

/// The metadata of the current call.
#[derive(Clone, Debug)]
pub struct Meta {
	/// The name of the field being resolved
	pub field: String,
	/// The address of the client
	pub ip: Option<String>,
	/// The id of the request
	pub request_id: Option<String>,
	pub store: Store,
	pub session: Session,
}

#[async_trait::async_trait]
impl FromCall for Meta {
	fn slot(_: &mut TypeGraph) -> Result<Slot, GqlError> {
		Ok(Slot::Meta)
	}

	async fn from_call(call: &Call, _: &Slot) -> Result<Self, GqlError> {
		Ok(Meta {
			field: call.field.to_string(),
			ip: call.session.ip.clone(),
			request_id: call.session.id.clone(),
			store: call.store.clone(),
			session: call.session.clone(),
		})
	}
}

#[async_trait::async_trait]
impl FromCall for Auth {
	fn slot(_: &mut TypeGraph) -> Result<Slot, GqlError> {
		Ok(Slot::Identity)
	}

	async fn from_call(call: &Call, _: &Slot) -> Result<Self, GqlError> {
		Ok(call.session.auth().await?)
	}
}

/// A record of wire arguments.
#[derive(Clone, Debug)]
pub struct Args<T>(pub T);

impl<T> std::ops::Deref for Args<T> {
	type Target = T;
	fn deref(&self) -> &T {
		&self.0
	}
}

#[async_trait::async_trait]
impl<T: Record> FromCall for Args<T> {
	fn slot(graph: &mut TypeGraph) -> Result<Slot, GqlError> {
		Ok(Slot::Arguments(Arc::new(ArgumentSet::compile(graph, RecordRef::of::<T>())?)))
	}

	async fn from_call(call: &Call, slot: &Slot) -> Result<Self, GqlError> {
		match slot {
			Slot::Arguments(set) => set.assemble(&call.args).map(Args),
			_ => Err(internal_error(format!("Argument record {} was bound to another slot", T::NAME))),
		}
	}
}

/// The arguments of a query addressing one record by its id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ById {
	pub id: String,
}

impl Record for ById {
	const NAME: &'static str = "ById";

	fn fields() -> Vec<Field> {
		vec![Field::new::<String>("id").required()]
	}
}
