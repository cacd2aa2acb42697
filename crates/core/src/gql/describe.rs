//! Static descriptions of records and their fields.
//!
//! A record implements [`Record`] and lists its fields in declaration
//! order. Each field names the serialized member it reads (its identifier)
//! and the Rust type it carries, from which the GraphQL type is derived
//! through [`Describe`].

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};

use async_graphql::dynamic::{Type, TypeRef};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::names;
use crate::val::Decimal;

/// Whether a type is compiled for output values or for input arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
	Output,
	Input,
}

/// A GraphQL type supplied by a record in place of the generated one.
pub struct Override {
	/// The type reference used verbatim wherever the record appears
	pub type_ref: TypeRef,
	/// Types which must be registered for the reference to resolve
	pub types: Vec<Type>,
}

impl Override {
	pub fn new(type_ref: TypeRef) -> Self {
		Self {
			type_ref,
			types: Vec::new(),
		}
	}

	/// Register an additional type along with the override
	pub fn register(mut self, ty: impl Into<Type>) -> Self {
		self.types.push(ty.into());
		self
	}
}

/// A data record which can be exposed through the schema and stored in a
/// document store.
///
/// The field list drives every conversion, so it must name each serialized
/// member the record carries. Serialized member names are the field
/// identifiers, and the wire name is derived from them unless renamed.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
	/// The name of the record, used for the GraphQL type and the collection.
	const NAME: &'static str;

	/// The fields of the record, in declaration order.
	fn fields() -> Vec<Field>;

	/// Replaces the generated GraphQL type of this record.
	fn graphql_type(_direction: Direction) -> Option<Override> {
		None
	}

	/// A constructor taking the caller's organization, used when a single
	/// record query finds nothing.
	fn fallback() -> Option<fn(&str) -> Self> {
		None
	}

	/// Overrides the name of the single record query.
	fn graphql_name() -> Option<&'static str> {
		None
	}

	fn description() -> Option<&'static str> {
		None
	}

	fn deprecation() -> Option<&'static str> {
		None
	}
}

/// A type-erased handle to a [`Record`] implementation.
#[derive(Clone, Copy, Debug)]
pub struct RecordRef {
	pub id: TypeId,
	pub name: &'static str,
	pub fields: fn() -> Vec<Field>,
	pub custom: fn(Direction) -> Option<Override>,
	pub description: fn() -> Option<&'static str>,
}

impl RecordRef {
	pub fn of<T: Record>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: T::NAME,
			fields: T::fields,
			custom: T::graphql_type,
			description: T::description,
		}
	}

	/// The memoization key of the record's compiled types.
	pub fn key(&self) -> String {
		names::to_snake_case(self.name)
	}
}

/// The structural kind of a described type.
#[derive(Clone, Debug)]
pub enum Kind {
	String,
	Int,
	Float,
	Bool,
	Datetime,
	Decimal,
	Json,
	/// The empty result of a callable
	Unit,
	Option(Box<Kind>),
	List(Box<Kind>),
	Record(RecordRef),
}

/// Describes the structure of a type to the type graph builder.
pub trait Describe {
	fn kind() -> Kind;
}

macro_rules! describe {
	($kind:ident => $($ty:ty),+) => {
		$(impl Describe for $ty {
			fn kind() -> Kind {
				Kind::$kind
			}
		})+
	};
}

describe!(String => String);
describe!(Int => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
describe!(Float => f32, f64);
describe!(Bool => bool);
describe!(Datetime => DateTime<Utc>);
describe!(Decimal => Decimal);
describe!(Json => serde_json::Value, serde_json::Map<String, serde_json::Value>);
describe!(Unit => ());

impl<V> Describe for HashMap<String, V> {
	fn kind() -> Kind {
		Kind::Json
	}
}

impl<V> Describe for BTreeMap<String, V> {
	fn kind() -> Kind {
		Kind::Json
	}
}

impl<T: Describe> Describe for Option<T> {
	fn kind() -> Kind {
		Kind::Option(Box::new(T::kind()))
	}
}

impl<T: Describe> Describe for Vec<T> {
	fn kind() -> Kind {
		Kind::List(Box::new(T::kind()))
	}
}

impl<T: Record> Describe for T {
	fn kind() -> Kind {
		Kind::Record(RecordRef::of::<T>())
	}
}

/// A validation rule declared on an argument field.
#[derive(Clone, Debug)]
pub enum Rule {
	/// The value must be present and not empty
	Required,
	/// The value must be one of the listed strings
	OneOf(&'static [&'static str]),
	/// Strings and lists must have at least this many elements
	MinLen(usize),
	/// Strings and lists must have at most this many elements
	MaxLen(usize),
	/// Numbers must be at least this value
	Min(f64),
	/// Numbers must be at most this value
	Max(f64),
	/// Strings must match this regular expression
	Pattern(&'static str),
}

/// Describes one field of a record.
#[derive(Clone, Debug)]
pub struct Field {
	pub(crate) ident: &'static str,
	pub(crate) rename: Option<&'static str>,
	pub(crate) kind: Kind,
	pub(crate) skip: bool,
	pub(crate) embed: bool,
	pub(crate) nullable: bool,
	pub(crate) rules: Vec<Rule>,
	pub(crate) description: Option<&'static str>,
}

impl Field {
	/// A field reading the serialized member `ident`, carrying a `T`.
	pub fn new<T: Describe>(ident: &'static str) -> Self {
		Self {
			ident,
			rename: None,
			kind: T::kind(),
			skip: false,
			embed: false,
			nullable: false,
			rules: Vec::new(),
			description: None,
		}
	}

	/// An embedded record whose fields are hoisted into the parent. The
	/// member is expected to be serialized with `#[serde(flatten)]`.
	pub fn embed<R: Record>(ident: &'static str) -> Self {
		Self {
			embed: true,
			..Self::new::<R>(ident)
		}
	}

	/// Use an explicit wire name
	pub fn rename(mut self, wire: &'static str) -> Self {
		self.rename = Some(wire);
		self
	}

	/// Leave the field out of the schema
	pub fn skip(mut self) -> Self {
		self.skip = true;
		self
	}

	/// Report the field as nullable even when its type is not optional
	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub fn describe(mut self, text: &'static str) -> Self {
		self.description = Some(text);
		self
	}

	pub fn required(self) -> Self {
		self.rule(Rule::Required)
	}

	pub fn one_of(self, options: &'static [&'static str]) -> Self {
		self.rule(Rule::OneOf(options))
	}

	pub fn min_len(self, n: usize) -> Self {
		self.rule(Rule::MinLen(n))
	}

	pub fn max_len(self, n: usize) -> Self {
		self.rule(Rule::MaxLen(n))
	}

	pub fn min(self, n: f64) -> Self {
		self.rule(Rule::Min(n))
	}

	pub fn max(self, n: f64) -> Self {
		self.rule(Rule::Max(n))
	}

	pub fn pattern(self, re: &'static str) -> Self {
		self.rule(Rule::Pattern(re))
	}

	pub fn rule(mut self, rule: Rule) -> Self {
		self.rules.push(rule);
		self
	}

	/// The name of the field on the wire: the explicit rename, else the
	/// normalized identifier.
	pub fn wire_name(&self) -> String {
		match self.rename {
			Some(name) => name.to_owned(),
			None => names::to_snake_case(self.ident),
		}
	}

	pub(crate) fn is_required(&self) -> bool {
		self.rules.iter().any(|r| matches!(r, Rule::Required))
	}
}
