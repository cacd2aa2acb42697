//! The type graph builder.
//!
//! Walks the descriptors of records and produces the GraphQL output and
//! input types for them. Every record is compiled at most once per
//! direction, and the compiled entry is shared by every later reference.
//!
//! Fields are non-null unless they are optional, with two exceptions:
//! `Decimal` and `JSON` are always nullable, because a nil decimal and a
//! JSON `null` are values of those types.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{
	Field as ObjectField, FieldFuture, InputObject, InputValue, Object, Type, TypeRef,
};

use super::convert;
use super::describe::{Direction, Field, Kind, RecordRef};
use super::error::{GqlError, schema_error};
use super::scalars;
use super::validate::{self, Constraint};

/// How a value of a compiled type is carried on the wire.
#[derive(Clone, Debug)]
pub enum Shape {
	/// A scalar, passed through unchanged
	Leaf,
	/// The empty result of a callable, reported as `true`
	Unit,
	/// A record with a custom GraphQL type, passed through unchanged
	Custom,
	List(Box<Shape>),
	Object(Arc<CompiledType>),
}

/// One field of a compiled record.
#[derive(Clone, Debug)]
pub struct WireField {
	/// The name of the field on the wire
	pub wire: String,
	/// The serialized member the field reads
	pub ident: &'static str,
	pub type_ref: TypeRef,
	pub shape: Shape,
	pub(crate) rules: Vec<Constraint>,
	pub description: Option<&'static str>,
}

/// A record compiled in one direction.
pub struct CompiledType {
	name: String,
	direction: Direction,
	fields: OnceLock<Vec<WireField>>,
}

impl fmt::Debug for CompiledType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Fields may refer back to this type
		f.debug_struct("CompiledType")
			.field("name", &self.name)
			.field("direction", &self.direction)
			.finish()
	}
}

impl CompiledType {
	/// The name of the GraphQL type
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	/// The wire fields, in declaration order. Empty while the type is
	/// still being compiled.
	pub fn fields(&self) -> &[WireField] {
		self.fields.get().map(Vec::as_slice).unwrap_or_default()
	}
}

/// A type reference along with the wire shape of its values.
#[derive(Clone, Debug)]
pub struct Resolved {
	pub type_ref: TypeRef,
	pub shape: Shape,
}

struct Entry {
	id: TypeId,
	ty: Arc<CompiledType>,
}

struct Frame {
	key: (String, Direction),
	/// Whether the record was reached through a non-optional, non-list field
	strict: bool,
}

/// The memoized set of compiled types.
#[derive(Default)]
pub struct TypeGraph {
	memo: HashMap<(String, Direction), Entry>,
	custom: HashMap<(String, Direction), (TypeId, TypeRef)>,
	types: Vec<Type>,
	stack: Vec<Frame>,
}

fn type_name(r: &RecordRef, dir: Direction) -> String {
	match dir {
		Direction::Output => r.name.to_owned(),
		Direction::Input => format!("In{}", r.name),
	}
}

fn wrap(inner: TypeRef, nullable: bool) -> TypeRef {
	match nullable {
		true => inner,
		false => TypeRef::NonNull(Box::new(inner)),
	}
}

fn leaf(name: &'static str, nullable: bool) -> Resolved {
	Resolved {
		type_ref: wrap(TypeRef::named(name), nullable),
		shape: Shape::Leaf,
	}
}

impl TypeGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolves the GraphQL type of a described Rust type.
	pub fn resolve(
		&mut self,
		kind: &Kind,
		dir: Direction,
		force_nullable: bool,
	) -> Result<Resolved, GqlError> {
		self.walk(kind, dir, force_nullable, true)
	}

	fn walk(
		&mut self,
		kind: &Kind,
		dir: Direction,
		force_nullable: bool,
		strict: bool,
	) -> Result<Resolved, GqlError> {
		Ok(match kind {
			Kind::Option(inner) => self.walk(inner, dir, true, false)?,
			Kind::List(inner) => {
				let item = self.walk(inner, dir, false, false)?;
				Resolved {
					type_ref: TypeRef::List(Box::new(item.type_ref)),
					shape: Shape::List(Box::new(item.shape)),
				}
			}
			Kind::String => leaf(TypeRef::STRING, force_nullable),
			Kind::Int => leaf(TypeRef::INT, force_nullable),
			Kind::Float => leaf(TypeRef::FLOAT, force_nullable),
			Kind::Bool => leaf(TypeRef::BOOLEAN, force_nullable),
			Kind::Datetime => leaf(scalars::DATETIME, force_nullable),
			// A nil decimal and a JSON null are both values of these types
			Kind::Decimal => leaf(scalars::DECIMAL, true),
			Kind::Json => leaf(scalars::JSON, true),
			Kind::Unit => Resolved {
				type_ref: TypeRef::named(TypeRef::BOOLEAN),
				shape: Shape::Unit,
			},
			Kind::Record(r) => match (r.custom)(dir) {
				Some(custom) => {
					let key = (r.key(), dir);
					let type_ref = match self.custom.get(&key) {
						Some((id, _)) if *id != r.id => {
							return Err(schema_error(format!(
								"Two different records are named `{}`",
								r.name
							)));
						}
						Some((_, type_ref)) => type_ref.clone(),
						None => {
							trace!("Registering the custom type of record {}", r.name);
							self.types.extend(custom.types);
							self.custom.insert(key, (r.id, custom.type_ref.clone()));
							custom.type_ref
						}
					};
					Resolved {
						type_ref,
						shape: Shape::Custom,
					}
				}
				None => {
					let ty = self.compile(r, dir, strict && !force_nullable)?;
					Resolved {
						type_ref: wrap(TypeRef::named(ty.name()), force_nullable),
						shape: Shape::Object(ty),
					}
				}
			},
		})
	}

	/// Compiles a record in the given direction, returning the memoized
	/// entry when it was compiled before.
	pub fn record(&mut self, r: RecordRef, dir: Direction) -> Result<Arc<CompiledType>, GqlError> {
		self.compile(&r, dir, false)
	}

	fn compile(
		&mut self,
		r: &RecordRef,
		dir: Direction,
		strict: bool,
	) -> Result<Arc<CompiledType>, GqlError> {
		let key = (r.key(), dir);
		if let Some(entry) = self.memo.get(&key) {
			if entry.id != r.id {
				return Err(schema_error(format!("Two different records are named `{}`", r.name)));
			}
			if entry.ty.fields.get().is_none() && strict {
				// Still compiling, so this is a cycle back into the record
				let pos = self.stack.iter().rposition(|f| f.key == key).unwrap_or(0);
				if self.stack[pos + 1..].iter().all(|f| f.strict) {
					return Err(schema_error(format!(
						"Record `{}` contains itself through non-optional fields",
						r.name
					)));
				}
			}
			return Ok(entry.ty.clone());
		}
		debug!("Compiling the {dir:?} type of record {}", r.name);
		let ty = Arc::new(CompiledType {
			name: type_name(r, dir),
			direction: dir,
			fields: OnceLock::new(),
		});
		self.memo.insert(
			key.clone(),
			Entry {
				id: r.id,
				ty: ty.clone(),
			},
		);
		self.stack.push(Frame {
			key,
			strict,
		});
		let fields = self.fields_of(r, dir, &mut vec![r.id]);
		self.stack.pop();
		let fields = fields?;
		if fields.is_empty() {
			return Err(schema_error(format!("Record `{}` has no fields", r.name)));
		}
		let object = match dir {
			Direction::Output => Type::Object(output_object(&ty.name, r, &fields)),
			Direction::Input => Type::InputObject(input_object(&ty.name, r, &fields)),
		};
		self.types.push(object);
		let _ = ty.fields.set(fields);
		Ok(ty)
	}

	/// Compiles the wire fields of a record without registering a type for
	/// it. Used for the argument records of callables.
	pub(crate) fn fields(
		&mut self,
		r: RecordRef,
		dir: Direction,
	) -> Result<Vec<WireField>, GqlError> {
		self.fields_of(&r, dir, &mut vec![r.id])
	}

	fn fields_of(
		&mut self,
		r: &RecordRef,
		dir: Direction,
		chain: &mut Vec<TypeId>,
	) -> Result<Vec<WireField>, GqlError> {
		let mut out: Vec<WireField> = Vec::new();
		for field in (r.fields)() {
			if field.skip {
				continue;
			}
			if field.embed {
				let Kind::Record(inner) = &field.kind else {
					return Err(schema_error(format!(
						"Embedded field `{}` of record `{}` is not a record",
						field.ident, r.name
					)));
				};
				if chain.contains(&inner.id) {
					return Err(schema_error(format!("Record `{}` embeds itself", inner.name)));
				}
				chain.push(inner.id);
				let hoisted = self.fields_of(inner, dir, chain);
				chain.pop();
				for f in hoisted? {
					push_unique(&mut out, f, r)?;
				}
				continue;
			}
			let f = self.wire_field(&field, dir)?;
			push_unique(&mut out, f, r)?;
		}
		Ok(out)
	}

	fn wire_field(&mut self, field: &Field, dir: Direction) -> Result<WireField, GqlError> {
		let wire = field.wire_name();
		let nullable = match dir {
			Direction::Output => field.nullable,
			Direction::Input => field.nullable || !field.is_required(),
		};
		let resolved = self.walk(&field.kind, dir, nullable, true)?;
		Ok(WireField {
			rules: validate::compile(&wire, &field.rules)?,
			wire,
			ident: field.ident,
			type_ref: resolved.type_ref,
			shape: resolved.shape,
			description: field.description,
		})
	}

	/// The number of compiled record types
	pub fn len(&self) -> usize {
		self.memo.len()
	}

	pub fn is_empty(&self) -> bool {
		self.memo.is_empty()
	}

	/// Takes every type which must be registered with the schema
	pub(crate) fn take_types(&mut self) -> Vec<Type> {
		std::mem::take(&mut self.types)
	}
}

fn push_unique(out: &mut Vec<WireField>, f: WireField, r: &RecordRef) -> Result<(), GqlError> {
	if out.iter().any(|o| o.wire == f.wire) {
		return Err(schema_error(format!(
			"Record `{}` has more than one field named `{}`",
			r.name, f.wire
		)));
	}
	out.push(f);
	Ok(())
}

fn output_object(name: &str, r: &RecordRef, fields: &[WireField]) -> Object {
	let mut object = Object::new(name);
	if let Some(text) = (r.description)() {
		object = object.description(text);
	}
	for f in fields {
		let wire = f.wire.clone();
		let shape = f.shape.clone();
		let mut field = ObjectField::new(&f.wire, f.type_ref.clone(), move |ctx| {
			let wire = wire.clone();
			let shape = shape.clone();
			FieldFuture::new(async move {
				let value = match ctx.parent_value.as_value() {
					Some(GqlValue::Object(map)) => map.get(wire.as_str()).cloned(),
					_ => None,
				};
				Ok(value.and_then(|v| convert::field_value(v, &shape)))
			})
		});
		if let Some(text) = f.description {
			field = field.description(text);
		}
		object = object.field(field);
	}
	object
}

fn input_object(name: &str, r: &RecordRef, fields: &[WireField]) -> InputObject {
	let mut object = InputObject::new(name);
	if let Some(text) = (r.description)() {
		object = object.description(text);
	}
	for f in fields {
		let mut input = InputValue::new(&f.wire, f.type_ref.clone());
		if let Some(text) = f.description {
			input = input.description(text);
		}
		object = object.field(input);
	}
	object
}

#[cfg(test)]
mod tests {
	use serde::{Deserialize, Serialize};

	use super::*;
	use crate::gql::describe::{Override, Record};

	#[derive(Serialize, Deserialize)]
	struct Base {
		organization_id: String,
	}

	impl Record for Base {
		const NAME: &'static str = "Base";
		fn fields() -> Vec<Field> {
			vec![Field::new::<String>("organization_id")]
		}
	}

	#[derive(Serialize, Deserialize)]
	struct Tag {
		#[serde(rename = "_id")]
		id: String,
		#[serde(flatten)]
		base: Base,
		name: String,
		note: Option<String>,
		secret: String,
		children: Vec<Tag>,
		parent: Option<Box<Tag>>,
	}

	impl Record for Tag {
		const NAME: &'static str = "Tag";
		fn fields() -> Vec<Field> {
			vec![
				Field::new::<String>("_id").rename("id"),
				Field::embed::<Base>("base"),
				Field::new::<String>("name"),
				Field::new::<Option<String>>("note"),
				Field::new::<String>("secret").skip(),
				Field::new::<Vec<Tag>>("children"),
				Field::new::<Option<Tag>>("parent"),
			]
		}
	}

	#[derive(Serialize, Deserialize)]
	struct Loop {
		inner: Box<Inner>,
	}

	#[derive(Serialize, Deserialize)]
	struct Inner {
		back: Box<Loop>,
	}

	impl Record for Loop {
		const NAME: &'static str = "Loop";
		fn fields() -> Vec<Field> {
			vec![Field::new::<Inner>("inner")]
		}
	}

	impl Record for Inner {
		const NAME: &'static str = "Inner";
		fn fields() -> Vec<Field> {
			vec![Field::new::<Loop>("back")]
		}
	}

	#[derive(Serialize, Deserialize)]
	struct Clash {
		name: String,
		other: String,
	}

	impl Record for Clash {
		const NAME: &'static str = "Clash";
		fn fields() -> Vec<Field> {
			vec![Field::new::<String>("name"), Field::new::<String>("other").rename("name")]
		}
	}

	#[derive(Serialize, Deserialize)]
	struct Money(String);

	impl Record for Money {
		const NAME: &'static str = "Money";
		fn fields() -> Vec<Field> {
			Vec::new()
		}
		fn graphql_type(_: Direction) -> Option<Override> {
			Some(Override::new(TypeRef::named(TypeRef::STRING)))
		}
	}

	fn names(ty: &CompiledType) -> Vec<&str> {
		ty.fields().iter().map(|f| f.wire.as_str()).collect()
	}

	#[test]
	fn fields_are_renamed_flattened_and_skipped() {
		let mut graph = TypeGraph::new();
		let ty = graph.record(RecordRef::of::<Tag>(), Direction::Output).unwrap();
		assert_eq!(names(&ty), ["id", "organization_id", "name", "note", "children", "parent"]);
		assert_eq!(ty.fields()[2].type_ref.to_string(), "String!");
		assert_eq!(ty.fields()[3].type_ref.to_string(), "String");
		assert_eq!(ty.fields()[4].type_ref.to_string(), "[Tag!]");
		assert_eq!(ty.fields()[5].type_ref.to_string(), "Tag");
	}

	#[test]
	fn compiled_types_are_memoized() {
		let mut graph = TypeGraph::new();
		let a = graph.record(RecordRef::of::<Tag>(), Direction::Output).unwrap();
		let b = graph.record(RecordRef::of::<Tag>(), Direction::Output).unwrap();
		assert!(Arc::ptr_eq(&a, &b));
		let c = graph.record(RecordRef::of::<Tag>(), Direction::Input).unwrap();
		assert!(!Arc::ptr_eq(&a, &c));
		assert_eq!(c.name(), "InTag");
		// Tag and the input Tag, the embedded Base is not a type of its own
		assert_eq!(graph.len(), 2);
		assert_eq!(graph.take_types().len(), 2);
	}

	#[test]
	fn input_fields_are_nullable() {
		let mut graph = TypeGraph::new();
		let ty = graph.record(RecordRef::of::<Tag>(), Direction::Input).unwrap();
		assert_eq!(ty.fields()[2].type_ref.to_string(), "String");
		assert_eq!(ty.fields()[4].type_ref.to_string(), "[InTag!]");
	}

	#[test]
	fn strict_cycles_fail() {
		let mut graph = TypeGraph::new();
		let err = graph.resolve(&Kind::Record(RecordRef::of::<Loop>()), Direction::Output, false);
		assert!(matches!(err, Err(GqlError::SchemaError(msg)) if msg.contains("contains itself")));
	}

	#[test]
	fn duplicate_wire_names_fail() {
		let mut graph = TypeGraph::new();
		let err = graph.record(RecordRef::of::<Clash>(), Direction::Output);
		assert!(matches!(err, Err(GqlError::SchemaError(msg)) if msg.contains("`name`")));
	}

	#[test]
	fn overrides_are_used_verbatim() {
		let mut graph = TypeGraph::new();
		let kind = Kind::List(Box::new(Kind::Record(RecordRef::of::<Money>())));
		let resolved = graph.resolve(&kind, Direction::Output, false).unwrap();
		assert_eq!(resolved.type_ref.to_string(), "[String]");
		assert!(graph.is_empty());
	}

	#[test]
	fn primitives() {
		let mut graph = TypeGraph::new();
		let mut show = |kind: Kind, nullable| {
			graph.resolve(&kind, Direction::Output, nullable).unwrap().type_ref.to_string()
		};
		assert_eq!(show(Kind::Int, false), "Int!");
		assert_eq!(show(Kind::Int, true), "Int");
		assert_eq!(show(Kind::Option(Box::new(Kind::Float)), false), "Float");
		assert_eq!(show(Kind::Datetime, false), "DateTime!");
		assert_eq!(show(Kind::Decimal, false), "Decimal");
		assert_eq!(show(Kind::Json, false), "JSON");
		assert_eq!(show(Kind::Unit, false), "Boolean");
	}
}
