//! The callables which can be registered as fields.
//!
//! Any async function taking up to six [`FromCall`] parameters and
//! returning an [`IntoFieldResult`] is a [`Handler`]. The parameter list is
//! turned into a list of slots when the field is compiled.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value as Json;

use super::args::{Call, FromCall, Slot};
use super::describe::{Describe, Kind};
use super::error::{GqlError, internal_error, schema_error};
use super::types::TypeGraph;
use crate::names;

/// The value returned by a registered callable.
pub trait IntoFieldResult: Send + 'static {
	/// The kind of the value on success
	fn kind() -> Kind;
	/// Serializes the value, or surfaces the error it carries
	fn into_result(self) -> Result<Json, GqlError>;
}

impl<T> IntoFieldResult for T
where
	T: Describe + Serialize + Send + 'static,
{
	fn kind() -> Kind {
		T::kind()
	}

	fn into_result(self) -> Result<Json, GqlError> {
		serde_json::to_value(&self).map_err(|e| internal_error(e.to_string()))
	}
}

impl<T, E> IntoFieldResult for Result<T, E>
where
	T: Describe + Serialize + Send + 'static,
	E: Into<GqlError> + Send + 'static,
{
	fn kind() -> Kind {
		T::kind()
	}

	fn into_result(self) -> Result<Json, GqlError> {
		self.map_err(Into::into)?.into_result()
	}
}

/// A callable with a list of tagged parameters.
pub trait Handler<P>: Clone + Send + Sync + 'static {
	type Output: IntoFieldResult;

	/// Compiles the slots of the parameters, in declaration order
	fn slots(graph: &mut TypeGraph) -> Result<Vec<Slot>, GqlError>;

	/// Extracts every parameter from the call and invokes the callable
	fn call(&self, call: Call, slots: Arc<[Slot]>) -> BoxFuture<'static, Result<Self::Output, GqlError>>;
}

macro_rules! impl_handler {
	($($ty:ident),*) => {
		#[allow(non_snake_case, unused_mut, unused_variables)]
		impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
		where
			F: Fn($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
			Fut: Future<Output = R> + Send + 'static,
			R: IntoFieldResult,
			$($ty: FromCall,)*
		{
			type Output = R;

			fn slots(graph: &mut TypeGraph) -> Result<Vec<Slot>, GqlError> {
				Ok(vec![$($ty::slot(graph)?,)*])
			}

			fn call(&self, call: Call, slots: Arc<[Slot]>) -> BoxFuture<'static, Result<R, GqlError>> {
				let f = self.clone();
				Box::pin(async move {
					let mut slots = slots.iter();
					$(
						let slot = slots.next().ok_or_else(|| internal_error("A parameter has no slot"))?;
						let $ty = $ty::from_call(&call, slot).await?;
					)*
					Ok(f($($ty,)*).await)
				})
			}
		}
	};
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);

/// Derives the field name of a callable from its item name.
pub(crate) fn handler_name<H>() -> Result<String, GqlError> {
	let path = std::any::type_name::<H>();
	let path = path.split('<').next().unwrap_or(path);
	let name = path.rsplit("::").next().unwrap_or(path);
	if name.is_empty() || name.contains('{') {
		return Err(schema_error(format!(
			"Cannot derive a field name from `{path}`, register it with an explicit name"
		)));
	}
	Ok(names::to_snake_case(name))
}
