//! The error-tracking collaborator.
//!
//! Unexpected faults caught by a resolver's recovery boundary are handed to
//! a [`FaultReporter`] and flushed before the fault is raised again.

use std::any::Any;
use std::time::Duration;

/// Describes an unexpected fault caught while resolving a field.
#[derive(Clone, Debug)]
pub struct Fault {
	/// The field being resolved
	pub field: String,
	/// The request the fault happened in
	pub request: Option<String>,
	/// The panic message, when it carried one
	pub message: String,
}

impl Fault {
	pub fn new(field: impl Into<String>, request: Option<String>, payload: &(dyn Any + Send)) -> Self {
		let message = match payload.downcast_ref::<&'static str>() {
			Some(s) => (*s).to_owned(),
			None => match payload.downcast_ref::<String>() {
				Some(s) => s.clone(),
				None => "unknown fault".to_owned(),
			},
		};
		Self {
			field: field.into(),
			request,
			message,
		}
	}
}

/// Receives faults for operational tracking.
#[async_trait::async_trait]
pub trait FaultReporter: Send + Sync {
	/// Record a fault
	fn report(&self, fault: &Fault);
	/// Deliver every recorded fault, waiting at most `timeout`
	async fn flush(&self, timeout: Duration);
}

/// Reports faults through the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

#[async_trait::async_trait]
impl FaultReporter for TracingReporter {
	fn report(&self, fault: &Fault) {
		error!(
			field = %fault.field,
			request = ?fault.request,
			"Recovered a fault while resolving a field: {}",
			fault.message
		);
	}

	async fn flush(&self, _: Duration) {}
}
