//! The neodeliver GraphQL server.
//!
//! The binary compiles the application modules into a GraphQL schema at
//! startup, and serves it over HTTP until a shutdown signal is received.

#[macro_use]
extern crate tracing;

mod cli;
mod cnf;
mod err;
mod iam;
mod modules;
mod net;
mod telemetry;

use std::future::Future;
use std::process::ExitCode;

fn main() -> ExitCode {
	with_enough_stack(cli::init())
}

/// Rust's default thread stack size of 2MiB doesn't allow sufficient recursion depth.
fn with_enough_stack(fut: impl Future<Output = ExitCode> + Send) -> ExitCode {
	// Start a Tokio runtime with custom configuration
	let mut b = tokio::runtime::Builder::new_multi_thread();
	b.enable_all()
		.max_blocking_threads(*cnf::RUNTIME_MAX_BLOCKING_THREADS)
		.thread_stack_size(*cnf::RUNTIME_STACK_SIZE)
		.thread_name("neodeliver-worker");
	// The logger is not installed yet, so report straight to stderr
	match b.build() {
		Ok(b) => b.block_on(fut),
		Err(e) => {
			eprintln!("Failed to build runtime: {e}");
			ExitCode::FAILURE
		}
	}
}
