use tracing::Level;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

use crate::err::Error;

#[derive(Default, Debug, Clone)]
pub struct Builder {
	log_level: Option<String>,
}

pub fn builder() -> Builder {
	Builder::default()
}

/// Parses a log level, or a raw `RUST_LOG` style directive, into a filter.
///
/// A plain level applies to the crates of this server only, every
/// dependency logs errors.
pub fn filter_from_value(v: &str) -> Result<EnvFilter, ParseError> {
	match v {
		// Don't show any logs at all
		"none" => Ok(EnvFilter::default()),
		// Otherwise, let's show all the logs
		"full" => Ok(EnvFilter::default().add_directive(Level::TRACE.into())),
		// Otherwise, let's only show errors
		"error" => Ok(EnvFilter::default().add_directive(Level::ERROR.into())),
		// Specify the log level for each code area
		"warn" | "info" | "debug" | "trace" => {
			EnvFilter::builder().parse(format!("error,neodeliver={v},neodeliver_core={v}"))
		}
		// Let's try to parse the custom log level
		_ => EnvFilter::builder().parse(v),
	}
}

impl Builder {
	/// Set the log level on the builder
	pub fn with_log_level(mut self, log_level: &str) -> Self {
		self.log_level = Some(log_level.to_owned());
		self
	}

	/// Build a tracing dispatcher with the compact fmt subscriber writing to stderr
	pub fn build(self) -> Result<Box<dyn Subscriber + Send + Sync + 'static>, Error> {
		let level = self.log_level.as_deref().unwrap_or("info");
		let filter = filter_from_value(level).map_err(|e| Error::Logger(e.to_string()))?;
		let registry = tracing_subscriber::registry().with(
			tracing_subscriber::fmt::layer()
				.compact()
				.with_ansi(true)
				.with_target(true)
				.with_span_events(FmtSpan::NONE)
				.with_writer(std::io::stderr)
				.with_filter(filter),
		);
		Ok(Box::new(registry))
	}

	/// Install the tracing pipeline
	pub fn init(self) -> Result<(), Error> {
		self.build()?.try_init().map_err(|e| Error::Logger(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("none")]
	#[case("full")]
	#[case("error")]
	#[case("info")]
	#[case("trace")]
	#[case("neodeliver_core::gql=debug")]
	fn levels_are_accepted(#[case] level: &str) {
		assert!(filter_from_value(level).is_ok());
	}

	#[test]
	fn levels_apply_to_our_crates() {
		let filter = filter_from_value("debug").unwrap().to_string();
		assert!(filter.contains("neodeliver=debug"));
		assert!(filter.contains("neodeliver_core=debug"));
	}

	#[test]
	fn invalid_directives_are_rejected() {
		assert!(filter_from_value("neodeliver=loud").is_err());
	}

	#[test]
	fn builder_builds_a_subscriber() {
		assert!(builder().with_log_level("warn").build().is_ok());
		assert!(builder().with_log_level("neodeliver=loud").build().is_err());
	}
}
