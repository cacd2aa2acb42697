use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use neodeliver_core::kvs::MemStore;

use crate::cnf::{DEFAULT_BIND, DEFAULT_QUERY_TIMEOUT, LOGO};
use crate::err::Error;
use crate::net::{self, Config};
use crate::{iam, modules};

#[derive(Args, Debug)]
pub struct StartCommandArguments {
	#[arg(help = "The hostname or IP address to listen for connections on")]
	#[arg(env = "NEODELIVER_BIND", short = 'b', long = "bind")]
	#[arg(default_value = DEFAULT_BIND)]
	listen_address: SocketAddr,

	#[arg(help = "The logging level for the server")]
	#[arg(env = "NEODELIVER_LOG", short = 'l', long = "log")]
	#[arg(default_value = "info")]
	log: String,

	#[arg(help = "The secret identity tokens are signed with")]
	#[arg(env = "NEODELIVER_JWT_SECRET", long = "jwt-secret", hide_env_values = true)]
	jwt_secret: Option<String>,

	#[arg(help = "How long a request may run before it is cancelled")]
	#[arg(env = "NEODELIVER_QUERY_TIMEOUT", long = "query-timeout")]
	#[arg(value_parser = humantime::parse_duration)]
	query_timeout: Option<Duration>,

	#[arg(help = "Whether to hide the startup banner")]
	#[arg(env = "NEODELIVER_NO_BANNER", long)]
	no_banner: bool,
}

pub async fn init(
	StartCommandArguments {
		listen_address,
		log,
		jwt_secret,
		query_timeout,
		no_banner,
	}: StartCommandArguments,
) -> Result<(), Error> {
	// Initialize logging
	crate::telemetry::builder().with_log_level(&log).init()?;
	// Check if a banner should be outputted
	if !no_banner {
		// Output the logo
		println!("{LOGO}");
	}
	// Compile the schema once, before accepting any request
	let schema = modules::schema(MemStore::new())?;
	info!("Compiled the GraphQL schema");
	// Configure the web server
	let config = Config {
		bind: listen_address,
		identity: iam::resolver(jwt_secret.as_deref()),
		query_timeout: query_timeout.unwrap_or(DEFAULT_QUERY_TIMEOUT),
	};
	// Start the web server
	net::init(config, schema).await?;
	// All ok
	Ok(())
}
