mod schema;
mod start;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::cnf::{LOGO, PKG_NAME, PKG_VERSION};
use schema::SchemaCommandArguments;
use start::StartCommandArguments;

const INFO: &str = "
To get started using neodeliver, run the server and open the
exploration page in a browser.

  $ neodeliver start --bind 127.0.0.1:8080

";

#[derive(Parser, Debug)]
#[command(name = "neodeliver command-line interface and server", bin_name = PKG_NAME)]
#[command(version = PKG_VERSION, about = INFO, before_help = LOGO)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
	#[command(about = "Start the GraphQL server")]
	Start(StartCommandArguments),
	#[command(about = "Print the compiled GraphQL schema and exit")]
	Schema(SchemaCommandArguments),
}

pub async fn init() -> ExitCode {
	let args = Cli::parse();
	let output = match args.command {
		Commands::Start(args) => start::init(args).await.map_err(anyhow::Error::from),
		Commands::Schema(args) => schema::init(args).await,
	};
	if let Err(e) = output {
		error!("{}", e);
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn verify_cli() {
		Cli::command().debug_assert();
		assert_eq!(Cli::command().get_bin_name(), Some(PKG_NAME));
	}

	#[test]
	fn commands_are_parsed() {
		let cli = Cli::try_parse_from([PKG_NAME, "schema"]).unwrap();
		assert!(matches!(cli.command, Commands::Schema(_)));
		assert!(Cli::try_parse_from([PKG_NAME, "serve"]).is_err());
	}
}
