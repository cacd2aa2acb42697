use anyhow::{Context, Result};
use clap::Args;
use neodeliver_core::kvs::MemStore;

use crate::modules;

#[derive(Args, Debug)]
pub struct SchemaCommandArguments {
	#[arg(help = "The level of logging while the schema is compiled")]
	#[arg(env = "NEODELIVER_LOG", short = 'l', long = "log")]
	#[arg(default_value = "error")]
	log: String,
}

pub async fn init(
	SchemaCommandArguments {
		log,
	}: SchemaCommandArguments,
) -> Result<()> {
	// Initialize logging
	crate::telemetry::builder().with_log_level(&log).init()?;
	// Compile every module over an empty store
	let schema = modules::schema(MemStore::new()).context("Unable to compile the schema")?;
	println!("{}", schema.sdl());
	Ok(())
}
