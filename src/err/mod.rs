use std::io::Error as IoError;

use neodeliver_core::gql::GqlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("The schema could not be compiled: {0}")]
	Schema(#[from] GqlError),

	#[error("There was a problem with the network: {0}")]
	Io(#[from] IoError),

	#[error("Unable to set up the logger: {0}")]
	Logger(String),
}
