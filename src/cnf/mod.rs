use std::sync::LazyLock;
use std::time::Duration;

use neodeliver_core::lazy_env_parse;

pub const LOGO: &str = "
                        _      _ _
 _ __   ___  ___   __| | ___| (_)_   _____ _ __
| '_ \\ / _ \\/ _ \\ / _` |/ _ \\ | \\ \\ / / _ \\ '__|
| | | |  __/ (_) | (_| |  __/ | |\\ V /  __/ |
|_| |_|\\___|\\___/ \\__,_|\\___|_|_| \\_/ \\___|_|

";

/// The publicly visible name of the server
pub const PKG_NAME: &str = "neodeliver";

/// The version identifier of this build
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The path the GraphQL endpoint and the exploration page are served on
pub const GRAPHQL_ENDPOINT: &str = "/";

/// The address the server listens on, when none is given
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// How long a request may run before every pending field is cancelled
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// The header carrying the id of a request
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// What is the maximum size of an HTTP request body (defaults to 4 MiB)
pub static HTTP_MAX_BODY_SIZE: LazyLock<usize> =
	lazy_env_parse!("NEODELIVER_HTTP_MAX_BODY_SIZE", usize, 4 << 20);

/// What is the runtime thread memory stack size (defaults to 10MiB)
pub static RUNTIME_STACK_SIZE: LazyLock<usize> =
	lazy_env_parse!("NEODELIVER_RUNTIME_STACK_SIZE", usize, 10 * 1024 * 1024);

/// How many threads which can be started for blocking operations (defaults to 512)
pub static RUNTIME_MAX_BLOCKING_THREADS: LazyLock<usize> =
	lazy_env_parse!("NEODELIVER_RUNTIME_MAX_BLOCKING_THREADS", usize, 512);
