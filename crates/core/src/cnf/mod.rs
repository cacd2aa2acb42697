use std::sync::LazyLock;
use std::time::Duration;

/// The publicly visible name of the server
pub const SERVER_NAME: &str = "Neodeliver";

/// The name of the root query object in the compiled schema
pub const QUERY_ROOT: &str = "RootQuery";

/// The name of the root mutation object in the compiled schema
pub const MUTATION_ROOT: &str = "RootMutation";

/// Number of implied fractional digits carried by a decimal value.
pub const DECIMAL_PRECISION: u32 = 8;

/// The largest power of ten a decimal may be scaled by, both when parsing
/// scientific notation and when raising to a power.
pub const MAX_DECIMAL_EXPONENT: u32 = 1000;

/// The default page size applied to list queries when `first` is not given.
pub static DEFAULT_PAGE_SIZE: LazyLock<i64> =
	lazy_env_parse!("NEODELIVER_DEFAULT_PAGE_SIZE", i64, 10);

/// How long, in milliseconds, the fault reporter may take to flush before a
/// fault is re-raised.
pub static FAULT_FLUSH_TIMEOUT_MS: LazyLock<u64> =
	lazy_env_parse!("NEODELIVER_FAULT_FLUSH_TIMEOUT_MS", u64, 1000);

/// The flush timeout as a [`Duration`].
pub fn fault_flush_timeout() -> Duration {
	Duration::from_millis(*FAULT_FLUSH_TIMEOUT_MS)
}
