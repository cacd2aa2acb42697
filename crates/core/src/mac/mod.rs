/// Lazily parses an environment variable into a specified type. If the
/// environment variable is not set or the parsing fails, it returns the default
/// value.
///
/// # Parameters
/// - `$key`: The environment variable key to look up.
/// - `$t`: The type to which the environment variable value should be parsed.
/// - `$default`: The default value to return if the environment variable is not set or parsing
///   fails.
///
/// # Return Value
/// A lazy static variable of type `std::sync::LazyLock`, which holds the parsed
/// value from the environment variable or the default value.
#[macro_export]
macro_rules! lazy_env_parse {
	// With no default specified
	($key:expr_2021, Option<String>) => {
		std::sync::LazyLock::new(|| std::env::var($key).ok())
	};
	// With a closure for the default value
	($key:expr_2021, $t:ty, || $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_else(|| $default)
		})
	};
	// With a static expression for the default value
	($key:expr_2021, $t:ty, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}

/// Builds a JSON object filter from key-value pairs.
///
/// Keys are anything that converts into a `String`, and values anything
/// `serde_json::Value` can be built from.
#[macro_export]
macro_rules! filter {
	() => {
		$crate::kvs::Filter::new()
	};
	($($k:expr_2021 => $v:expr_2021),+ $(,)?) => {{
		let mut m = $crate::kvs::Filter::new();
		$(m.insert(String::from($k), serde_json::Value::from($v));)+
		m
	}};
}

#[cfg(test)]
mod test {
	use std::sync::LazyLock;

	#[test]
	fn lazy_env_parse_falls_back_to_default() {
		static VALUE: LazyLock<usize> =
			lazy_env_parse!("NEODELIVER_TEST_UNSET_VARIABLE_FOR_MACRO", usize, 42);
		assert_eq!(*VALUE, 42);
	}

	#[test]
	fn filter_builds_object() {
		let f = filter!("name" => "vip", "count" => 3);
		assert_eq!(serde_json::Value::Object(f), serde_json::json!({"name": "vip", "count": 3}));
	}
}
