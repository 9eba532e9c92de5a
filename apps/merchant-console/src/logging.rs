//! Console log filtering and subscriber setup.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str =
    "info,merchant_console=debug,merchant_api=debug,merchant_core=debug";

/// Filter variables, most specific first. The first one holding a valid
/// directive set wins; blank or malformed values fall through.
const FILTER_KEYS: [&str; 3] = ["RUST_LOG", "MERCHANT_CONSOLE_LOG", "MERCHANT_LOG"];

/// Install the global subscriber. Output goes to stderr; stdout carries the
/// command's JSON result.
pub fn init() {
    let directives = filter_directives(|key| env::var(key).ok());
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(&directives))
        .try_init();
    tracing::debug!(%directives, "logging initialised");
}

fn filter_directives<F>(lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    FILTER_KEYS
        .into_iter()
        .filter_map(lookup)
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn directives_from_pairs(pairs: &[(&str, &str)]) -> String {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        filter_directives(|key| vars.get(key).cloned())
    }

    #[test]
    fn falls_back_to_default_directives() {
        assert_eq!(directives_from_pairs(&[]), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn rust_log_wins_over_console_variables() {
        let directives = directives_from_pairs(&[
            ("RUST_LOG", "warn"),
            ("MERCHANT_CONSOLE_LOG", "trace"),
            ("MERCHANT_LOG", "error"),
        ]);
        assert_eq!(directives, "warn");
    }

    #[test]
    fn console_variable_wins_over_shared_one() {
        let directives = directives_from_pairs(&[
            ("MERCHANT_CONSOLE_LOG", " merchant_api=trace "),
            ("MERCHANT_LOG", "error"),
        ]);
        assert_eq!(directives, "merchant_api=trace");
    }

    #[test]
    fn blank_and_malformed_values_fall_through() {
        let directives = directives_from_pairs(&[
            ("RUST_LOG", "   "),
            ("MERCHANT_CONSOLE_LOG", "merchant_api=loud"),
            ("MERCHANT_LOG", "debug"),
        ]);
        assert_eq!(directives, "debug");
    }
}
