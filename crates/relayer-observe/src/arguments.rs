//! Small helpers shared by every crate's `clap::Parser` arguments struct.

use std::{fmt::Display, time::Duration};

/// `clap` value parser for a duration given in whole seconds on the command
/// line or in an env var.
pub fn duration_from_seconds(s: &str) -> Result<Duration, std::num::ParseFloatError> {
    Ok(Duration::from_secs_f64(s.parse()?))
}

/// Writes `name: value` if `value` is `Some`, and `name: None` otherwise -
/// the common case for an `Option<T>` field in a hand-written `Display` impl.
pub fn display_option(f: &mut std::fmt::Formatter<'_>, name: &str, value: &Option<impl Display>) -> std::fmt::Result {
    match value {
        Some(value) => writeln!(f, "{name}: {value}"),
        None => writeln!(f, "{name}: None"),
    }
}

/// Writes a `Vec<T>` as a comma-separated list, for fields populated with
/// `use_value_delimiter = true`.
pub fn display_list(f: &mut std::fmt::Formatter<'_>, name: &str, values: &[impl Display]) -> std::fmt::Result {
    let joined = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
    writeln!(f, "{name}: [{joined}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_seconds_parses_fractional_values() {
        assert_eq!(duration_from_seconds("1.5").unwrap(), Duration::from_millis(1_500));
    }

    #[test]
    fn duration_from_seconds_rejects_non_numeric_input() {
        assert!(duration_from_seconds("soon").is_err());
    }
}
