use std::env;

use log::warn;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads a boolean flag from the environment variable `name`.
pub fn env_flag(name: &str, default: bool) -> bool {
    parse_boolean_flag(env::var(name).ok(), default)
}

/// Reads a positive integer from the environment variable `name`. Unset, unparseable and zero values fall back to
/// `default`. Invalid values are logged.
pub fn env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(s) => match s.trim().parse::<u64>() {
            Ok(0) => {
                warn!("🪛️ {name} must be greater than zero. Using the default, {default}, instead.");
                default
            },
            Ok(v) => v,
            Err(e) => {
                warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
                default
            },
        },
        Err(_) => default,
    }
}
