//! Environment variable parsing helpers shared by service configs.

use std::str::FromStr;

/// Parse an environment variable, falling back to `default` when it is
/// missing or does not parse.
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read a string variable, treating an empty value as missing.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a boolean flag. Accepts `1`, `true`, `yes` and `on` in any case.
pub fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn parse_with_default_falls_back_on_garbage() {
        std::env::set_var("DB_POOL_TEST_NUM", "not-a-number");
        let value: u32 = parse_env_with_default("DB_POOL_TEST_NUM", 7);
        assert_eq!(value, 7);

        std::env::set_var("DB_POOL_TEST_NUM", "12");
        let value: u32 = parse_env_with_default("DB_POOL_TEST_NUM", 7);
        assert_eq!(value, 12);
        std::env::remove_var("DB_POOL_TEST_NUM");
    }

    #[test]
    #[serial_test::serial]
    fn empty_values_are_missing() {
        std::env::set_var("DB_POOL_TEST_STR", "   ");
        assert_eq!(env_non_empty("DB_POOL_TEST_STR"), None);
        std::env::remove_var("DB_POOL_TEST_STR");
    }

    #[test]
    #[serial_test::serial]
    fn flags() {
        std::env::set_var("DB_POOL_TEST_FLAG", "TRUE");
        assert!(env_flag("DB_POOL_TEST_FLAG", false));
        std::env::set_var("DB_POOL_TEST_FLAG", "off");
        assert!(!env_flag("DB_POOL_TEST_FLAG", true));
        std::env::remove_var("DB_POOL_TEST_FLAG");
        assert!(env_flag("DB_POOL_TEST_FLAG", true));
    }
}
