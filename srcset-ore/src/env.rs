//! Environment variable helpers.

use std::ffi::OsStr;

/// Values that we treat as "off" when a variable is used as a flag, compared case-insensitively.
static FALSEY: &[&str] = &["", "0", "no", "off", "false"];

/// Interpret a raw flag value.
pub fn parse_truthy(value: &OsStr) -> bool {
    let mut value = value.to_os_string();
    value.make_ascii_lowercase();
    !FALSEY.iter().any(|falsey| value == *falsey)
}

/// Build the environment variable name used to override a config named `name`.
///
/// `env_key("SRCSET", "follow_symlinks") == "SRCSET_FOLLOW_SYMLINKS"`.
pub fn env_key(prefix: &str, name: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + name.len() + 1);
    key.push_str(prefix);
    key.push('_');
    for c in name.chars() {
        match c {
            '-' | '.' => key.push('_'),
            c => key.push(c.to_ascii_uppercase()),
        }
    }
    key
}
