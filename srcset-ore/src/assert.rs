//! Assertion macros.

/// Panics if the provided `Option` expression is `Some`.
///
/// Used where a map insert must never replace an existing entry, e.g. registering the same
/// config or source set twice.
#[macro_export]
macro_rules! assert_none {
    ($val:expr, $($msg:tt)+) => {{
        if let Some(prev) = &$val {
            panic!("expected None, found Some({prev:?}): {}", format!($($msg)+));
        }
    }};
    ($val:expr) => {{
        if let Some(prev) = &$val {
            panic!("expected None, found Some({prev:?})");
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn none_passes() {
        let val: Option<u8> = None;
        assert_none!(val);
        assert_none!(val, "with a message {}", 42);
    }

    #[test]
    #[should_panic(expected = "found Some(3): duplicate 'srcs'")]
    fn some_panics() {
        let val = Some(3);
        assert_none!(val, "duplicate '{}'", "srcs");
    }
}
