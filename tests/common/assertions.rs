//! Custom assertion utilities for tests.

/// Assert that a result is Ok and return the inner value.
///
/// Provides a better error message than `.unwrap()` by including context.
#[allow(dead_code)]
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{} failed: {:?}", context, e),
    }
}

/// Assert that an error's full context chain contains `expected_text`.
#[allow(dead_code)]
pub fn assert_error_contains(error: &anyhow::Error, expected_text: &str) {
    let message = format!("{:#}", error);
    assert!(
        message.contains(expected_text),
        "error should contain '{}' but was: {}",
        expected_text,
        message
    );
}

/// Assert that a report list holds exactly `expected`, in order.
#[allow(dead_code)]
pub fn assert_ids(actual: &[String], expected: &[&str]) {
    let actual: Vec<&str> = actual.iter().map(String::as_str).collect();
    assert_eq!(actual, expected);
}
