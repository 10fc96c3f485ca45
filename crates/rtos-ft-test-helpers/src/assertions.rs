//! Assertion macros for report outcomes.

/// Assert that an expression evaluates to a `Disposition` matching a
/// pattern.
///
/// # Example
///
/// ```rust
/// use rtos_ft::{Disposition, Severity};
/// use rtos_ft_test_helpers::assert_disposition;
///
/// let outcome = Disposition::Unhandled { severity: Severity::Error };
/// assert_disposition!(outcome, Disposition::Unhandled { .. });
/// ```
#[macro_export]
macro_rules! assert_disposition {
    ($outcome:expr, $pattern:pat $(,)?) => {
        let outcome = $outcome;
        if !matches!(outcome, $pattern) {
            panic!(
                "assertion failed: disposition `{:?}` does not match `{}`",
                outcome,
                stringify!($pattern)
            );
        }
    };
}

/// Assert that the log stages a sink recorded equal the expected sequence.
///
/// # Example
///
/// ```rust
/// use rtos_ft::Stage;
/// use rtos_ft_test_helpers::assert_stages;
///
/// let stages = vec![Stage::Dispatch, Stage::Resolved];
/// assert_stages!(stages, [Stage::Dispatch, Stage::Resolved]);
/// ```
#[macro_export]
macro_rules! assert_stages {
    ($stages:expr, [$($stage:expr),* $(,)?]) => {
        let actual: Vec<rtos_ft::Stage> = $stages;
        let expected: Vec<rtos_ft::Stage> = vec![$($stage),*];
        if actual != expected {
            panic!(
                "assertion failed: log stages differ\n  actual: {:?}\nexpected: {:?}",
                actual, expected
            );
        }
    };
}
