//! Unified error interface for Weir crates.
//!
//! Every error type in the workspace implements [`ErrorCode`], giving
//! callers a stable machine-readable code and a recoverability hint
//! without matching on concrete variants across crate boundaries.
//!
//! # Code convention
//!
//! - UPPER_SNAKE_CASE, prefixed with the owning domain:
//!   `GRAPH_DUPLICATE_NODE`, `PORT_NOT_ADDRESSABLE`, `NETWORK_UNKNOWN_NODE`.
//! - Stable once published; changing a code is a breaking change.
//!
//! Each crate's error tests call [`assert_error_codes`] over every variant
//! so a typo in a code fails in CI rather than in a consumer's match arm.
//!
//! # Example
//!
//! ```
//! use weir_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum WireError {
//!     PeerGone,
//!     BadFrame,
//! }
//!
//! impl ErrorCode for WireError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::PeerGone => "WIRE_PEER_GONE",
//!             Self::BadFrame => "WIRE_BAD_FRAME",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         // A peer may come back; a malformed frame never parses.
//!         matches!(self, Self::PeerGone)
//!     }
//! }
//!
//! assert_eq!(WireError::PeerGone.code(), "WIRE_PEER_GONE");
//! assert!(WireError::PeerGone.is_recoverable());
//! ```

/// Machine-readable error classification.
///
/// Recoverable means a retry or a corrective action by the caller may
/// succeed (a component not yet ready, a transient lifecycle failure).
/// Non-recoverable means the request itself is wrong (unknown node,
/// missing port) and retrying cannot help.
pub trait ErrorCode {
    /// Returns the stable error code for this value.
    fn code(&self) -> &'static str;

    /// Returns whether retrying or corrective action may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error's code follows the workspace convention.
///
/// Checks that the code is non-empty UPPER_SNAKE_CASE and carries the
/// expected domain prefix.
///
/// # Panics
///
/// Panics with a descriptive message on any violation. Intended for use
/// inside tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'",
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE",
    );
}

/// Asserts the convention over every variant of an error enum.
///
/// # Example
///
/// ```
/// use weir_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
///
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "E_A",
///             Self::B => "E_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "E_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Flaky => "TEST_FLAKY",
                Self::Fatal => "TEST_FATAL",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Flaky)
        }
    }

    #[test]
    fn codes_and_recoverability() {
        assert_eq!(TestError::Flaky.code(), "TEST_FLAKY");
        assert!(TestError::Flaky.is_recoverable());
        assert!(!TestError::Fatal.is_recoverable());
    }

    #[test]
    fn accepts_valid_codes() {
        assert_error_codes(&[TestError::Flaky, TestError::Fatal], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn rejects_wrong_prefix() {
        assert_error_code(&TestError::Flaky, "OTHER_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("NETWORK_UNKNOWN_NODE"));
        assert!(is_upper_snake_case("PORT_2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("lower"));
        assert!(!is_upper_snake_case("Mixed_Case"));
        assert!(!is_upper_snake_case("_LEADING"));
        assert!(!is_upper_snake_case("TRAILING_"));
        assert!(!is_upper_snake_case("DOUBLE__UNDERSCORE"));
    }
}
