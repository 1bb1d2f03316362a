//! Property-based tests for rust-common crate.

use proptest::prelude::*;
use rust_common::PlatformError;

fn build(kind: usize, detail: String) -> PlatformError {
    match kind {
        0 => PlatformError::NotFound(detail),
        1 => PlatformError::AccessDenied(detail),
        2 => PlatformError::Unavailable(detail),
        3 => PlatformError::Throttled(detail),
        4 => PlatformError::Timeout(detail),
        5 => PlatformError::Internal(detail),
        _ => PlatformError::Cancelled,
    }
}

// Property: Only transient store failures are retryable
// *For any* platform error, it is retryable exactly when it is an outage,
// a throttle or a timeout.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_retry_classification(
        kind in 0usize..7,
        detail in "[a-zA-Z0-9 ]{1,50}",
    ) {
        let err = build(kind, detail);
        let transient = matches!(
            err,
            PlatformError::Unavailable(_) | PlatformError::Throttled(_) | PlatformError::Timeout(_)
        );
        prop_assert_eq!(err.is_retryable(), transient, "{:?}", err);
        prop_assert_eq!(err.is_not_found(), matches!(err, PlatformError::NotFound(_)));
    }

    #[test]
    fn prop_not_found_names_resource(resource in "[a-z0-9/._-]{1,40}") {
        let err = PlatformError::not_found(resource.clone());
        prop_assert!(err.to_string().contains(&resource));
    }
}
