//! Tests for error classification and display.

use std::time::Duration;

use nutrigate::{NutrigateError, ProviderKind};

#[test]
fn transient_classification() {
    assert!(NutrigateError::Http("reset".into()).is_transient());
    assert!(NutrigateError::Timeout(Duration::from_secs(30)).is_transient());
    assert!(NutrigateError::RateLimited { retry_after: None }.is_transient());
    assert!(
        NutrigateError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient()
    );
    assert!(
        NutrigateError::Api {
            status: 408,
            message: "timeout".into()
        }
        .is_transient()
    );

    assert!(
        !NutrigateError::Api {
            status: 400,
            message: "bad".into()
        }
        .is_transient()
    );
    assert!(!NutrigateError::AuthenticationFailed.is_transient());
    assert!(!NutrigateError::Cancelled.is_transient());
    assert!(!NutrigateError::InvalidInput("empty".into()).is_transient());
}

#[test]
fn retry_after_only_from_rate_limits() {
    let hint = Duration::from_secs(7);
    assert_eq!(
        NutrigateError::RateLimited {
            retry_after: Some(hint)
        }
        .retry_after(),
        Some(hint)
    );
    assert_eq!(NutrigateError::Http("x".into()).retry_after(), None);
}

#[test]
fn all_providers_failed_reports_last_error() {
    let err = NutrigateError::AllProvidersFailed {
        attempts: 5,
        last: Box::new(NutrigateError::Timeout(Duration::from_secs(25))),
    };
    assert_eq!(
        err.to_string(),
        "all providers failed after 5 attempts: provider call timed out after 25s"
    );
}

#[test]
fn provider_not_registered_names_the_provider() {
    let err = NutrigateError::ProviderNotRegistered(ProviderKind::Gemini);
    assert_eq!(err.to_string(), "provider not registered: gemini");
}

#[test]
fn json_errors_convert() {
    let err: NutrigateError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, NutrigateError::Json(_)));
}
