/*!
 * Tests for error types and conversions
 */

use eventdesk::errors::{AppError, ProviderError, RecordError, ReportError};
use eventdesk::providers::error_for_status;

#[test]
fn test_providerError_apiError_shouldDisplayStatusAndMessage() {
    let error = ProviderError::ApiError {
        status_code: 502,
        message: "Bad gateway".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("502"));
    assert!(display.contains("Bad gateway"));
}

#[test]
fn test_errorForStatus_shouldClassifyStatusCodes() {
    assert!(matches!(
        error_for_status("OpenAI", 401, "bad key".to_string()),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        error_for_status("OpenAI", 403, String::new()),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        error_for_status("OpenAI", 429, String::new()),
        ProviderError::RateLimitExceeded(_)
    ));
    assert!(matches!(
        error_for_status("OpenAI", 400, String::new()),
        ProviderError::ApiError { status_code: 400, .. }
    ));
}

#[test]
fn test_providerError_retryable_shouldSkipClientErrors() {
    assert!(ProviderError::RateLimitExceeded("slow down".to_string()).is_retryable());
    assert!(ProviderError::ConnectionError("reset".to_string()).is_retryable());
    assert!(!ProviderError::AuthenticationError("nope".to_string()).is_retryable());
    assert!(
        !ProviderError::ApiError {
            status_code: 404,
            message: String::new(),
        }
        .is_retryable()
    );
    assert!(!ProviderError::EmptyResponse.is_retryable());
}

#[test]
fn test_recordError_notFound_shouldNameEntity() {
    let error = RecordError::not_found("supplier", "ghost");
    assert_eq!(error.to_string(), "supplier not found: ghost");
}

#[test]
fn test_reportError_fromAnyhow_shouldRecoverTypedErrors() {
    let record: anyhow::Error = RecordError::not_found("event", 7).into();
    assert!(matches!(
        ReportError::from(record),
        ReportError::Record(RecordError::NotFound { entity: "event", .. })
    ));

    let provider: anyhow::Error = ProviderError::EmptyResponse.into();
    assert!(matches!(
        ReportError::from(provider),
        ReportError::Provider(ProviderError::EmptyResponse)
    ));

    let other = anyhow::anyhow!("disk full");
    assert!(matches!(ReportError::from(other), ReportError::Storage(_)));
}

#[test]
fn test_appError_fromIoError_shouldBeFileError() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.docx");
    let error = AppError::from(io);
    assert!(matches!(error, AppError::File(_)));
    assert!(error.to_string().contains("missing.docx"));
}
