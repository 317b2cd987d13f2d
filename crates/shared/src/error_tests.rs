use super::*;
use rstest::rstest;

#[rstest]
#[case(AppError::Unauthorized("bad hmac".into()), 401, "UNAUTHORIZED")]
#[case(AppError::Forbidden("not admin".into()), 403, "FORBIDDEN")]
#[case(AppError::NotFound("deposit".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("amount".into()), 400, "VALIDATION_ERROR")]
#[case(AppError::BusinessRule("funds".into()), 422, "BUSINESS_RULE_VIOLATION")]
#[case(AppError::Conflict("retries".into()), 409, "CONFLICT")]
#[case(AppError::StorageUnavailable("db".into()), 503, "STORAGE_UNAVAILABLE")]
#[case(AppError::ExternalService("gateway".into()), 502, "EXTERNAL_SERVICE_ERROR")]
#[case(AppError::Internal("boom".into()), 500, "INTERNAL_ERROR")]
fn test_status_and_code(#[case] error: AppError, #[case] status: u16, #[case] code: &str) {
    assert_eq!(error.status_code(), status);
    assert_eq!(error.error_code(), code);
}

#[test]
fn test_error_display() {
    assert_eq!(
        AppError::Unauthorized("bad signature".into()).to_string(),
        "Authentication failed: bad signature"
    );
    assert_eq!(
        AppError::StorageUnavailable("pool timed out".into()).to_string(),
        "Storage unavailable: pool timed out"
    );
    assert_eq!(
        AppError::Conflict("msg".into()).to_string(),
        "Conflict: msg"
    );
}
