//! Store error classification
//!
//! DynamoDB error codes map onto a closed taxonomy. Each known code is either
//! safe to retry with back-off or must be fixed before the load is re-run, and
//! carries the remediation text shown to operators. Codes outside the table are
//! reported as [`UnknownErrorCode`] so the table can be extended on purpose.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::store::StoreError;

/// How an operator should react to a store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Re-running the load after a delay is expected to succeed
    RetrySafe,
    /// Configuration, permissions or input must change first
    FixBeforeRetry,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::RetrySafe => "retry-safe",
            ErrorClass::FixBeforeRetry => "fix-before-retry",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The store error codes this loader knows how to explain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    ConditionalCheckFailed,
    TransactionConflict,
    ItemCollectionSizeLimitExceeded,
    AccessDenied,
    InternalServerError,
    ProvisionedThroughputExceeded,
    ResourceNotFound,
    ServiceUnavailable,
    Throttling,
    UnrecognizedClient,
    Validation,
    RequestLimitExceeded,
}

impl StoreErrorCode {
    pub const ALL: [StoreErrorCode; 12] = [
        StoreErrorCode::ConditionalCheckFailed,
        StoreErrorCode::TransactionConflict,
        StoreErrorCode::ItemCollectionSizeLimitExceeded,
        StoreErrorCode::AccessDenied,
        StoreErrorCode::InternalServerError,
        StoreErrorCode::ProvisionedThroughputExceeded,
        StoreErrorCode::ResourceNotFound,
        StoreErrorCode::ServiceUnavailable,
        StoreErrorCode::Throttling,
        StoreErrorCode::UnrecognizedClient,
        StoreErrorCode::Validation,
        StoreErrorCode::RequestLimitExceeded,
    ];

    /// Code as reported by the service
    pub fn as_str(self) -> &'static str {
        match self {
            StoreErrorCode::ConditionalCheckFailed => "ConditionalCheckFailedException",
            StoreErrorCode::TransactionConflict => "TransactionConflictException",
            StoreErrorCode::ItemCollectionSizeLimitExceeded => {
                "ItemCollectionSizeLimitExceededException"
            },
            StoreErrorCode::AccessDenied => "AccessDeniedException",
            StoreErrorCode::InternalServerError => "InternalServerError",
            StoreErrorCode::ProvisionedThroughputExceeded => {
                "ProvisionedThroughputExceededException"
            },
            StoreErrorCode::ResourceNotFound => "ResourceNotFoundException",
            StoreErrorCode::ServiceUnavailable => "ServiceUnavailable",
            StoreErrorCode::Throttling => "ThrottlingException",
            StoreErrorCode::UnrecognizedClient => "UnrecognizedClientException",
            StoreErrorCode::Validation => "ValidationException",
            StoreErrorCode::RequestLimitExceeded => "RequestLimitExceeded",
        }
    }

    pub fn class(self) -> ErrorClass {
        match self {
            StoreErrorCode::InternalServerError
            | StoreErrorCode::Throttling
            | StoreErrorCode::ProvisionedThroughputExceeded
            | StoreErrorCode::ServiceUnavailable
            | StoreErrorCode::RequestLimitExceeded
            | StoreErrorCode::TransactionConflict => ErrorClass::RetrySafe,
            StoreErrorCode::Validation
            | StoreErrorCode::UnrecognizedClient
            | StoreErrorCode::ResourceNotFound
            | StoreErrorCode::AccessDenied
            | StoreErrorCode::ItemCollectionSizeLimitExceeded
            | StoreErrorCode::ConditionalCheckFailed => ErrorClass::FixBeforeRetry,
        }
    }

    /// Operator-facing remediation text, reproduced verbatim in reports
    pub fn remediation(self) -> &'static str {
        match self {
            StoreErrorCode::ConditionalCheckFailed => {
                "Condition check specified in the operation failed, review and update the condition check before retrying"
            },
            StoreErrorCode::TransactionConflict => {
                "Operation was rejected because there is an ongoing transaction for the given, generally safe to retry with exponential back-off"
            },
            StoreErrorCode::ItemCollectionSizeLimitExceeded => {
                "A given collection is too large, you're using Local Secondary Index and exceeded size limit of items per partition key. Consider using Global Secondary Index instead"
            },
            StoreErrorCode::AccessDenied => "Configure identity based access before retrying",
            StoreErrorCode::InternalServerError => {
                "Internal Server Error, generally safe to retry with exponential back-off"
            },
            StoreErrorCode::ProvisionedThroughputExceeded => {
                "Request rate is too high. If you're using a custom retry strategy make sure to retry with exponential back-off. Otherwise consider reducing frequency of requests or increasing provisioned capacity for your table or secondary index"
            },
            StoreErrorCode::ResourceNotFound => {
                "One of the tables was not found, verify table exists before retrying"
            },
            StoreErrorCode::ServiceUnavailable => {
                "Had trouble reaching DynamoDB. generally safe to retry with exponential back-off"
            },
            StoreErrorCode::Throttling => {
                "Request denied due to throttling, generally safe to retry with exponential back-off"
            },
            StoreErrorCode::UnrecognizedClient => {
                "The request signature is incorrect most likely due to an invalid AWS access key ID or secret key, fix before retrying"
            },
            StoreErrorCode::Validation => {
                "The input fails to satisfy the constraints specified by DynamoDB, fix input before retrying"
            },
            StoreErrorCode::RequestLimitExceeded => {
                "Throughput exceeds the current throughput limit for your account, increase account level throughput before retrying"
            },
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code outside the known taxonomy
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized store error code '{0}', no remediation is known")]
pub struct UnknownErrorCode(pub String);

impl FromStr for StoreErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}

/// Outcome of classifying a store error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub code: StoreErrorCode,
    pub class: ErrorClass,
    pub remediation: &'static str,
}

impl Classification {
    pub fn is_retry_safe(&self) -> bool {
        self.class == ErrorClass::RetrySafe
    }
}

impl From<StoreErrorCode> for Classification {
    fn from(code: StoreErrorCode) -> Self {
        Self {
            code,
            class: code.class(),
            remediation: code.remediation(),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.code, self.remediation, self.class)
    }
}

/// Classify a store error by its code
pub fn classify(error: &StoreError) -> Result<Classification, UnknownErrorCode> {
    error.code.parse::<StoreErrorCode>().map(Classification::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn store_error(code: &str) -> StoreError {
        StoreError::new(code, "simulated")
    }

    #[test]
    fn test_retry_safe_codes() {
        for code in [
            "InternalServerError",
            "ThrottlingException",
            "ProvisionedThroughputExceededException",
            "ServiceUnavailable",
            "RequestLimitExceeded",
            "TransactionConflictException",
        ] {
            let classification = classify(&store_error(code)).unwrap();
            assert_eq!(classification.class, ErrorClass::RetrySafe, "{code}");
            assert!(classification.is_retry_safe());
        }
    }

    #[test]
    fn test_fix_before_retry_codes() {
        for code in [
            "ValidationException",
            "UnrecognizedClientException",
            "ResourceNotFoundException",
            "AccessDeniedException",
            "ItemCollectionSizeLimitExceededException",
            "ConditionalCheckFailedException",
        ] {
            let classification = classify(&store_error(code)).unwrap();
            assert_eq!(classification.class, ErrorClass::FixBeforeRetry, "{code}");
        }
    }

    #[test]
    fn test_throttling_remediation() {
        let classification = classify(&store_error("ThrottlingException")).unwrap();
        assert_eq!(classification.code, StoreErrorCode::Throttling);
        assert_eq!(
            classification.remediation,
            "Request denied due to throttling, generally safe to retry with exponential back-off"
        );
        assert!(classification.to_string().starts_with("[ThrottlingException] Request denied"));
    }

    #[test]
    fn test_unknown_code_fails_distinctly() {
        let err = classify(&store_error("DispatchFailure")).unwrap_err();
        assert_eq!(err, UnknownErrorCode("DispatchFailure".to_string()));
        assert!(err.to_string().contains("DispatchFailure"));
    }

    #[test]
    fn test_code_match_is_exact() {
        assert!(classify(&store_error("throttlingexception")).is_err());
        assert!(classify(&store_error("com.amazonaws.dynamodb.v20120810#ThrottlingException")).is_err());
        assert!(classify(&store_error("")).is_err());
    }

    #[test]
    fn test_every_code_round_trips_and_has_remediation() {
        for code in StoreErrorCode::ALL {
            assert_eq!(code.as_str().parse::<StoreErrorCode>().unwrap(), code);
            assert!(!code.remediation().is_empty());
        }
    }
}
