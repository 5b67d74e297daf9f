//! Store error types and the error classifier

use thiserror::Error;

/// Label returned when an error carries no recognizable code
pub const UNKNOWN_ERROR: &str = "UnknownError";

/// Secrets Manager exception kinds the classifier knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    DecryptionFailure,
    InternalServiceError,
    InvalidParameterException,
    InvalidRequestException,
    ResourceNotFoundException,
    LimitExceededException,
    EncryptionFailure,
    ResourceExistsException,
    MalformedPolicyDocumentException,
    PreconditionNotMetException,
}

impl ErrorCode {
    /// Classification order, evaluated top to bottom
    pub const KNOWN: [ErrorCode; 10] = [
        Self::DecryptionFailure,
        Self::InternalServiceError,
        Self::InvalidParameterException,
        Self::InvalidRequestException,
        Self::ResourceNotFoundException,
        Self::LimitExceededException,
        Self::EncryptionFailure,
        Self::ResourceExistsException,
        Self::MalformedPolicyDocumentException,
        Self::PreconditionNotMetException,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecryptionFailure => "DecryptionFailure",
            Self::InternalServiceError => "InternalServiceError",
            Self::InvalidParameterException => "InvalidParameterException",
            Self::InvalidRequestException => "InvalidRequestException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::LimitExceededException => "LimitExceededException",
            Self::EncryptionFailure => "EncryptionFailure",
            Self::ResourceExistsException => "ResourceExistsException",
            Self::MalformedPolicyDocumentException => "MalformedPolicyDocumentException",
            Self::PreconditionNotMetException => "PreconditionNotMetException",
        }
    }
}

/// Error returned by a secret store call
///
/// `code` is the service error code when the failure came back from the
/// service; transport, timeout and credential failures have none.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct StoreError {
    code: Option<String>,
    reason: String,
}

impl StoreError {
    pub fn new(code: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Error carrying one of the known service codes
    pub fn with_code(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self::new(Some(code.as_str().to_string()), reason)
    }

    /// Error without a service code (dispatch failures, missing values)
    pub fn uncoded(reason: impl Into<String>) -> Self {
        Self::new(None, reason)
    }

    pub fn not_found(name: &str) -> Self {
        Self::with_code(
            ErrorCode::ResourceNotFoundException,
            format!("Secrets Manager can't find the specified secret: {}", name),
        )
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code.as_deref() == Some(code.as_str())
    }

    /// The secret does not exist. Used for control flow; the classifier
    /// label is never consulted for this.
    pub fn is_not_found(&self) -> bool {
        self.is(ErrorCode::ResourceNotFoundException)
    }
}

/// Map a store error to a coarse diagnostic label
pub fn classify(error: &StoreError) -> String {
    ErrorCode::KNOWN
        .iter()
        .find(|code| error.is(**code))
        .map(|code| code.as_str().to_string())
        .or_else(|| error.code().map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Base64 decoding of a fetched secret failed
#[derive(Debug, Error)]
#[error("error occurred when decoding base64 secret: {name}. Failed with error {source}")]
pub struct DecodeError {
    pub name: String,
    #[source]
    pub source: base64::DecodeError,
}

/// Request-level failures, reported before any operation runs
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("empty config")]
    MissingConfig,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid action")]
    InvalidAction(String),
}

impl RequestError {
    /// Human message for the error envelope
    pub fn message(&self) -> String {
        match self {
            Self::Decode(_) | Self::MissingField(_) => "Failed to decode request body".to_string(),
            Self::MissingConfig => "Configuration is missing".to_string(),
            Self::InvalidAction(action) => {
                format!("The specified action {} is not supported", action)
            }
        }
    }
}
