//! Request envelope and response bodies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RequestError;

/// Top-level request body
#[derive(Debug, Deserialize)]
pub struct Input {
    pub secret_params: SecretParams,
}

#[derive(Debug, Deserialize)]
pub struct SecretParams {
    #[serde(rename = "secret_operation", default)]
    pub action: String,
    #[serde(rename = "store_config")]
    pub config: Option<StoreConfig>,
    pub secret: Option<Secret>,
    pub existing_secret: Option<Secret>,
}

impl SecretParams {
    pub fn require_config(&self) -> Result<&StoreConfig, RequestError> {
        self.config.as_ref().ok_or(RequestError::MissingConfig)
    }

    pub fn require_secret(&self) -> Result<&Secret, RequestError> {
        self.secret
            .as_ref()
            .ok_or(RequestError::MissingField("secret"))
    }

    pub fn require_existing_secret(&self) -> Result<&Secret, RequestError> {
        self.existing_secret
            .as_ref()
            .ok_or(RequestError::MissingField("existing_secret"))
    }
}

/// Connection settings for the secret store
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(rename = "assume_iam_role")]
    pub assume_iam_role_on_runner: bool,
    #[serde(rename = "assume_sts_role")]
    pub assume_sts_role_on_runner: bool,
    pub assume_sts_role_duration: i64,
    pub role_arn: String,
    pub external_name: String,
    pub prefix: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("region", &self.region)
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("assume_iam_role_on_runner", &self.assume_iam_role_on_runner)
            .field("assume_sts_role_on_runner", &self.assume_sts_role_on_runner)
            .field("assume_sts_role_duration", &self.assume_sts_role_duration)
            .field("role_arn", &self.role_arn)
            .field("external_name", &self.external_name)
            .field("prefix", &self.prefix)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "***"
    }
}

/// A secret as addressed by the caller
///
/// `name` may carry a `#key.path` suffix on read paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub plaintext: Option<String>,
    #[serde(default)]
    pub base64: bool,
}

impl Secret {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_plaintext(mut self, plaintext: impl Into<String>) -> Self {
        self.plaintext = Some(plaintext.into());
        self
    }
}

/// Action requested in `secret_operation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretOperation {
    Connect,
    ValidateReference,
    Fetch,
    Create,
    Update,
    Rename,
    Delete,
}

impl SecretOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::ValidateReference => "validate_ref",
            Self::Fetch => "fetch",
            Self::Create => "create",
            Self::Update => "update",
            Self::Rename => "rename",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for SecretOperation {
    type Err = RequestError;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "connect" => Ok(Self::Connect),
            "validate_ref" => Ok(Self::ValidateReference),
            "fetch" => Ok(Self::Fetch),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "rename" => Ok(Self::Rename),
            "delete" => Ok(Self::Delete),
            other => Err(RequestError::InvalidAction(other.to_string())),
        }
    }
}

/// Structured error embedded in a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub error: Option<ErrorDetail>,
}

impl ValidationResponse {
    pub fn valid() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: ErrorDetail) -> Self {
        Self {
            valid: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResponse {
    pub name: String,
    pub message: String,
    pub error: Option<ErrorDetail>,
    pub status: OperationStatus,
}

impl OperationResponse {
    pub fn success(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            error: None,
            status: OperationStatus::Success,
        }
    }

    pub fn failure(name: impl Into<String>, error: ErrorDetail) -> Self {
        Self {
            name: name.into(),
            message: error.message.clone(),
            error: Some(error),
            status: OperationStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }
}

/// Result of a fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretResponse {
    pub value: String,
}

/// Request-level failure body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error: impl ToString, status: u16) -> Self {
        Self {
            message: message.into(),
            error: error.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_envelope() {
        let body = json!({
            "secret_params": {
                "secret_operation": "RENAME",
                "store_config": {
                    "region": "eu-west-1",
                    "access_key": "AKIA",
                    "secret_key": "shh",
                    "assume_sts_role": true,
                    "assume_sts_role_duration": 900,
                    "role_arn": "arn:aws:iam::123456789012:role/reader",
                    "external_name": "ext",
                    "prefix": "team"
                },
                "secret": { "name": "new", "plaintext": "v" },
                "existing_secret": { "name": "old" }
            }
        });

        let input: Input = serde_json::from_value(body).unwrap();
        let params = input.secret_params;
        assert_eq!(params.action.parse::<SecretOperation>().unwrap(), SecretOperation::Rename);

        let config = params.require_config().unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert!(config.assume_sts_role_on_runner);
        assert!(!config.assume_iam_role_on_runner);
        assert_eq!(config.assume_sts_role_duration, 900);
        assert_eq!(config.prefix, "team");

        assert_eq!(params.require_secret().unwrap().plaintext.as_deref(), Some("v"));
        let existing = params.require_existing_secret().unwrap();
        assert_eq!(existing.name, "old");
        assert!(existing.plaintext.is_none());
        assert!(!existing.base64);
    }

    #[test]
    fn test_missing_optional_sections() {
        let input: Input =
            serde_json::from_value(json!({"secret_params": {"secret_operation": "fetch"}})).unwrap();
        assert!(matches!(
            input.secret_params.require_config(),
            Err(RequestError::MissingConfig)
        ));
        assert!(matches!(
            input.secret_params.require_secret(),
            Err(RequestError::MissingField("secret"))
        ));
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!("Validate_Ref".parse::<SecretOperation>().unwrap(), SecretOperation::ValidateReference);
        assert_eq!("delete".parse::<SecretOperation>().unwrap(), SecretOperation::Delete);
        assert!(matches!(
            "list".parse::<SecretOperation>(),
            Err(RequestError::InvalidAction(a)) if a == "list"
        ));
    }

    #[test]
    fn test_store_config_debug_redacts_keys() {
        let config = StoreConfig {
            access_key: "AKIAEXAMPLE".to_string(),
            secret_key: "topsecret".to_string(),
            ..StoreConfig::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("topsecret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_operation_response_shape() {
        let response = OperationResponse::success("mysecret", "Successfully deleted secret in AWS Secret Manager");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["name"], "mysecret");
        assert_eq!(value["status"], "SUCCESS");
        assert!(value["error"].is_null());

        let failure = OperationResponse::failure(
            "mysecret",
            ErrorDetail {
                error_type: "InvalidRequestException".to_string(),
                message: "Failed to delete secret in AWS Secret Manager".to_string(),
                reason: "scheduled for deletion".to_string(),
            },
        );
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["status"], "FAILURE");
        assert_eq!(value["error"]["type"], "InvalidRequestException");
        assert_eq!(value["message"], "Failed to delete secret in AWS Secret Manager");
    }

    #[test]
    fn test_validation_response_shape() {
        let value = serde_json::to_value(ValidationResponse::valid()).unwrap();
        assert_eq!(value, json!({"valid": true, "error": null}));
    }
}
