//! Secrets Manager client construction
//!
//! Turns a [`StoreConfig`] into an authenticated SDK client. Three credential
//! strategies are supported, checked in this order:
//! - ambient credentials when `assume_iam_role` is set (instance or task role)
//! - STS `AssumeRole` when `assume_sts_role` is set
//! - a static access/secret key pair otherwise

use std::time::SystemTime;

use aws_config::{retry::RetryConfig, BehaviorVersion, ConfigLoader};
use aws_sdk_secretsmanager::config::{Credentials, Region};
use aws_sdk_secretsmanager::Client;
use aws_sdk_sts::error::DisplayErrorContext;
use secretgate_core::StoreConfig;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Region used when the store config leaves it blank
pub const DEFAULT_REGION: &str = "us-east-1";

const STATIC_PROVIDER: &str = "secretgate-static";
const STS_PROVIDER: &str = "secretgate-sts";

/// Client construction errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("AccessKey not provided")]
    MissingAccessKey,

    #[error("SecretKey not provided")]
    MissingSecretKey,

    #[error("RoleARN must be provided for STS role assumption")]
    MissingRoleArn,

    #[error("failed to get STS credentials: failed to assume role: {0}")]
    AssumeRole(String),

    #[error("failed to get STS credentials: AssumeRole returned no credentials")]
    MissingStsCredentials,
}

/// Parameters for an STS `AssumeRole` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleParams {
    pub role_arn: String,
    pub duration_seconds: Option<i32>,
    pub external_id: Option<String>,
}

/// Credential source selected from a [`StoreConfig`]
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    Ambient,
    AssumeRole(AssumeRoleParams),
    Static {
        access_key: String,
        secret_key: String,
    },
}

impl std::fmt::Debug for CredentialStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ambient => f.write_str("Ambient"),
            Self::AssumeRole(params) => f.debug_tuple("AssumeRole").field(params).finish(),
            Self::Static { .. } => f.debug_struct("Static").finish_non_exhaustive(),
        }
    }
}

impl CredentialStrategy {
    /// Select and validate the credential strategy without touching the network
    pub fn from_config(config: &StoreConfig) -> Result<Self, ClientError> {
        if config.assume_iam_role_on_runner {
            return Ok(Self::Ambient);
        }

        if config.assume_sts_role_on_runner {
            if config.role_arn.is_empty() {
                return Err(ClientError::MissingRoleArn);
            }
            let duration_seconds = (config.assume_sts_role_duration > 0)
                .then(|| i32::try_from(config.assume_sts_role_duration).unwrap_or(i32::MAX));
            let external_id =
                (!config.external_name.is_empty()).then(|| config.external_name.clone());
            return Ok(Self::AssumeRole(AssumeRoleParams {
                role_arn: config.role_arn.clone(),
                duration_seconds,
                external_id,
            }));
        }

        if config.access_key.is_empty() {
            return Err(ClientError::MissingAccessKey);
        }
        if config.secret_key.is_empty() {
            return Err(ClientError::MissingSecretKey);
        }
        Ok(Self::Static {
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }
}

/// Region from the config, or `default_region` when blank
pub fn resolve_region(config: &StoreConfig, default_region: &str) -> String {
    let region = config.region.trim();
    if region.is_empty() {
        default_region.to_string()
    } else {
        region.to_string()
    }
}

/// Build an authenticated Secrets Manager client
pub async fn build_client(config: &StoreConfig, default_region: &str) -> Result<Client, ClientError> {
    let region = resolve_region(config, default_region);
    let strategy = CredentialStrategy::from_config(config).map_err(|e| {
        error!(error = %e, "Failed to configure AWS client");
        e
    })?;

    let loader = loader(&region).retry_config(RetryConfig::standard());
    let loader = match strategy {
        CredentialStrategy::Ambient => {
            info!("Assuming IAM role on runner");
            loader
        }
        CredentialStrategy::AssumeRole(params) => {
            info!(role_arn = %params.role_arn, "Assuming STS role on runner");
            let credentials = assume_role(&region, &params).await.map_err(|e| {
                error!(error = %e, "Failed to configure AWS client");
                e
            })?;
            loader.credentials_provider(credentials)
        }
        CredentialStrategy::Static {
            access_key,
            secret_key,
        } => {
            info!("Using static credentials");
            loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                STATIC_PROVIDER,
            ))
        }
    };

    let sdk_config = loader.load().await;
    info!(region = %region, "Successfully configured AWS client");
    Ok(Client::new(&sdk_config))
}

fn loader(region: &str) -> ConfigLoader {
    aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()))
}

/// Exchange the ambient credentials for the role's temporary credentials
async fn assume_role(region: &str, params: &AssumeRoleParams) -> Result<Credentials, ClientError> {
    let base = loader(region).load().await;
    let sts = aws_sdk_sts::Client::new(&base);

    let output = sts
        .assume_role()
        .role_arn(&params.role_arn)
        .role_session_name(Uuid::new_v4().to_string())
        .set_duration_seconds(params.duration_seconds)
        .set_external_id(params.external_id.clone())
        .send()
        .await
        .map_err(|e| ClientError::AssumeRole(DisplayErrorContext(&e).to_string()))?;

    let credentials = output
        .credentials()
        .ok_or(ClientError::MissingStsCredentials)?;

    Ok(Credentials::new(
        credentials.access_key_id(),
        credentials.secret_access_key(),
        Some(credentials.session_token().to_string()),
        SystemTime::try_from(*credentials.expiration()).ok(),
        STS_PROVIDER,
    ))
}
