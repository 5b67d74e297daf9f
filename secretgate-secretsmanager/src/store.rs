//! Secret store abstraction and the AWS Secrets Manager implementation

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::types::Tag;
use aws_sdk_secretsmanager::Client;
use secretgate_core::{StoreConfig, StoreError};

use crate::client::{build_client, ClientError};

/// Tag attached to secrets created through this service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretTag {
    pub key: String,
    pub value: String,
}

impl SecretTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One call per operation against the backing secret store
///
/// Write calls return the name the store confirmed.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret_value(&self, name: &str) -> Result<String, StoreError>;

    async fn create_secret(
        &self,
        name: &str,
        value: Option<&str>,
        tags: &[SecretTag],
    ) -> Result<String, StoreError>;

    async fn update_secret(&self, name: &str, value: Option<&str>) -> Result<String, StoreError>;

    async fn delete_secret(
        &self,
        name: &str,
        force_delete_without_recovery: bool,
    ) -> Result<String, StoreError>;
}

/// Builds a store handle from a request's store config
#[async_trait]
pub trait StoreFactory: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn SecretStore>, ClientError>;
}

/// [`SecretStore`] backed by AWS Secrets Manager
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn get_secret_value(&self, name: &str) -> Result<String, StoreError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(store_error)?;

        if let Some(value) = output.secret_string() {
            return Ok(value.to_string());
        }
        if let Some(blob) = output.secret_binary() {
            return Ok(String::from_utf8_lossy(blob.as_ref()).into_owned());
        }
        Err(StoreError::uncoded(format!("secret {} has no value", name)))
    }

    async fn create_secret(
        &self,
        name: &str,
        value: Option<&str>,
        tags: &[SecretTag],
    ) -> Result<String, StoreError> {
        let tags = tags
            .iter()
            .map(|t| Tag::builder().key(&t.key).value(&t.value).build())
            .collect();

        let output = self
            .client
            .create_secret()
            .name(name)
            .set_secret_string(value.map(str::to_string))
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(store_error)?;

        Ok(output.name().unwrap_or(name).to_string())
    }

    async fn update_secret(&self, name: &str, value: Option<&str>) -> Result<String, StoreError> {
        let output = self
            .client
            .update_secret()
            .secret_id(name)
            .set_secret_string(value.map(str::to_string))
            .send()
            .await
            .map_err(store_error)?;

        Ok(output.name().unwrap_or(name).to_string())
    }

    async fn delete_secret(
        &self,
        name: &str,
        force_delete_without_recovery: bool,
    ) -> Result<String, StoreError> {
        let output = self
            .client
            .delete_secret()
            .secret_id(name)
            .force_delete_without_recovery(force_delete_without_recovery)
            .send()
            .await
            .map_err(store_error)?;

        Ok(output.name().unwrap_or(name).to_string())
    }
}

/// [`StoreFactory`] building a fresh SDK client per request
#[derive(Debug, Clone)]
pub struct AwsStoreFactory {
    default_region: String,
}

impl AwsStoreFactory {
    pub fn new(default_region: impl Into<String>) -> Self {
        Self {
            default_region: default_region.into(),
        }
    }
}

#[async_trait]
impl StoreFactory for AwsStoreFactory {
    async fn connect(&self, config: &StoreConfig) -> Result<Arc<dyn SecretStore>, ClientError> {
        let client = build_client(config, &self.default_region).await?;
        Ok(Arc::new(AwsSecretStore::new(client)))
    }
}

/// Keep the service error code (if any) and the full error chain
fn store_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = match &err {
        SdkError::ServiceError(context) => context.err().code().map(str::to_string),
        _ => None,
    };
    StoreError::new(code, DisplayErrorContext(&err).to_string())
}
