//! Secret operations
//!
//! Every operation makes one or two store calls and shapes the outcome into a
//! response. Store failures never escape as errors: they are classified and
//! embedded in the response, with "not found" read as success where the
//! operation only needs to know the store is reachable.

use std::sync::Arc;

use secretgate_core::addressing::{
    decode, extract_secret_info, get_value_from_json, is_valid_json,
};
use secretgate_core::{
    classify, DecodeError, ErrorDetail, OperationResponse, Secret, SecretNaming, SecretResponse,
    StoreError, ValidationResponse,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::client::DEFAULT_REGION;
use crate::store::{SecretStore, SecretTag};

const VALIDATE_STORE_FAILED: &str = "Failed validating AWS Secret Manager";
const VALIDATE_REFERENCE_FAILED: &str = "Failed validating AWS Secret reference";
const FIND_FAILED: &str = "Failed to find secret in AWS Secret Manager";
const CREATE_FAILED: &str = "Failed to create secret in AWS Secret Manager";
const CREATE_SUCCEEDED: &str = "Successfully created secret in AWS Secret Manager";
const UPDATE_FAILED: &str = "Failed to update secret in AWS Secret Manager";
const UPDATE_SUCCEEDED: &str = "Successfully updated secret in AWS Secret Manager";
const DELETE_FAILED: &str = "Failed to delete secret in AWS Secret Manager";
const DELETE_SUCCEEDED: &str = "Successfully deleted secret in AWS Secret Manager";

/// Deployment-wide defaults applied to every request
#[derive(Debug, Clone)]
pub struct SecretsDefaults {
    pub default_region: String,
    pub naming: SecretNaming,
    /// Attribution tag put on created secrets
    pub creation_tag: SecretTag,
}

impl Default for SecretsDefaults {
    fn default() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
            naming: SecretNaming::default(),
            creation_tag: SecretTag::new("createdBy", "Harness"),
        }
    }
}

/// Fetch failures; these abort the operation
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not find secret key: {name}. Failed with error {source}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Operations against one store, scoped to one request's prefix
pub struct SecretsManager {
    store: Arc<dyn SecretStore>,
    prefix: String,
    naming: SecretNaming,
    creation_tag: SecretTag,
}

impl SecretsManager {
    pub fn new(store: Arc<dyn SecretStore>, prefix: impl Into<String>, defaults: &SecretsDefaults) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            naming: defaults.naming.clone(),
            creation_tag: defaults.creation_tag.clone(),
        }
    }

    /// Fully-qualified name for a write target
    pub fn qualified_name(&self, name: &str) -> String {
        self.naming.qualify(&self.prefix, name)
    }

    /// Check the store is reachable and the credentials work
    pub async fn connect(&self, name: &str) -> ValidationResponse {
        info!(secret = %name, "Received request for validating AWS Secret Manager");
        match self.store.get_secret_value(name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!(secret = %name, "Secret not found, store is reachable");
            }
            Err(e) => {
                error!(error = %e, "Failed to validate AWS Secret Manager");
                return ValidationResponse::invalid(error_detail(&e, VALIDATE_STORE_FAILED));
            }
        }
        info!("Successfully validated AWS Secret Manager");
        ValidationResponse::valid()
    }

    /// Check a `name#key.path` reference resolves
    pub async fn validate_reference(&self, name: &str) -> ValidationResponse {
        info!(reference = %name, "Received request for validating AWS Secret reference");
        match self.fetch_internal(name).await {
            Ok(_) => {
                info!("Successfully validated AWS Secret reference");
                ValidationResponse::valid()
            }
            Err(e) => {
                error!(error = %e, "Failed to validate AWS Secret reference");
                ValidationResponse::invalid(error_detail(&e, VALIDATE_REFERENCE_FAILED))
            }
        }
    }

    pub async fn fetch_secret(&self, secret: &Secret) -> Result<SecretResponse, FetchError> {
        info!(secret = %secret.name, "Received request for fetching AWS Secret");
        let (name, key_path) = extract_secret_info(&secret.name);

        let value = self.store.get_secret_value(name).await.map_err(|source| {
            error!(secret = %name, error = %source, "Failed to fetch secret");
            FetchError::Store {
                name: name.to_string(),
                source,
            }
        })?;
        info!(secret = %name, "Successfully fetched secret");

        let value = decode(&value, secret.base64, name)?;
        if !is_valid_json(&value) {
            return Ok(SecretResponse { value });
        }
        Ok(SecretResponse {
            value: get_value_from_json(&value, key_path),
        })
    }

    /// Create the secret if absent, otherwise update it
    ///
    /// When `existing` names a different secret, it is deleted after a
    /// successful write. A failed delete is logged and does not change the
    /// outcome.
    pub async fn upsert_secret(&self, secret: &Secret, existing: Option<&Secret>) -> OperationResponse {
        let target = self.qualified_name(&secret.name);

        let exists = match self.fetch_internal(&target).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => {
                info!(secret = %target, error = %e, "Secret doesn't exist");
                false
            }
            Err(e) => {
                error!(secret = %target, error = %e, "Failed fetching secret");
                return OperationResponse::failure(target, error_detail(&e, FIND_FAILED));
            }
        };

        let plaintext = secret.plaintext.as_deref();
        let response = if exists {
            self.update(&target, plaintext).await
        } else {
            self.create(&target, plaintext).await
        };

        if response.is_success() {
            if let Some(existing) = existing {
                self.remove_previous(existing, &target).await;
            }
        }
        response
    }

    /// Move the value of `existing` to `secret`, then drop `existing`
    pub async fn rename_secret(&self, secret: &Secret, existing: &Secret) -> OperationResponse {
        info!(
            secret = %self.qualified_name(&secret.name),
            from = %existing.name,
            "Received request for renaming AWS Secret"
        );

        // Without the old value there is nothing to write
        let value = match self.fetch_internal(&existing.name).await {
            Ok(value) => value,
            Err(e) => {
                error!(secret = %existing.name, error = %e, "Failed fetching secret to rename");
                return OperationResponse::failure(
                    existing.name.clone(),
                    error_detail(&e, FIND_FAILED),
                );
            }
        };

        let renamed = Secret {
            plaintext: Some(value),
            ..secret.clone()
        };
        self.upsert_secret(&renamed, Some(existing)).await
    }

    pub async fn delete_secret(&self, secret: &Secret) -> OperationResponse {
        let name = &secret.name;
        info!(secret = %name, "Received request for deleting AWS Secret");
        match self.store.delete_secret(name, true).await {
            Ok(confirmed) => {
                info!(secret = %name, "Successfully deleted secret");
                OperationResponse::success(confirmed, DELETE_SUCCEEDED)
            }
            Err(e) => {
                let error_type = classify(&e);
                error!(secret = %name, error_type = %error_type, error = %e, "Failed to delete secret");
                OperationResponse::failure(name.clone(), error_detail(&e, DELETE_FAILED))
            }
        }
    }

    async fn create(&self, name: &str, plaintext: Option<&str>) -> OperationResponse {
        info!(secret = %name, "Creating AWS Secret");
        let tags = std::slice::from_ref(&self.creation_tag);
        match self.store.create_secret(name, plaintext, tags).await {
            Ok(confirmed) => {
                info!(secret = %name, "Successfully created secret");
                OperationResponse::success(confirmed, CREATE_SUCCEEDED)
            }
            Err(e) => {
                let error_type = classify(&e);
                error!(secret = %name, error_type = %error_type, error = %e, "Failed to create secret");
                OperationResponse::failure(name, error_detail(&e, CREATE_FAILED))
            }
        }
    }

    async fn update(&self, name: &str, plaintext: Option<&str>) -> OperationResponse {
        info!(secret = %name, "Updating AWS Secret");
        match self.store.update_secret(name, plaintext).await {
            Ok(confirmed) => {
                info!(secret = %name, "Successfully updated secret");
                OperationResponse::success(confirmed, UPDATE_SUCCEEDED)
            }
            Err(e) => {
                let error_type = classify(&e);
                error!(secret = %name, error_type = %error_type, error = %e, "Failed to update secret");
                OperationResponse::failure(name, error_detail(&e, UPDATE_FAILED))
            }
        }
    }

    /// Best-effort delete of a secret's previous location
    ///
    /// A `name#key.path` reference only owns one key of its secret, so the
    /// secret holding it is left in place.
    async fn remove_previous(&self, existing: &Secret, target: &str) {
        let old_name = existing.name.as_str();
        debug!(old = %old_name, new = %target, "Comparing secret locations");
        if old_name.is_empty() || old_name == target {
            return;
        }

        let (base, key_path) = extract_secret_info(old_name);
        if base != old_name {
            warn!(
                old = %base,
                key = %key_path,
                new = %target,
                "Old secret is a key reference, keeping the secret that holds it"
            );
            return;
        }

        info!(
            old = %old_name,
            new = %target,
            "Old path of the secret is different than the current one. Deleting the old secret"
        );
        if let Err(e) = self.store.delete_secret(old_name, true).await {
            warn!(
                old = %old_name,
                new = %target,
                error = %e,
                "Failed deleting the old secret"
            );
        }
    }

    /// Fetch a reference and extract its JSON key path, without decoding
    async fn fetch_internal(&self, reference: &str) -> Result<String, StoreError> {
        let (name, key_path) = extract_secret_info(reference);
        let value = self.store.get_secret_value(name).await?;
        if !is_valid_json(&value) {
            return Ok(value);
        }
        Ok(get_value_from_json(&value, key_path))
    }
}

fn error_detail(error: &StoreError, message: &str) -> ErrorDetail {
    ErrorDetail {
        error_type: classify(error),
        message: message.to_string(),
        reason: error.to_string(),
    }
}
