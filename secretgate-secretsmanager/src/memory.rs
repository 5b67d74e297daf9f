//! In-memory secret store
//!
//! Behaves like Secrets Manager for the four calls the operations make,
//! records every call, and can be told to fail a call so the operation
//! choreography can be exercised without AWS.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use secretgate_core::{ErrorCode, StoreConfig, StoreError};

use crate::client::ClientError;
use crate::store::{SecretStore, SecretTag, StoreFactory};

/// Store call kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Create,
    Update,
    Delete,
}

/// A recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub name: String,
}

impl StoreCall {
    pub fn new(op: StoreOp, name: impl Into<String>) -> Self {
        Self {
            op,
            name: name.into(),
        }
    }
}

/// A stored secret
#[derive(Debug, Clone, Default)]
pub struct StoredSecret {
    pub value: Option<String>,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Secrets indexed by name
    secrets: DashMap<String, StoredSecret>,
    /// Injected failures keyed by call kind and, optionally, secret name
    failures: DashMap<(StoreOp, Option<String>), StoreError>,
    calls: Mutex<Vec<StoreCall>>,
}

/// Shared handle to an in-memory store; clones see the same secrets
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    inner: Arc<Inner>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret
    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.inner.secrets.insert(
            name.to_string(),
            StoredSecret {
                value: Some(value.to_string()),
                tags: HashMap::new(),
            },
        );
        self
    }

    /// Fail every `op` call
    pub fn fail(&self, op: StoreOp, error: StoreError) {
        self.inner.failures.insert((op, None), error);
    }

    /// Fail `op` calls for one secret name
    pub fn fail_for(&self, op: StoreOp, name: &str, error: StoreError) {
        self.inner
            .failures
            .insert((op, Some(name.to_string())), error);
    }

    pub fn secret(&self, name: &str) -> Option<StoredSecret> {
        self.inner.secrets.get(name).map(|s| s.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.secrets.contains_key(name)
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.calls.lock().clone()
    }

    /// Calls of one kind made so far
    pub fn calls_of(&self, op: StoreOp) -> Vec<String> {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.name.clone())
            .collect()
    }

    fn record(&self, op: StoreOp, name: &str) -> Result<(), StoreError> {
        self.inner.calls.lock().push(StoreCall::new(op, name));

        let failure = self
            .inner
            .failures
            .get(&(op, Some(name.to_string())))
            .or_else(|| self.inner.failures.get(&(op, None)))
            .map(|error| error.clone());
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret_value(&self, name: &str) -> Result<String, StoreError> {
        self.record(StoreOp::Get, name)?;
        let secret = self
            .inner
            .secrets
            .get(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        secret.value.clone().ok_or_else(|| {
            StoreError::with_code(
                ErrorCode::ResourceNotFoundException,
                format!("Secrets Manager can't find the specified secret value for staging label: AWSCURRENT ({})", name),
            )
        })
    }

    async fn create_secret(
        &self,
        name: &str,
        value: Option<&str>,
        tags: &[SecretTag],
    ) -> Result<String, StoreError> {
        self.record(StoreOp::Create, name)?;
        if self.inner.secrets.contains_key(name) {
            return Err(StoreError::with_code(
                ErrorCode::ResourceExistsException,
                format!("The operation failed because the secret {} already exists.", name),
            ));
        }

        let secret = StoredSecret {
            value: value.map(str::to_string),
            tags: tags
                .iter()
                .map(|t| (t.key.clone(), t.value.clone()))
                .collect(),
        };
        self.inner.secrets.insert(name.to_string(), secret);
        Ok(name.to_string())
    }

    async fn update_secret(&self, name: &str, value: Option<&str>) -> Result<String, StoreError> {
        self.record(StoreOp::Update, name)?;
        let mut secret = self
            .inner
            .secrets
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        if let Some(value) = value {
            secret.value = Some(value.to_string());
        }
        Ok(name.to_string())
    }

    async fn delete_secret(
        &self,
        name: &str,
        _force_delete_without_recovery: bool,
    ) -> Result<String, StoreError> {
        self.record(StoreOp::Delete, name)?;
        self.inner
            .secrets
            .remove(name)
            .map(|(name, _)| name)
            .ok_or_else(|| StoreError::not_found(name))
    }
}

#[async_trait]
impl StoreFactory for MemorySecretStore {
    async fn connect(&self, _config: &StoreConfig) -> Result<Arc<dyn SecretStore>, ClientError> {
        Ok(Arc::new(self.clone()))
    }
}
