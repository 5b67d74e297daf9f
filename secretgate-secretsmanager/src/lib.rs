//! AWS Secrets Manager operations for secretgate
//!
//! Provides:
//! - Client construction (static keys, IAM role on runner, STS assume role)
//! - Connect, ValidateReference, Fetch, Create/Update (upsert), Rename, Delete
//! - The axum handler that decodes a secret task and routes it
//! - An in-memory store for tests, behind the `test-util` feature

pub mod client;
pub mod handlers;
#[cfg(feature = "test-util")]
pub mod memory;
pub mod operations;
pub mod store;

pub use client::{build_client, ClientError, CredentialStrategy};
pub use handlers::{handle_request, SecretsProxyState};
#[cfg(feature = "test-util")]
pub use memory::MemorySecretStore;
pub use operations::{FetchError, SecretsDefaults, SecretsManager};
pub use store::{AwsSecretStore, AwsStoreFactory, SecretStore, SecretTag, StoreFactory};
