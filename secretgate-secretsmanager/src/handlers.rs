//! HTTP handler for secret tasks

use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

use secretgate_core::request_id::REQUEST_ID_HEADER;
use secretgate_core::{
    ErrorResponse, Input, RequestError, RequestId, Secret, SecretOperation, SecretParams, StoreConfig,
};

use crate::operations::{SecretsDefaults, SecretsManager};
use crate::store::StoreFactory;

/// State shared by every request
pub struct SecretsProxyState {
    pub factory: Arc<dyn StoreFactory>,
    pub defaults: SecretsDefaults,
}

impl SecretsProxyState {
    pub fn new(factory: Arc<dyn StoreFactory>, defaults: SecretsDefaults) -> Self {
        Self { factory, defaults }
    }
}

/// Decode a secret task, run it, and encode the result
pub async fn handle_request(State(state): State<Arc<SecretsProxyState>>, body: Bytes) -> Response {
    let request_id = RequestId::new();
    let span = tracing::info_span!("secret_task", request_id = %request_id);

    let mut response = dispatch(&state, &body).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

async fn dispatch(state: &SecretsProxyState, body: &[u8]) -> Response {
    let params = match serde_json::from_slice::<Input>(body) {
        Ok(input) => input.secret_params,
        Err(e) => return request_error(&RequestError::from(e)),
    };

    let task = match validate(&params) {
        Ok(task) => task,
        Err(e) => return request_error(&e),
    };
    let config = task.config;

    info!(operation = task.operation.as_str(), region = %config.region, "Secret task");

    let store = match state.factory.connect(config).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to create AWS Secret Manager client");
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse::new(
                    "Failed to create AWS Secret Manager client",
                    e,
                    StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                ),
            );
        }
    };
    let manager = SecretsManager::new(store, config.prefix.clone(), &state.defaults);

    let secret = task.secret;
    match task.operation {
        Operation::Connect => json_response(StatusCode::OK, &manager.connect(&secret.name).await),
        Operation::ValidateReference => {
            json_response(StatusCode::OK, &manager.validate_reference(&secret.name).await)
        }
        Operation::Fetch => match manager.fetch_secret(secret).await {
            Ok(value) => json_response(StatusCode::OK, &value),
            Err(e) => json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse::new(
                    "Failed to fetch secret",
                    e,
                    StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                ),
            ),
        },
        Operation::Create => json_response(StatusCode::OK, &manager.upsert_secret(secret, None).await),
        Operation::Update(existing) => {
            json_response(StatusCode::OK, &manager.upsert_secret(secret, existing).await)
        }
        Operation::Rename(existing) => {
            json_response(StatusCode::OK, &manager.rename_secret(secret, existing).await)
        }
        Operation::Delete => json_response(StatusCode::OK, &manager.delete_secret(secret).await),
    }
}

/// A secret task that passed the request-level checks
#[derive(Debug)]
struct Task<'a> {
    operation: Operation<'a>,
    config: &'a StoreConfig,
    secret: &'a Secret,
}

/// Routed operation, carrying the existing secret where the operation uses one
#[derive(Debug, Clone, Copy, PartialEq)]
enum Operation<'a> {
    Connect,
    ValidateReference,
    Fetch,
    Create,
    Update(Option<&'a Secret>),
    Rename(&'a Secret),
    Delete,
}

impl Operation<'_> {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => SecretOperation::Connect.as_str(),
            Self::ValidateReference => SecretOperation::ValidateReference.as_str(),
            Self::Fetch => SecretOperation::Fetch.as_str(),
            Self::Create => SecretOperation::Create.as_str(),
            Self::Update(_) => SecretOperation::Update.as_str(),
            Self::Rename(_) => SecretOperation::Rename.as_str(),
            Self::Delete => SecretOperation::Delete.as_str(),
        }
    }
}

/// Request-level checks, run before any client is built
fn validate(params: &SecretParams) -> Result<Task<'_>, RequestError> {
    let config = params.require_config()?;
    let action: SecretOperation = params.action.parse()?;
    let secret = params.require_secret()?;
    let operation = match action {
        SecretOperation::Connect => Operation::Connect,
        SecretOperation::ValidateReference => Operation::ValidateReference,
        SecretOperation::Fetch => Operation::Fetch,
        SecretOperation::Create => Operation::Create,
        SecretOperation::Update => Operation::Update(params.existing_secret.as_ref()),
        SecretOperation::Rename => Operation::Rename(params.require_existing_secret()?),
        SecretOperation::Delete => Operation::Delete,
    };
    Ok(Task {
        operation,
        config,
        secret,
    })
}

// === Helpers ===

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, Json(body)).into_response()
}

fn request_error(error: &RequestError) -> Response {
    warn!(error = %error, "Rejected secret task");
    let status = StatusCode::BAD_REQUEST;
    json_response(
        status,
        &ErrorResponse::new(error.message(), error, status.as_u16()),
    )
}
