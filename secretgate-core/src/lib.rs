//! Core types for secretgate
//!
//! This crate provides the request/response envelope, the `name#key.path`
//! addressing helpers and the store error classifier shared by the service
//! crate and the CGI binary.

pub mod addressing;
pub mod error;
pub mod request_id;
pub mod types;

pub use addressing::{PrefixRule, SecretNaming};
pub use error::{classify, DecodeError, ErrorCode, RequestError, StoreError};
pub use request_id::RequestId;
pub use types::{
    ErrorDetail, ErrorResponse, Input, OperationResponse, OperationStatus, Secret, SecretOperation,
    SecretParams, SecretResponse, StoreConfig, ValidationResponse,
};
