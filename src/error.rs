//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup-time errors: a resource or store definition that cannot work. Never produced per request.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("field '{field}' of {transport} has no counterpart on {storage}")]
    UnmappedField {
        field: &'static str,
        transport: &'static str,
        storage: &'static str,
    },
    #[error("mismatched types on '{field}': {transport_type} vs {storage_type}")]
    TypeMismatch {
        field: &'static str,
        transport_type: &'static str,
        storage_type: &'static str,
    },
    #[error("no key field and no 'id' field on {0}")]
    MissingKeyField(&'static str),
    #[error("more than one key field on {storage}: {fields}")]
    AmbiguousKey { storage: &'static str, fields: String },
    #[error("key field '{field}' missing on {transport}")]
    MissingTransportKey {
        field: &'static str,
        transport: &'static str,
    },
    #[error("key field '{field}' has type {type_name}, which cannot be used as a key")]
    UnsupportedKeyType {
        field: &'static str,
        type_name: &'static str,
    },
    #[error("child field '{field}' has type {type_name}, which is not a sequence")]
    ChildNotSequence {
        field: &'static str,
        type_name: &'static str,
    },
    #[error("field '{field}' of {transport} maps onto a child collection; mark it child() or excluded()")]
    ChildInTransport {
        field: &'static str,
        transport: &'static str,
    },
    #[error("duplicate field '{field}' on {owner}")]
    DuplicateField {
        field: &'static str,
        owner: &'static str,
    },
    #[error("duplicate path segment: {0}")]
    DuplicatePath(String),
    #[error("invalid path segment: '{0}'")]
    InvalidPath(String),
    #[error("relation for '{0}' does not name a child field")]
    UnknownRelation(String),
    #[error("config load: {0}")]
    Load(String),
}

/// Textual key that cannot be converted into the key field's type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("key value '{value}' is not a valid {expected}")]
pub struct KeyFormatError {
    pub value: String,
    pub expected: &'static str,
}

/// Failure reported by an operation callback or storage adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),
    #[error("missing key value")]
    MissingKey,
    #[error("key '{0}' already exists")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("key '{body}' in body does not match '{path}'")]
    KeyMismatch { path: String, body: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("decode: {0}")]
    Decode(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("operation failed: {0}")]
    Operation(#[from] StoreError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::MalformedBody(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            AppError::Operation(StoreError::MissingKey) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "missing_key")
            }
            AppError::Operation(StoreError::KeyMismatch { .. }) => {
                (StatusCode::BAD_REQUEST, "key_mismatch")
            }
            AppError::Operation(StoreError::Conflict(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "conflict")
            }
            AppError::Operation(StoreError::Db(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
            }
            AppError::Operation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "operation_failed"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
