use std::fmt;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Categories every failure is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NotConfigured,
    Timeout,
    AuthFailure,
    ConnectionRefused,
    NetworkUnreachable,
    ValidationError,
    DuplicateKey,
    NotFound,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotConfigured => "NotConfigured",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::AuthFailure => "AuthFailure",
            ErrorKind::ConnectionRefused => "ConnectionRefused",
            ErrorKind::NetworkUnreachable => "NetworkUnreachable",
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::DuplicateKey => "DuplicateKey",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport error rules, checked in order against the lowercased message
const TRANSPORT_RULES: &[(&[&str], ErrorKind)] = &[
    (&["timeout", "timed out"], ErrorKind::Timeout),
    (
        &["authentication", "login", "cannot log in"],
        ErrorKind::AuthFailure,
    ),
    (
        &["econnrefused", "connection refused"],
        ErrorKind::ConnectionRefused,
    ),
    (&["ehostunreach", "enetunreach"], ErrorKind::NetworkUnreachable),
];

/// Map raw transport error text onto the fixed taxonomy
pub fn classify(raw: &str) -> ErrorKind {
    let lowered = raw.to_lowercase();
    TRANSPORT_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("netwatch connection is not configured")]
    NotConfigured,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("a device with ip {0} already exists")]
    DuplicateIp(String),

    #[error("device {0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotConfigured => ErrorKind::NotConfigured,
            SyncError::Gateway(err) => err.kind,
            SyncError::Validation(_) => ErrorKind::ValidationError,
            SyncError::DuplicateIp(_) => ErrorKind::DuplicateKey,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Database(DieselError::NotFound) => ErrorKind::NotFound,
            SyncError::Database(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                ErrorKind::DuplicateKey
            }
            SyncError::Database(_) | SyncError::Pool(_) | SyncError::Task(_) => ErrorKind::Unknown,
        }
    }
}

/// A failure carried as an ordinary result value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub category: ErrorKind,
    pub detail: String,
}

impl From<&SyncError> for ErrorReport {
    fn from(err: &SyncError) -> Self {
        let detail = match err {
            SyncError::Gateway(gateway) => gateway.detail.clone(),
            other => other.to_string(),
        };
        Self {
            category: err.kind(),
            detail,
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.detail)
    }
}
