//! Session contract for the router's netwatch API.
//!
//! One [`NetwatchGateway`] value is one session: it is opened from the
//! stored connection settings, used for a single cycle or request, and
//! closed. Sessions are never pooled or reused.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::error::{ErrorKind, classify};

pub mod rest;

/// One attribute map as returned by the router
pub type RemoteRecord = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    ListNetwatch,
    AddNetwatch { host: String, comment: String },
    Identity,
    Resource,
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl GatewayError {
    /// Build an error from raw transport text, classifying it on the way
    pub fn from_message(message: impl Into<String>) -> Self {
        let detail = message.into();
        Self {
            kind: classify(&detail),
            detail,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub use_tls: bool,
    pub timeout: Duration,
}

#[rocket::async_trait]
pub trait NetwatchGateway: Send {
    async fn connect(&mut self) -> Result<(), GatewayError>;

    async fn query(&mut self, command: &GatewayCommand) -> Result<Vec<RemoteRecord>, GatewayError>;

    /// Must not fail; implementations log and swallow their own errors.
    async fn close(&mut self);
}

pub trait GatewayFactory: Send + Sync {
    fn open(&self, params: &ConnectionParams) -> Box<dyn NetwatchGateway>;
}

/// Netwatch row as seen during one cycle, never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNetwatchEntry {
    pub host: String,
    pub raw_status: String,
    pub comment: String,
}

impl RemoteNetwatchEntry {
    pub fn from_record(record: &RemoteRecord) -> Option<Self> {
        let host = record.get("host")?.clone();
        Some(Self {
            host,
            raw_status: record.get("status").cloned().unwrap_or_default(),
            comment: record.get("comment").cloned().unwrap_or_default(),
        })
    }
}

/// Connect and pull the netwatch table; the caller closes the session
pub async fn fetch_netwatch(
    session: &mut dyn NetwatchGateway,
) -> Result<Vec<RemoteNetwatchEntry>, GatewayError> {
    session.connect().await?;
    let records = session.query(&GatewayCommand::ListNetwatch).await?;

    let entries: Vec<RemoteNetwatchEntry> = records
        .iter()
        .filter_map(RemoteNetwatchEntry::from_record)
        .collect();

    if entries.len() < records.len() {
        log::warn!(
            "netwatch returned {} records without a host; ignoring them",
            records.len() - entries.len()
        );
    }

    Ok(entries)
}
