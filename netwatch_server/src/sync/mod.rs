//! Netwatch synchronisation: reconciling remote status into local devices,
//! importing discovered hosts and pushing new devices back to the router.
//!
//! Every operation re-reads the connection settings from the database and
//! opens its own gateway session, so settings edits apply on the next call.

use std::sync::Arc;
use std::time::Duration;

use diesel::sqlite::SqliteConnection;

use crate::db::{self, DbPool};
use crate::error::SyncError;
use crate::gateway::{ConnectionParams, GatewayFactory};
use crate::models::SystemConfig;

pub mod cycle;
pub mod import;
pub mod push;
pub mod reconcile;

#[cfg(test)]
mod tests;

/// What every sync operation needs: storage and a way to open sessions
#[derive(Clone)]
pub struct SyncContext {
    pub pool: DbPool,
    pub gateways: Arc<dyn GatewayFactory>,
    pub gateway_timeout: Duration,
}

impl SyncContext {
    pub fn new(pool: DbPool, gateways: Arc<dyn GatewayFactory>, gateway_timeout: Duration) -> Self {
        Self {
            pool,
            gateways,
            gateway_timeout,
        }
    }

    pub async fn with_conn<T, F>(&self, work: F) -> Result<T, SyncError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, SyncError> + Send + 'static,
        T: Send + 'static,
    {
        db::run_blocking(&self.pool, work).await
    }

    pub async fn load_config(&self) -> Result<Option<SystemConfig>, SyncError> {
        self.with_conn(|conn| Ok(db::load_config(conn)?)).await
    }

    /// Session parameters from the stored settings, or `NotConfigured`
    pub async fn connection_params(&self) -> Result<ConnectionParams, SyncError> {
        self.load_config()
            .await?
            .and_then(|config| config.connection_params(self.gateway_timeout))
            .ok_or(SyncError::NotConfigured)
    }
}
