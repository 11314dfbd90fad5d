use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

use super::SyncContext;
use super::reconcile::{ReconcileMode, persist_mutations, reconcile};
use crate::db;
use crate::error::{ErrorReport, SyncError};
use crate::gateway::{ConnectionParams, NetwatchGateway, fetch_netwatch};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub devices: usize,
    pub updated: usize,
    pub not_found: Vec<String>,
}

/// One reconciliation pass over a fresh gateway session.
/// The session is closed whether or not the pass succeeded.
pub async fn run_cycle(
    ctx: &SyncContext,
    params: &ConnectionParams,
    mode: ReconcileMode,
) -> Result<CycleReport, SyncError> {
    let mut session = ctx.gateways.open(params);
    let outcome = reconcile_session(ctx, session.as_mut(), mode).await;
    session.close().await;
    outcome
}

async fn reconcile_session(
    ctx: &SyncContext,
    session: &mut dyn NetwatchGateway,
    mode: ReconcileMode,
) -> Result<CycleReport, SyncError> {
    let entries = fetch_netwatch(session).await?;

    ctx.with_conn(move |conn| {
        let devices = db::list_devices(conn)?;
        let now = Utc::now().naive_utc();
        let result = reconcile(&devices, &entries, mode, now);
        let updated = persist_mutations(conn, &result.mutations, now)?;

        Ok(CycleReport {
            devices: devices.len(),
            updated,
            not_found: result.not_found,
        })
    })
    .await
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub updated: usize,
    pub not_found: Vec<String>,
    pub error: Option<ErrorReport>,
}

/// Operator-triggered refresh; failures come back inside the report
pub async fn refresh(ctx: &SyncContext) -> RefreshReport {
    let outcome = match ctx.connection_params().await {
        Ok(params) => run_cycle(ctx, &params, ReconcileMode::Refresh).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(report) => {
            info!(
                "manual refresh finished devices={} updated={} not_found={}",
                report.devices,
                report.updated,
                report.not_found.len()
            );
            RefreshReport {
                updated: report.updated,
                not_found: report.not_found,
                error: None,
            }
        }
        Err(err) => {
            warn!("manual refresh failed kind={} detail={}", err.kind(), err);
            RefreshReport {
                error: Some(ErrorReport::from(&err)),
                ..RefreshReport::default()
            }
        }
    }
}
