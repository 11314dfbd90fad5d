use log::{info, warn};
use serde::Serialize;

use super::SyncContext;
use crate::error::{ErrorReport, SyncError};
use crate::gateway::{GatewayCommand, GatewayError, NetwatchGateway};
use crate::models::Device;

/// Result of a best-effort push; the device itself is already stored
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct PushOutcome {
    pub warning: Option<String>,
}

/// Add a freshly created device to the router's netwatch list when asked to
pub async fn push_if_requested(ctx: &SyncContext, device: &Device, requested: bool) -> PushOutcome {
    if !requested {
        return PushOutcome::default();
    }

    match push(ctx, device).await {
        Ok(()) => {
            info!("device pushed to netwatch device={} ip={}", device.id, device.ip);
            PushOutcome::default()
        }
        Err(SyncError::NotConfigured) => PushOutcome {
            warning: Some("Netwatch push skipped: not configured".to_string()),
        },
        Err(err) => {
            let report = ErrorReport::from(&err);
            warn!(
                "netwatch push failed device={} ip={} kind={} detail={}",
                device.id, device.ip, report.category, report.detail
            );
            PushOutcome {
                warning: Some(format!("Netwatch push failed ({})", report)),
            }
        }
    }
}

async fn push(ctx: &SyncContext, device: &Device) -> Result<(), SyncError> {
    let params = ctx.connection_params().await?;
    let command = GatewayCommand::AddNetwatch {
        host: device.ip.clone(),
        comment: device.name.clone(),
    };

    let mut session = ctx.gateways.open(&params);
    let outcome = add_entry(session.as_mut(), &command).await;
    session.close().await;
    outcome.map_err(SyncError::from)
}

async fn add_entry(
    session: &mut dyn NetwatchGateway,
    command: &GatewayCommand,
) -> Result<(), GatewayError> {
    session.connect().await?;
    session.query(command).await?;
    Ok(())
}
