use std::collections::HashSet;

use chrono::{NaiveDateTime, Utc};
use diesel::sqlite::SqliteConnection;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::SyncContext;
use crate::db;
use crate::device_type::DeviceType;
use crate::error::{ErrorReport, SyncError};
use crate::gateway::fetch_netwatch;
use crate::models::{Device, DeviceStatus, NewDevice};

/// A device offered for import, usually picked from the discover list
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub status: Option<String>,
    pub comment: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported: Vec<Device>,
    pub skipped_ips: Vec<String>,
}

struct ValidCandidate {
    name: String,
    ip: String,
    device_type: DeviceType,
    status: DeviceStatus,
    comment: Option<String>,
}

/// Check the whole batch before anything is written
fn validate_batch(candidates: &[ImportCandidate]) -> Result<Vec<ValidCandidate>, SyncError> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let name = candidate.name.trim();
            if name.is_empty() {
                return Err(SyncError::Validation(format!("candidate {index}: name is required")));
            }
            let ip = candidate.ip.trim();
            if ip.is_empty() {
                return Err(SyncError::Validation(format!("candidate {index}: ip is required")));
            }
            let device_type = match candidate.device_type.as_deref() {
                None => DeviceType::default(),
                Some(raw) => raw
                    .parse()
                    .map_err(|e| SyncError::Validation(format!("candidate {index}: {e}")))?,
            };
            let status = candidate
                .status
                .as_deref()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default();

            Ok(ValidCandidate {
                name: name.to_string(),
                ip: ip.to_string(),
                device_type,
                status,
                comment: candidate.comment.clone().filter(|c| !c.trim().is_empty()),
            })
        })
        .collect()
}

/// Validate, then create every candidate whose ip is not taken yet
pub fn import_batch(
    conn: &mut SqliteConnection,
    candidates: &[ImportCandidate],
    now: NaiveDateTime,
) -> Result<ImportOutcome, SyncError> {
    let valid = validate_batch(candidates)?;
    let mut outcome = ImportOutcome::default();
    let mut seen = HashSet::new();

    for candidate in valid {
        if !seen.insert(candidate.ip.clone()) {
            outcome.skipped_ips.push(candidate.ip);
            continue;
        }
        if db::find_device_by_ip(conn, &candidate.ip)?.is_some() {
            outcome.skipped_ips.push(candidate.ip);
            continue;
        }

        let row = NewDevice::new(
            &candidate.name,
            &candidate.ip,
            candidate.device_type,
            candidate.status,
            candidate.comment,
            now,
        );
        // Another importer may have claimed the ip since the lookup above.
        if !db::insert_device_if_absent(conn, &row)? {
            warn!("import lost race for ip={}", candidate.ip);
            outcome.skipped_ips.push(candidate.ip);
            continue;
        }

        match db::find_device(conn, &row.id)? {
            Some(device) => outcome.imported.push(device),
            None => return Err(SyncError::NotFound(row.id)),
        }
    }

    Ok(outcome)
}

pub async fn import(
    ctx: &SyncContext,
    candidates: Vec<ImportCandidate>,
) -> Result<ImportOutcome, SyncError> {
    let outcome = ctx
        .with_conn(move |conn| import_batch(conn, &candidates, Utc::now().naive_utc()))
        .await?;
    info!(
        "import finished imported={} skipped={}",
        outcome.imported.len(),
        outcome.skipped_ips.len()
    );
    Ok(outcome)
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredEntry {
    pub host: String,
    pub comment: String,
    pub status: DeviceStatus,
    pub suggested_type: DeviceType,
    pub already_imported: bool,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverReport {
    pub entries: Vec<DiscoveredEntry>,
    pub error: Option<ErrorReport>,
}

/// List netwatch hosts with a suggested type and whether they already exist locally
pub async fn discover(ctx: &SyncContext) -> DiscoverReport {
    match discover_entries(ctx).await {
        Ok(entries) => DiscoverReport {
            entries,
            error: None,
        },
        Err(err) => {
            warn!("netwatch discover failed kind={} detail={}", err.kind(), err);
            DiscoverReport {
                entries: Vec::new(),
                error: Some(ErrorReport::from(&err)),
            }
        }
    }
}

async fn discover_entries(ctx: &SyncContext) -> Result<Vec<DiscoveredEntry>, SyncError> {
    let params = ctx.connection_params().await?;

    let mut session = ctx.gateways.open(&params);
    let fetched = fetch_netwatch(session.as_mut()).await;
    session.close().await;
    let remote = fetched?;

    let known: HashSet<String> = ctx
        .with_conn(|conn| Ok(db::list_devices(conn)?.into_iter().map(|d| d.ip).collect()))
        .await?;

    Ok(remote
        .into_iter()
        .map(|entry| {
            let label = if entry.comment.trim().is_empty() {
                entry.host.as_str()
            } else {
                entry.comment.as_str()
            };
            DiscoveredEntry {
                suggested_type: DeviceType::classify(label),
                status: DeviceStatus::from_remote(&entry.raw_status),
                already_imported: known.contains(&entry.host),
                host: entry.host,
                comment: entry.comment,
            }
        })
        .collect())
}
