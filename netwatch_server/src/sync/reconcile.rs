use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::sqlite::SqliteConnection;
use log::{debug, info};

use crate::db;
use crate::error::SyncError;
use crate::gateway::RemoteNetwatchEntry;
use crate::models::{Device, DeviceStatus, StatusChangeset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// Background polling: devices missing from netwatch are left alone
    Poll,
    /// Operator-triggered refresh: missing devices drop to `unknown`
    Refresh,
}

/// Status-column update for one device
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMutation {
    pub device_id: String,
    pub status: Option<DeviceStatus>,
    pub status_since: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
}

impl StatusMutation {
    fn transition(device: &Device, status: DeviceStatus, now: NaiveDateTime) -> Self {
        Self {
            device_id: device.id.clone(),
            status: Some(status),
            status_since: Some(now),
            last_seen: (status == DeviceStatus::Up).then_some(now),
        }
    }

    fn seen(device: &Device, now: NaiveDateTime) -> Self {
        Self {
            device_id: device.id.clone(),
            status: None,
            status_since: None,
            last_seen: Some(now),
        }
    }

    fn changeset(&self, now: NaiveDateTime) -> StatusChangeset {
        StatusChangeset {
            status: self.status.map(|s| s.as_str().to_string()),
            status_since: self.status_since,
            last_seen: self.last_seen,
            updated_at: Some(now),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reconciliation {
    pub mutations: Vec<StatusMutation>,
    /// IPs of local devices with no netwatch entry
    pub not_found: Vec<String>,
}

/// Diff one netwatch snapshot against the local devices.
///
/// Hosts are matched to device IPs by exact string equality. When the
/// snapshot lists a host more than once, the first entry is used.
pub fn reconcile(
    devices: &[Device],
    entries: &[RemoteNetwatchEntry],
    mode: ReconcileMode,
    now: NaiveDateTime,
) -> Reconciliation {
    let mut by_host: HashMap<&str, &RemoteNetwatchEntry> = HashMap::with_capacity(entries.len());
    for entry in entries {
        by_host.entry(entry.host.as_str()).or_insert(entry);
    }

    let mut result = Reconciliation::default();

    for device in devices {
        let Some(entry) = by_host.get(device.ip.as_str()) else {
            info!("device not found in netwatch device={} ip={}", device.id, device.ip);
            result.not_found.push(device.ip.clone());
            if mode == ReconcileMode::Refresh && device.status != DeviceStatus::Unknown {
                result
                    .mutations
                    .push(StatusMutation::transition(device, DeviceStatus::Unknown, now));
            }
            continue;
        };

        let remote = DeviceStatus::from_remote(&entry.raw_status);
        if remote != device.status {
            info!(
                "device status changed device={} ip={} from={} to={}",
                device.id, device.ip, device.status, remote
            );
            result
                .mutations
                .push(StatusMutation::transition(device, remote, now));
        } else if remote == DeviceStatus::Up {
            debug!("device still up device={} ip={}", device.id, device.ip);
            result.mutations.push(StatusMutation::seen(device, now));
        }
    }

    result
}

/// Apply a mutation to an in-memory device
pub fn apply(device: &mut Device, mutation: &StatusMutation) {
    if let Some(status) = mutation.status {
        device.status = status;
    }
    if let Some(since) = mutation.status_since {
        device.status_since = since;
    }
    if let Some(seen) = mutation.last_seen {
        device.last_seen = Some(seen);
    }
}

/// Write each mutation as its own update; returns rows touched
pub fn persist_mutations(
    conn: &mut SqliteConnection,
    mutations: &[StatusMutation],
    now: NaiveDateTime,
) -> Result<usize, SyncError> {
    let mut touched = 0;
    for mutation in mutations {
        touched += db::update_device_status(conn, &mutation.device_id, &mutation.changeset(now))?;
    }
    Ok(touched)
}
