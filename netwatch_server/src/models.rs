use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::device_type::DeviceType;
use crate::schema::{devices, system_config};

/// Reachability of a device as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Up => "up",
            DeviceStatus::Down => "down",
            DeviceStatus::Unknown => "unknown",
        }
    }

    /// Netwatch reports "up"; every other value counts as down
    pub fn from_remote(raw: &str) -> Self {
        if raw == "up" {
            DeviceStatus::Up
        } else {
            DeviceStatus::Down
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(DeviceStatus::Up),
            "down" => Ok(DeviceStatus::Down),
            "unknown" => Ok(DeviceStatus::Unknown),
            other => Err(format!("unknown device status '{other}'")),
        }
    }
}

#[derive(Queryable, Identifiable, Selectable, Debug, Clone)]
#[diesel(table_name = devices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeviceRow {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub device_type: String,
    pub status: String,
    pub status_since: NaiveDateTime,
    pub last_seen: Option<NaiveDateTime>,
    pub comment: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub ip: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub status_since: NaiveDateTime,
    pub last_seen: Option<NaiveDateTime>,
    pub comment: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        let device_type = row.device_type.parse().unwrap_or_else(|_| {
            log::warn!("device {} has unrecognised type '{}'", row.id, row.device_type);
            DeviceType::default()
        });
        let status = row.status.parse().unwrap_or_else(|_| {
            log::warn!("device {} has unrecognised status '{}'", row.id, row.status);
            DeviceStatus::default()
        });

        Self {
            id: row.id,
            name: row.name,
            ip: row.ip,
            device_type,
            status,
            status_since: row.status_since,
            last_seen: row.last_seen,
            comment: row.comment,
            position_x: row.position_x,
            position_y: row.position_y,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = devices)]
pub struct NewDevice {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub device_type: String,
    pub status: String,
    pub status_since: NaiveDateTime,
    pub last_seen: Option<NaiveDateTime>,
    pub comment: Option<String>,
    pub position_x: f64,
    pub position_y: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewDevice {
    /// Fresh row with a new id; positions start at the origin.
    /// `last_seen` stays empty until a reconciliation sees the device up.
    pub fn new(
        name: &str,
        ip: &str,
        device_type: DeviceType,
        status: DeviceStatus,
        comment: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            ip: ip.to_string(),
            device_type: device_type.as_str().to_string(),
            status: status.as_str().to_string(),
            status_since: now,
            last_seen: None,
            comment,
            position_x: 0.0,
            position_y: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Operator edit; `None` leaves a column untouched
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = devices)]
pub struct DeviceChangeset {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub device_type: Option<String>,
    pub status: Option<String>,
    pub status_since: Option<NaiveDateTime>,
    pub comment: Option<Option<String>>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Columns the reconciler is allowed to touch
#[derive(AsChangeset, Debug, Clone, Default)]
#[diesel(table_name = devices)]
pub struct StatusChangeset {
    pub status: Option<String>,
    pub status_since: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = system_config)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    pub id: i32,
    pub host: Option<String>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub port: i32,
    pub use_tls: bool,
    pub polling_interval: i32,
    pub updated_at: NaiveDateTime,
}
