use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::device_type::DeviceType;
use crate::error::SyncError;
use crate::models::{Device, DeviceChangeset, DeviceStatus, NewDevice};
use crate::sync::SyncContext;
use crate::sync::push::push_if_requested;

/// Device creation form
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub status: Option<String>,
    pub comment: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    /// Also add the device to the router's netwatch list
    #[serde(default)]
    pub push_to_netwatch: bool,
}

/// Operator edit; absent fields are left unchanged
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub ip: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub status: Option<String>,
    pub comment: Option<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CreatedDevice {
    pub device: Device,
    /// Set when the requested netwatch push did not go through
    pub warning: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String, SyncError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn parse_type(raw: Option<&str>) -> Result<Option<DeviceType>, SyncError> {
    raw.map(|t| t.parse().map_err(SyncError::Validation)).transpose()
}

fn parse_status(raw: Option<&str>) -> Result<Option<DeviceStatus>, SyncError> {
    raw.map(|s| s.parse().map_err(SyncError::Validation)).transpose()
}

fn clean_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

pub async fn list_devices(ctx: &SyncContext) -> Result<Vec<Device>, SyncError> {
    ctx.with_conn(|conn| Ok(db::list_devices(conn)?)).await
}

pub async fn get_device(ctx: &SyncContext, device_id: String) -> Result<Device, SyncError> {
    ctx.with_conn(move |conn| db::find_device(conn, &device_id)?.ok_or(SyncError::NotFound(device_id)))
        .await
}

/// Store the device first, then try the optional netwatch push.
/// A failed push only adds a warning; the device stays created.
pub async fn create_device(ctx: &SyncContext, input: DeviceInput) -> Result<CreatedDevice, SyncError> {
    let name = required("name", &input.name)?;
    let ip = required("ip", &input.ip)?;
    let device_type = parse_type(input.device_type.as_deref())?.unwrap_or_default();
    let status = parse_status(input.status.as_deref())?.unwrap_or_default();
    let comment = clean_comment(input.comment);
    let position = (input.position_x.unwrap_or(0.0), input.position_y.unwrap_or(0.0));

    let device = ctx
        .with_conn(move |conn| {
            if db::find_device_by_ip(conn, &ip)?.is_some() {
                return Err(SyncError::DuplicateIp(ip));
            }
            let mut row = NewDevice::new(&name, &ip, device_type, status, comment, Utc::now().naive_utc());
            (row.position_x, row.position_y) = position;
            db::insert_device(conn, &row)?;
            db::find_device(conn, &row.id)?.ok_or(SyncError::NotFound(row.id))
        })
        .await?;

    info!("device created device={} ip={} type={}", device.id, device.ip, device.device_type);

    let push = push_if_requested(ctx, &device, input.push_to_netwatch).await;
    Ok(CreatedDevice {
        device,
        warning: push.warning,
    })
}

pub async fn update_device(
    ctx: &SyncContext,
    device_id: String,
    update: DeviceUpdate,
) -> Result<Device, SyncError> {
    let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
    let ip = update.ip.as_deref().map(|i| required("ip", i)).transpose()?;
    let device_type = parse_type(update.device_type.as_deref())?;
    let status = parse_status(update.status.as_deref())?;

    ctx.with_conn(move |conn| {
        let existing = db::find_device(conn, &device_id)?
            .ok_or_else(|| SyncError::NotFound(device_id.clone()))?;

        if let Some(new_ip) = ip.as_deref().filter(|i| *i != existing.ip) {
            if db::find_device_by_ip(conn, new_ip)?.is_some() {
                return Err(SyncError::DuplicateIp(new_ip.to_string()));
            }
        }

        let now = Utc::now().naive_utc();
        let status_changed = status.filter(|s| *s != existing.status);
        let changes = DeviceChangeset {
            name,
            ip,
            device_type: device_type.map(|t| t.as_str().to_string()),
            status: status_changed.map(|s| s.as_str().to_string()),
            status_since: status_changed.map(|_| now),
            comment: update.comment.map(|c| clean_comment(Some(c))),
            position_x: update.position_x,
            position_y: update.position_y,
            updated_at: Some(now),
        };
        db::update_device(conn, &device_id, &changes)?;

        db::find_device(conn, &device_id)?.ok_or(SyncError::NotFound(device_id))
    })
    .await
}

pub async fn delete_device(ctx: &SyncContext, device_id: String) -> Result<(), SyncError> {
    ctx.with_conn(move |conn| match db::delete_device(conn, &device_id)? {
        0 => Err(SyncError::NotFound(device_id)),
        _ => {
            info!("device deleted device={device_id}");
            Ok(())
        }
    })
    .await
}
