use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;

use crate::devices::{self as service, CreatedDevice, DeviceInput, DeviceUpdate};
use crate::models::Device;
use crate::routes::{ApiError, ApiResult, api_error};
use crate::state::AppState;

/// Get all devices
#[get("/devices")]
pub async fn get_devices(state: &State<AppState>) -> ApiResult<Vec<Device>> {
    service::list_devices(&state.sync).await.map(Json).map_err(api_error)
}

/// Get details for a specific device
#[get("/devices/<device_id>")]
pub async fn get_device(state: &State<AppState>, device_id: &str) -> ApiResult<Device> {
    service::get_device(&state.sync, device_id.to_string())
        .await
        .map(Json)
        .map_err(api_error)
}

/// Create a device, optionally pushing it to netwatch
#[post("/devices", format = "json", data = "<input>")]
pub async fn create_device(
    state: &State<AppState>,
    input: Json<DeviceInput>,
) -> Result<Custom<Json<CreatedDevice>>, ApiError> {
    let created = service::create_device(&state.sync, input.into_inner())
        .await
        .map_err(api_error)?;
    Ok(Custom(Status::Created, Json(created)))
}

/// Edit a device
#[put("/devices/<device_id>", format = "json", data = "<update>")]
pub async fn update_device(
    state: &State<AppState>,
    device_id: &str,
    update: Json<DeviceUpdate>,
) -> ApiResult<Device> {
    service::update_device(&state.sync, device_id.to_string(), update.into_inner())
        .await
        .map(Json)
        .map_err(api_error)
}

/// Delete a device
#[delete("/devices/<device_id>")]
pub async fn delete_device(state: &State<AppState>, device_id: &str) -> Result<Status, ApiError> {
    service::delete_device(&state.sync, device_id.to_string())
        .await
        .map_err(api_error)?;
    Ok(Status::NoContent)
}
