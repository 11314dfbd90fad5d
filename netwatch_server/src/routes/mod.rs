use log::error;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;

use crate::error::{ErrorKind, ErrorReport, SyncError};

pub mod devices;
pub mod netwatch;
pub mod pages;
pub mod settings;

pub type ApiError = Custom<Json<ErrorReport>>;
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Turn a failed operation into a JSON error body with a matching status
pub fn api_error(err: SyncError) -> ApiError {
    let status = match err.kind() {
        ErrorKind::ValidationError => Status::UnprocessableEntity,
        ErrorKind::DuplicateKey => Status::Conflict,
        ErrorKind::NotFound => Status::NotFound,
        ErrorKind::NotConfigured => Status::PreconditionFailed,
        ErrorKind::Timeout => Status::GatewayTimeout,
        ErrorKind::AuthFailure
        | ErrorKind::ConnectionRefused
        | ErrorKind::NetworkUnreachable => Status::BadGateway,
        ErrorKind::Unknown => Status::InternalServerError,
    };
    if status == Status::InternalServerError {
        error!("request failed: {err}");
    }
    Custom(status, Json(ErrorReport::from(&err)))
}

/// API routes
pub fn api_routes() -> Vec<Route> {
    routes![
        // Devices
        devices::get_devices,
        devices::get_device,
        devices::create_device,
        devices::update_device,
        devices::delete_device,

        // Netwatch
        netwatch::refresh,
        netwatch::discover,
        netwatch::import,
        netwatch::test_connection,

        // Settings
        settings::view_settings,
        settings::update_settings,
    ]
}

/// Page routes
pub fn page_routes() -> Vec<Route> {
    routes![pages::dashboard]
}
