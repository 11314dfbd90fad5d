use log::info;
use rocket::State;
use rocket::serde::json::Json;

use crate::db;
use crate::models::SystemConfig;
use crate::routes::{ApiResult, api_error};
use crate::settings::SettingsUpdate;
use crate::state::AppState;

/// VIEW SETTINGS (password never included)
#[get("/settings")]
pub async fn view_settings(state: &State<AppState>) -> ApiResult<SystemConfig> {
    state
        .sync
        .load_config()
        .await
        .map(|config| Json(config.unwrap_or_default()))
        .map_err(api_error)
}

/// UPDATE SETTINGS; takes effect on the next cycle
#[put("/settings", format = "json", data = "<update>")]
pub async fn update_settings(
    state: &State<AppState>,
    update: Json<SettingsUpdate>,
) -> ApiResult<SystemConfig> {
    let update = update.into_inner();

    let saved = state
        .sync
        .with_conn(move |conn| {
            let existing = db::load_config(conn)?;
            let settings = update.apply(existing)?;
            db::save_config(conn, &settings)?;
            Ok(settings)
        })
        .await
        .map_err(api_error)?;

    info!(
        "netwatch settings updated host={:?} port={} polling_interval={}",
        saved.host, saved.port, saved.polling_interval
    );
    Ok(Json(saved))
}
