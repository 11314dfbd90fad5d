use log::warn;
use rocket::State;
use rocket::serde::json::{self, Json};

use crate::error::SyncError;
use crate::routes::{ApiResult, api_error};
use crate::state::AppState;
use crate::sync::connection_test::{self, ConnectionOverride, ConnectionTestResult};
use crate::sync::cycle::{self, RefreshReport};
use crate::sync::import::{self as importer, DiscoverReport, ImportCandidate, ImportOutcome};

/// Run one explicit refresh against netwatch
#[post("/netwatch/refresh")]
pub async fn refresh(state: &State<AppState>) -> Json<RefreshReport> {
    Json(cycle::refresh(&state.sync).await)
}

/// List netwatch hosts available for import
#[get("/netwatch/discover")]
pub async fn discover(state: &State<AppState>) -> Json<DiscoverReport> {
    Json(importer::discover(&state.sync).await)
}

/// Import a batch of devices; the whole batch is rejected if any entry is invalid
#[post("/netwatch/import", format = "json", data = "<candidates>")]
pub async fn import(
    state: &State<AppState>,
    candidates: Json<Vec<ImportCandidate>>,
) -> ApiResult<ImportOutcome> {
    importer::import(&state.sync, candidates.into_inner())
        .await
        .map(Json)
        .map_err(api_error)
}

/// Check connectivity with the stored settings or the ones posted.
/// An empty body tests the stored settings; a body that does not parse is
/// reported as a validation failure rather than ignored.
#[post("/netwatch/test", data = "<overrides>")]
pub async fn test_connection(
    state: &State<AppState>,
    overrides: Result<Json<ConnectionOverride>, json::Error<'_>>,
) -> Json<ConnectionTestResult> {
    let overrides = match overrides {
        Ok(form) => Some(form.into_inner()),
        Err(json::Error::Parse(body, _)) if body.trim().is_empty() => None,
        Err(err) => {
            warn!("netwatch connection test rejected kind=ValidationError detail={err}");
            let err = SyncError::Validation(format!("invalid connection settings: {err}"));
            return Json(ConnectionTestResult::failed(&err));
        }
    };
    Json(connection_test::test_connection(&state.sync, overrides).await)
}
