use chrono::Utc;
use log::error;
use rocket::State;
use rocket_dyn_templates::{Template, context};

use crate::devices;
use crate::state::AppState;

#[get("/")]
pub async fn dashboard(state: &State<AppState>) -> Template {
    let all_devices = devices::list_devices(&state.sync)
        .await
        .unwrap_or_else(|err| {
            error!("dashboard device load failed kind={} detail={}", err.kind(), err);
            Vec::new()
        });
    let config = state.sync.load_config().await.unwrap_or_else(|err| {
        error!("dashboard settings load failed kind={} detail={}", err.kind(), err);
        None
    });
    let configured = config.as_ref().is_some_and(|c| c.is_configured());

    Template::render("dashboard", context! {
        devices: all_devices,
        configured: configured,
        host: config.as_ref().and_then(|c| c.host.clone()),
        polling_interval: config.as_ref().map(|c| c.polling_interval),
        now: Utc::now().naive_utc(),
    })
}
