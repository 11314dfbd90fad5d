#[macro_use]
extern crate rocket;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use rocket_dyn_templates::Template;

mod config;
mod db;
mod device_type;
mod devices;
mod error;
mod gateway;
mod logging;
mod models;
mod routes;
mod schema;
mod settings;
mod state;
mod sync;
mod tasks;

use config::AppConfig;
use gateway::rest::RestGatewayFactory;
use state::AppState;
use sync::SyncContext;
use tasks::netwatch_poll::NetwatchPollFairing;

#[rocket::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    let _logger = logging::init_logging(&config)?;

    let pool = db::pool::init_pool(&config.database_url)
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    {
        let mut conn = pool.get().context("failed to get a DB connection")?;
        db::run_migrations(&mut conn)?;
    }

    let sync = SyncContext::new(pool, Arc::new(RestGatewayFactory), config.gateway_timeout);
    info!("starting netwatch server database={}", config.database_url);

    rocket::build()
        .manage(AppState { sync, config })
        .mount("/api", routes::api_routes())
        .mount("/", routes::page_routes())
        .attach(Template::fairing())
        .attach(NetwatchPollFairing)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("rocket failed: {e}"))?;

    Ok(())
}
