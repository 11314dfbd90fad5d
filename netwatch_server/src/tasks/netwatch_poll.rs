use std::time::Duration;

use log::{error, info, warn};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Build, Rocket, tokio};

use crate::state::AppState;
use crate::sync::SyncContext;
use crate::sync::cycle::run_cycle;
use crate::sync::reconcile::ReconcileMode;

/// Background loop that keeps device status in line with netwatch
pub struct ReconciliationScheduler {
    ctx: SyncContext,
    fallback_interval: Duration,
    last_interval: Option<Duration>,
}

impl ReconciliationScheduler {
    pub fn new(ctx: SyncContext, fallback_interval: Duration) -> Self {
        Self {
            ctx,
            fallback_interval,
            last_interval: None,
        }
    }

    /// Run forever; no error leaves this loop
    pub async fn run(mut self) {
        info!(
            "netwatch scheduler started fallback_interval_secs={}",
            self.fallback_interval.as_secs()
        );
        loop {
            let wait = self.tick().await;
            tokio::time::sleep(wait).await;
        }
    }

    /// One iteration; returns how long to sleep before the next
    pub async fn tick(&mut self) -> Duration {
        let config = match self.ctx.load_config().await {
            Ok(config) => config,
            Err(err) => {
                error!("netwatch cycle failed kind={} detail={}", err.kind(), err);
                return self.idle_interval();
            }
        };

        let Some(config) = config else {
            info!("netwatch not configured, skipping cycle");
            return self.idle_interval();
        };

        let interval = config.polling_duration();
        self.last_interval = Some(interval);

        let Some(params) = config.connection_params(self.ctx.gateway_timeout) else {
            info!("netwatch host not set, skipping cycle");
            return interval;
        };

        info!("netwatch cycle starting host={}", params.host);
        match run_cycle(&self.ctx, &params, ReconcileMode::Poll).await {
            Ok(report) => info!(
                "netwatch cycle finished devices={} updated={} not_found={}",
                report.devices,
                report.updated,
                report.not_found.len()
            ),
            Err(err) => warn!("netwatch cycle failed kind={} detail={}", err.kind(), err),
        }

        interval
    }

    fn idle_interval(&self) -> Duration {
        self.last_interval.unwrap_or(self.fallback_interval)
    }
}

pub struct NetwatchPollFairing;

#[rocket::async_trait]
impl Fairing for NetwatchPollFairing {
    fn info(&self) -> Info {
        Info {
            name: "Netwatch Reconciliation",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(state) = rocket.state::<AppState>() else {
            error!("AppState not managed; netwatch scheduler not started");
            return Err(rocket);
        };

        let scheduler =
            ReconciliationScheduler::new(state.sync.clone(), state.config.fallback_poll_interval);
        tokio::spawn(scheduler.run());

        Ok(rocket)
    }
}
