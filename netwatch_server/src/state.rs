use crate::config::AppConfig;
use crate::sync::SyncContext;

pub struct AppState {
    pub sync: SyncContext,
    pub config: AppConfig,
}
