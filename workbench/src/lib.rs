use std::sync::Arc;

pub mod client;
pub mod config;
pub mod model;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;

use config::AppConfig;
use routes::sessions::SessionRegistry;
use service::LocalCorpusService;
use storage::StoragesStatus;

pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<LocalCorpusService>,
    pub sessions: SessionRegistry,
    pub storages_status: StoragesStatus,
}
