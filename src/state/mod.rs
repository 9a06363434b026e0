use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::mysql::MySqlConnector;
use crate::db::Connector;
use crate::token::TokenCodec;

/// Read-only state shared by every request. No connections live here; each
/// request opens its own through `connector`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub codec: Arc<TokenCodec>,
    pub connector: Arc<dyn Connector>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let connector = MySqlConnector::new(config.connect_timeout);
        Self::with_connector(config, Arc::new(connector))
    }

    pub fn with_connector(config: AppConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            codec: Arc::new(config.codec()),
            config: Arc::new(config),
            connector,
        }
    }
}
