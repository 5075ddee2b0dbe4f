pub mod client;
pub mod clients;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod websocket;
pub mod ws;

use std::sync::Arc;
use tracing::{error, info, warn};

use clients::execution_client::ExecutionClient;
use config::Config;
use ws::registry::{RegistrySettings, RoomRegistry};

/// Shared state handed to every request and socket handler.
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub execution: Option<ExecutionClient>,
    pub service_name: String,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let execution = match &config.execution_url {
            Some(url) => match ExecutionClient::new(url.clone(), config.execution_timeout()) {
                Ok(client) => {
                    info!("Execution service configured at {}", client.url());
                    Some(client)
                }
                Err(e) => {
                    error!("Failed to build execution client: {}", e);
                    None
                }
            },
            None => {
                warn!("No execution URL configured - /api/v1/run will be unavailable");
                None
            }
        };

        Self {
            registry: Arc::new(RoomRegistry::new(RegistrySettings::from(config))),
            execution,
            service_name: config.service_name.clone(),
        }
    }
}
