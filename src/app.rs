use crate::errors::BridgeError;
use crate::managers::bridge::StreamElementsBridge;
use crate::services::config::BridgeConfig;
use crate::services::host::{GlobalStore, MemoryGlobalStore};
use crate::services::logger::Logger;
use crate::services::security::Security;
use std::path::Path;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub bridge: StreamElementsBridge,
}

impl App {
    /// Wires the bridge: key material comes from the environment, globals
    /// from the given store.
    pub fn initialize(
        config: BridgeConfig,
        globals: Arc<dyn GlobalStore>,
    ) -> Result<Self, BridgeError> {
        let logger = Logger::new("se-bridge");
        let security = Arc::new(Security::from_env()?);
        let bridge = StreamElementsBridge::new(logger.clone(), config, globals, security)?;
        Ok(Self { logger, bridge })
    }

    /// Globals from a JSON file when given, otherwise from
    /// `SE_BRIDGE_TOKEN` / `SE_BRIDGE_ENTROPY`.
    pub fn load_globals(
        config: &BridgeConfig,
        file: Option<&Path>,
    ) -> Result<Arc<dyn GlobalStore>, BridgeError> {
        if let Some(path) = file {
            return Ok(Arc::new(MemoryGlobalStore::from_json_file(path)?));
        }
        let store = MemoryGlobalStore::new();
        if let Ok(token) = std::env::var("SE_BRIDGE_TOKEN") {
            store.insert(&config.token_global, serde_json::Value::String(token));
        }
        if let Ok(entropy) = std::env::var("SE_BRIDGE_ENTROPY") {
            store.insert(&config.entropy_global, serde_json::Value::String(entropy));
        }
        Ok(Arc::new(store))
    }
}
