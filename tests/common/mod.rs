#![allow(dead_code)]

use base64::Engine;
use once_cell::sync::Lazy;
use se_bridge::managers::bridge::StreamElementsBridge;
use se_bridge::services::config::BridgeConfig;
use se_bridge::services::host::MemoryGlobalStore;
use se_bridge::services::logger::{LogLevel, LogSink, Logger};
use se_bridge::services::security::Security;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const KEY: &str = "8f1c2a7d9e3b4f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8";
pub const TOKEN: &str = "jwt-123";
pub const SALT: &[u8] = b"entropy-salt";

#[derive(Default)]
pub struct CaptureSink {
    lines: StdMutex<Vec<String>>,
}

impl CaptureSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("capture lock").clone()
    }
}

impl LogSink for CaptureSink {
    fn write(&self, _level: LogLevel, line: &str) {
        self.lines.lock().expect("capture lock").push(line.to_string());
    }
}

pub fn security() -> Security {
    Security::from_key_material(KEY).expect("test key")
}

pub fn protect(token: &str) -> String {
    security().protect(token, SALT).expect("protect token")
}

pub fn globals_with_token(token: &str) -> Arc<MemoryGlobalStore> {
    let globals = Arc::new(MemoryGlobalStore::new());
    let config = BridgeConfig::default();
    globals.insert(&config.token_global, serde_json::Value::String(protect(token)));
    globals.insert(
        &config.entropy_global,
        serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(SALT)),
    );
    globals
}

pub struct Harness {
    pub bridge: StreamElementsBridge,
    pub globals: Arc<MemoryGlobalStore>,
    pub sink: Arc<CaptureSink>,
}

pub fn harness(base_url: &str) -> Harness {
    harness_with_globals(base_url, globals_with_token(TOKEN))
}

pub fn harness_with_globals(base_url: &str, globals: Arc<MemoryGlobalStore>) -> Harness {
    let sink = Arc::new(CaptureSink::default());
    let mut logger = Logger::with_sink("test", sink.clone());
    logger.set_level(LogLevel::Debug);
    let config = BridgeConfig::default()
        .with_base_url(format!("{}/kappa", base_url))
        .validate()
        .expect("test config");
    let bridge = StreamElementsBridge::new(logger, config, globals.clone(), Arc::new(security()))
        .expect("bridge");
    Harness {
        bridge,
        globals,
        sink,
    }
}
