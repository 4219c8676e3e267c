use std::env;
use std::path::PathBuf;

fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if lowered == "undefined" || lowered == "null" {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn resolve_home_dir() -> Option<PathBuf> {
    env::var("HOME").ok().map(PathBuf::from)
}

fn resolve_xdg_state_dir() -> Option<PathBuf> {
    if let Some(path) = normalize_env_path(env::var("XDG_STATE_HOME").ok()) {
        return Some(path);
    }
    resolve_home_dir().map(|home| home.join(".local").join("state"))
}

pub fn resolve_state_dir() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("SE_BRIDGE_STATE_DIR").ok()) {
        return path;
    }
    if let Some(path) = resolve_xdg_state_dir() {
        return path.join("se-bridge");
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

pub fn resolve_key_path() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("SE_BRIDGE_KEY_PATH").ok()) {
        return path;
    }
    resolve_state_dir().join("bridge.key")
}
