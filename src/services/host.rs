//! Typed seams to the automation host: its argument channel and its
//! global-variable store.

use crate::errors::BridgeError;
use base64::Engine;
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

/// Immutable view of the caller's arguments for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentBag {
    entries: Vec<(String, Value)>,
}

impl ArgumentBag {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First entry whose key equals `key` ignoring case, in insertion order.
    pub fn find_ignore_case(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for ArgumentBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// The host's key/value argument channel, used for input and output.
pub trait ArgumentStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn snapshot(&self) -> ArgumentBag;
}

/// The host's global-variable store.
pub trait GlobalStore: Send + Sync {
    fn get_global(&self, key: &str) -> Option<Value>;
}

#[derive(Debug, Default)]
pub struct MemoryArgumentStore {
    entries: Mutex<Vec<(String, Value)>>,
}

impl MemoryArgumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let store = Self::new();
        for (key, value) in pairs {
            store.set(&key.into(), value);
        }
        store
    }
}

impl ArgumentStore for MemoryArgumentStore {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    fn set(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        if let Some(slot) = entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            entries.push((key.to_string(), value));
        }
    }

    fn snapshot(&self) -> ArgumentBag {
        let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        ArgumentBag::new(entries.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryGlobalStore {
    values: Mutex<serde_json::Map<String, Value>>,
}

impl MemoryGlobalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        let mut values = self.values.lock().unwrap_or_else(|err| err.into_inner());
        values.insert(key.to_string(), value);
    }

    pub fn remove(&self, key: &str) {
        let mut values = self.values.lock().unwrap_or_else(|err| err.into_inner());
        values.remove(key);
    }

    /// Loads globals from a file holding a single JSON object.
    pub fn from_json_file(path: &Path) -> Result<Self, BridgeError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BridgeError::configuration(format!("Failed to read globals file: {}", err))
                .with_details(serde_json::json!({"path": path.display().to_string()}))
        })?;
        let parsed: Value = serde_json::from_str(&raw).map_err(|err| {
            BridgeError::configuration(format!("Globals file is not valid JSON: {}", err))
                .with_details(serde_json::json!({"path": path.display().to_string()}))
        })?;
        match parsed {
            Value::Object(map) => Ok(Self {
                values: Mutex::new(map),
            }),
            _ => Err(BridgeError::configuration("Globals file must contain a JSON object")
                .with_details(serde_json::json!({"path": path.display().to_string()}))),
        }
    }
}

impl GlobalStore for MemoryGlobalStore {
    fn get_global(&self, key: &str) -> Option<Value> {
        let values = self.values.lock().unwrap_or_else(|err| err.into_inner());
        values.get(key).cloned()
    }
}

/// Reads a global as a non-empty string; anything else counts as absent.
pub fn read_global_string(store: &dyn GlobalStore, key: &str) -> Option<String> {
    match store.get_global(key)? {
        Value::String(text) if !text.is_empty() => Some(text),
        _ => None,
    }
}

/// Reads a salt stored either as base64 text or as an array of byte values.
/// An absent salt is an empty one.
pub fn read_global_bytes(store: &dyn GlobalStore, key: &str) -> Result<Vec<u8>, BridgeError> {
    match store.get_global(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) => base64::engine::general_purpose::STANDARD
            .decode(text.trim().as_bytes())
            .map_err(|_| {
                BridgeError::configuration(format!("Global variable '{}' is not valid base64", key))
            }),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| {
                        BridgeError::configuration(format!(
                            "Global variable '{}' must contain byte values (0-255)",
                            key
                        ))
                    })
            })
            .collect(),
        Some(_) => Err(BridgeError::configuration(format!(
            "Global variable '{}' must be base64 text or a byte array",
            key
        ))),
    }
}
