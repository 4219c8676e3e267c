use crate::app::App;
use crate::constants::args as arg_keys;
use crate::errors::BridgeError;
use crate::services::config::BridgeConfig;
use crate::services::host::{
    read_global_bytes, ArgumentStore, MemoryArgumentStore, MemoryGlobalStore,
};
use crate::services::security::Security;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "se-bridge", version, about = "Call StreamElements API endpoints from automation hosts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one templated API call and print the published outputs as JSON.
    Invoke {
        #[arg(long)]
        path: String,
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// JSON object of query parameters, e.g. '{"limit":"10"}'.
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        parse_response: bool,
        /// Extra arguments for path placeholders, as key=value.
        #[arg(long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,
        /// JSON object file standing in for the host's global variables.
        #[arg(long)]
        globals: Option<PathBuf>,
    },
    /// Protect a bearer token for storage in the host's global variables.
    Protect {
        /// Environment variable holding the plaintext token.
        #[arg(long)]
        token_env: String,
        /// Base64 salt; defaults to the SE_BRIDGE_ENTROPY environment value.
        #[arg(long)]
        salt: Option<String>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn invocation_store(
    path: String,
    method: Option<String>,
    body: Option<String>,
    query: Option<String>,
    parse_response: bool,
    extra: Vec<(String, String)>,
) -> MemoryArgumentStore {
    let store = MemoryArgumentStore::new();
    for (key, value) in extra {
        store.set(&key, Value::String(value));
    }
    store.set(arg_keys::PATH, Value::String(path));
    if let Some(method) = method {
        store.set(arg_keys::METHOD, Value::String(method));
    }
    if let Some(body) = body {
        store.set(arg_keys::BODY, Value::String(body));
    }
    if let Some(query) = query {
        store.set(arg_keys::QUERY, Value::String(query));
    }
    store.set(arg_keys::PARSE_RESPONSE, Value::Bool(parse_response));
    store
}

fn print_error(err: &BridgeError) {
    let rendered = serde_json::to_string(err).unwrap_or_else(|_| err.message.clone());
    eprintln!("{}", rendered);
}

pub async fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Invoke {
            path,
            method,
            body,
            query,
            parse_response,
            args,
            globals,
        } => {
            let store = invocation_store(path, method, body, query, parse_response, args);
            match invoke(&store, globals).await {
                Ok(outputs) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&outputs).unwrap_or_default()
                    );
                    0
                }
                Err(err) => {
                    print_error(&err);
                    1
                }
            }
        }
        Command::Protect { token_env, salt } => match protect(&token_env, salt) {
            Ok(blob) => {
                println!("{}", blob);
                0
            }
            Err(err) => {
                print_error(&err);
                1
            }
        },
    }
}

async fn invoke(store: &MemoryArgumentStore, globals: Option<PathBuf>) -> Result<Value, BridgeError> {
    let config = BridgeConfig::from_env()?;
    let globals = App::load_globals(&config, globals.as_deref())?;
    let app = App::initialize(config, globals)?;
    let published = app.bridge.run(store).await?;
    Ok(Value::Object(published.outputs.into_iter().collect()))
}

fn protect(token_env: &str, salt: Option<String>) -> Result<String, BridgeError> {
    let token = std::env::var(token_env)
        .ok()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            BridgeError::configuration(format!("Environment variable '{}' is not set", token_env))
        })?;
    let config = BridgeConfig::from_env()?;
    let salt_store = MemoryGlobalStore::new();
    if let Some(salt) = salt.or_else(|| std::env::var("SE_BRIDGE_ENTROPY").ok()) {
        salt_store.insert(&config.entropy_global, Value::String(salt));
    }
    let salt = read_global_bytes(&salt_store, &config.entropy_global)?;
    Security::from_env()?.protect(&token, &salt)
}
