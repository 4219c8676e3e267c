use crate::constants::{args as arg_keys, outputs};
use crate::errors::BridgeError;
use crate::managers::api::{ApiInvoker, ApiRequest, ApiResult};
use crate::services::config::BridgeConfig;
use crate::services::host::{
    read_global_bytes, read_global_string, ArgumentBag, ArgumentStore, GlobalStore,
};
use crate::services::identity::AccountIdentityCache;
use crate::services::logger::Logger;
use crate::services::secret::Unprotect;
use crate::services::vault::CredentialVault;
use crate::utils::flatten::flatten;
use crate::utils::template::{check_placeholders, references_channel, resolve_path};
use serde_json::Value;
use std::sync::Arc;

/// Caller arguments after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationArgs {
    pub method: String,
    pub path_template: String,
    pub body: Option<String>,
    pub query: Option<String>,
    pub parse_response: bool,
}

/// What one successful invocation wrote back to the host, in publish order.
#[derive(Debug, Clone)]
pub struct Published {
    pub result: ApiResult,
    pub outputs: Vec<(String, Value)>,
}

/// Entry point the automation host calls once per action run. State that
/// outlives a run (unlocked credential, account id, HTTP pool) lives here.
pub struct StreamElementsBridge {
    logger: Logger,
    config: BridgeConfig,
    globals: Arc<dyn GlobalStore>,
    vault: CredentialVault,
    identity: AccountIdentityCache,
    invoker: ApiInvoker,
}

impl StreamElementsBridge {
    pub fn new(
        logger: Logger,
        config: BridgeConfig,
        globals: Arc<dyn GlobalStore>,
        unprotect: Arc<dyn Unprotect>,
    ) -> Result<Self, BridgeError> {
        let invoker = ApiInvoker::new(logger.clone(), &config)?;
        Ok(Self::with_invoker(logger, config, globals, unprotect, invoker))
    }

    pub fn with_invoker(
        logger: Logger,
        config: BridgeConfig,
        globals: Arc<dyn GlobalStore>,
        unprotect: Arc<dyn Unprotect>,
        invoker: ApiInvoker,
    ) -> Self {
        let vault = CredentialVault::new(logger.clone(), unprotect);
        let identity = AccountIdentityCache::new(logger.clone(), config.bootstrap_path.clone());
        Self {
            logger: logger.child("bridge"),
            config,
            globals,
            vault,
            identity,
            invoker,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn cached_account_id(&self) -> Option<&str> {
        self.identity.cached()
    }

    /// Runs one invocation and reports the host's success flag. Fatal errors
    /// are logged and nothing is published.
    pub async fn execute(&self, args: &dyn ArgumentStore) -> bool {
        self.logger.info("Execution started", None);
        match self.run(args).await {
            Ok(_) => {
                self.logger.info("Execution completed", None);
                true
            }
            Err(err) => {
                self.logger.error(
                    &format!("Execution failed: {}", err.message),
                    Some(&serde_json::json!({
                        "code": err.code,
                        "hint": err.hint,
                        "details": err.details,
                    })),
                );
                false
            }
        }
    }

    pub async fn run(&self, args: &dyn ArgumentStore) -> Result<Published, BridgeError> {
        let token = read_global_string(self.globals.as_ref(), &self.config.token_global);
        let salt = read_global_bytes(self.globals.as_ref(), &self.config.entropy_global)?;
        let secret = self.vault.unlock(token.as_deref(), &salt).map_err(|err| {
            err.with_details(serde_json::json!({"global": self.config.token_global}))
        })?;

        let bag = args.snapshot();
        let invocation = read_arguments(&bag)?;
        self.logger.info(
            "Fetched arguments",
            Some(&serde_json::json!({
                "method": invocation.method,
                "path": invocation.path_template,
                "body": invocation.body,
                "query": invocation.query,
                "parse_response": invocation.parse_response,
            })),
        );

        check_placeholders(&invocation.path_template, &bag)?;
        let account_id = if references_channel(&invocation.path_template) {
            Some(self.identity.resolve(&self.invoker, &secret).await?)
        } else {
            None
        };
        let path = resolve_path(&invocation.path_template, &bag, account_id.as_deref())?;

        let request = ApiRequest {
            method: invocation.method.clone(),
            path,
            body: invocation.body.clone(),
            query: invocation.query.clone(),
        };
        let result = self.invoker.call(&request, &secret).await?;

        let mut staged = self.result_outputs(&result);
        if invocation.parse_response {
            staged.extend(self.parsed_outputs(&result.raw_body));
        }
        for (key, value) in staged.iter() {
            args.set(key, value.clone());
        }
        Ok(Published {
            result,
            outputs: staged,
        })
    }

    fn result_outputs(&self, result: &ApiResult) -> Vec<(String, Value)> {
        vec![
            (
                self.config.output_key(outputs::HTTP_METHOD),
                Value::String(result.http_method.clone()),
            ),
            (
                self.config.output_key(outputs::ENDPOINT_URL),
                Value::String(result.final_url.clone()),
            ),
            (
                self.config.output_key(outputs::STATUS_CODE),
                Value::from(result.status_code),
            ),
            (
                self.config.output_key(outputs::STATUS_MESSAGE),
                Value::String(result.status_message.clone()),
            ),
            (
                self.config.output_key(outputs::IS_SUCCESSFUL),
                Value::Bool(result.is_successful),
            ),
            (
                self.config.output_key(outputs::RAW_RESPONSE),
                Value::String(result.raw_body.clone()),
            ),
        ]
    }

    fn parsed_outputs(&self, raw_body: &str) -> Vec<(String, Value)> {
        let prefix = self.config.output_key(outputs::PARSED_RESPONSE);
        match serde_json::from_str::<Value>(raw_body) {
            Ok(document) => flatten(&document, &prefix)
                .into_entries()
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
            Err(_) => {
                self.logger
                    .info("Response is not valid JSON; storing as plain text", None);
                vec![(prefix, Value::String(raw_body.to_string()))]
            }
        }
    }
}

pub fn read_arguments(bag: &ArgumentBag) -> Result<InvocationArgs, BridgeError> {
    let method = bag
        .get(arg_keys::METHOD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("GET")
        .to_uppercase();

    let path_template = bag
        .get(arg_keys::PATH)
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            BridgeError::configuration("Path was null, empty, or not provided")
                .with_hint("Set the 'Path' argument, e.g. \"/v2/channels/{channel}\".")
        })?;

    Ok(InvocationArgs {
        method,
        path_template,
        body: optional_text(bag.get(arg_keys::BODY)),
        query: optional_text(bag.get(arg_keys::QUERY)),
        parse_response: read_flag(bag.get(arg_keys::PARSE_RESPONSE)),
    })
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn read_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
