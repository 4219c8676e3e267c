use crate::errors::BridgeError;
use crate::managers::api::{ApiInvoker, ApiRequest};
use crate::services::logger::Logger;
use crate::services::secret::Secret;
use serde_json::Value;
use tokio::sync::OnceCell;

const ID_FIELD: &str = "_id";

/// Remote account id, fetched once through the bootstrap endpoint and kept
/// for the rest of the process. A failed bootstrap leaves the cache empty so
/// a later invocation can try again; a successful one is never refreshed.
pub struct AccountIdentityCache {
    logger: Logger,
    bootstrap_path: String,
    cell: OnceCell<String>,
}

impl AccountIdentityCache {
    pub fn new(logger: Logger, bootstrap_path: impl Into<String>) -> Self {
        Self {
            logger: logger.child("identity"),
            bootstrap_path: bootstrap_path.into(),
            cell: OnceCell::new(),
        }
    }

    pub fn cached(&self) -> Option<&str> {
        self.cell.get().map(String::as_str)
    }

    pub async fn resolve(&self, invoker: &ApiInvoker, secret: &Secret) -> Result<String, BridgeError> {
        let id = self
            .cell
            .get_or_try_init(|| async {
                self.logger
                    .info("Account id not cached; fetching value", None);
                let result = invoker
                    .call(&ApiRequest::get(self.bootstrap_path.clone()), secret)
                    .await?;
                if !result.is_successful {
                    return Err(BridgeError::upstream(format!(
                        "Account id bootstrap failed ({} {})",
                        result.status_code, result.status_message
                    ))
                    .with_details(serde_json::json!({
                        "url": result.final_url,
                        "status_code": result.status_code,
                    })));
                }
                let id = extract_id(&result.raw_body)?;
                self.logger.info("Account id resolved", None);
                Ok(id)
            })
            .await?;
        Ok(id.clone())
    }
}

fn extract_id(raw: &str) -> Result<String, BridgeError> {
    let document: Value = serde_json::from_str(raw).map_err(|_| {
        BridgeError::upstream("Account id bootstrap returned a non-JSON body")
    })?;
    match document {
        Value::Object(map) => match map.get(ID_FIELD) {
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.clone()),
            Some(Value::String(_)) | Some(Value::Null) | None => Err(BridgeError::upstream(
                format!("Account id bootstrap response has no '{}' field", ID_FIELD),
            )),
            Some(_) => Err(BridgeError::upstream(format!(
                "Account id bootstrap field '{}' is not a string",
                ID_FIELD
            ))),
        },
        _ => Err(BridgeError::upstream(
            "Account id bootstrap response is not a JSON object",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::extract_id;
    use crate::errors::BridgeErrorKind;

    #[test]
    fn extracts_string_id() {
        let id = extract_id(r#"{"_id":"abc123","username":"someone"}"#).expect("id");
        assert_eq!(id, "abc123");
    }

    #[test]
    fn missing_or_mistyped_id_is_upstream_error() {
        for body in [r#"{"username":"x"}"#, r#"{"_id":null}"#, r#"{"_id":42}"#, "[]", "oops"] {
            let err = extract_id(body).expect_err("must fail");
            assert_eq!(err.kind, BridgeErrorKind::Upstream, "body: {}", body);
        }
    }
}
