use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeErrorKind {
    Configuration,
    TemplateResolution,
    Argument,
    Upstream,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::Configuration, "CONFIGURATION", message)
    }

    pub fn template_resolution(message: impl Into<String>) -> Self {
        Self::new(
            BridgeErrorKind::TemplateResolution,
            "TEMPLATE_RESOLUTION",
            message,
        )
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::Argument, "ARGUMENT", message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::Upstream, "UPSTREAM", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::Internal, "INTERNAL", message)
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{BridgeError, BridgeErrorKind};

    #[test]
    fn constructors_assign_kind_and_code() {
        let err = BridgeError::template_resolution("missing {user}");
        assert_eq!(err.kind, BridgeErrorKind::TemplateResolution);
        assert_eq!(err.code, "TEMPLATE_RESOLUTION");
        assert_eq!(err.to_string(), "missing {user}");
    }

    #[test]
    fn serialized_error_omits_empty_hint_and_details() {
        let err = BridgeError::argument("bad query");
        let json = serde_json::to_value(&err).expect("serialize error");
        assert_eq!(json["kind"], "argument");
        assert!(json.get("hint").is_none());
        assert!(json.get("details").is_none());

        let hinted = err.with_hint("Provide a JSON object");
        let json = serde_json::to_value(&hinted).expect("serialize error");
        assert_eq!(json["hint"], "Provide a JSON object");
    }
}
