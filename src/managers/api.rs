use crate::constants::{limits, transport};
use crate::errors::BridgeError;
use crate::services::config::BridgeConfig;
use crate::services::logger::Logger;
use crate::services::secret::Secret;
use crate::utils::text::preview;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

/// One templated call: method, already-resolved path, optional raw body and
/// the caller's query as a JSON object string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub body: Option<String>,
    pub query: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            body: None,
            query: None,
        }
    }
}

/// Outcome of one call attempt. Always fully populated; transport failures
/// are recorded here instead of being raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    pub http_method: String,
    pub final_url: String,
    pub status_code: i32,
    pub status_message: String,
    pub is_successful: bool,
    pub raw_body: String,
}

impl ApiResult {
    fn no_response(http_method: String, final_url: String) -> Self {
        Self {
            http_method,
            final_url,
            status_code: transport::NO_RESPONSE_STATUS,
            status_message: transport::NO_RESPONSE_TEXT.to_string(),
            is_successful: false,
            raw_body: transport::NO_RESPONSE_TEXT.to_string(),
        }
    }
}

/// Shared HTTP front to the remote API. The pooled client is built once and
/// reused across invocations.
#[derive(Clone)]
pub struct ApiInvoker {
    logger: Logger,
    client: Client,
    base_url: String,
    timeout_ms: Option<u64>,
}

impl ApiInvoker {
    pub fn new(logger: Logger, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|err| {
                BridgeError::internal(format!("Failed to build HTTP client: {}", err))
            })?;
        Ok(Self::with_client(logger, client, config))
    }

    pub fn with_client(logger: Logger, client: Client, config: &BridgeConfig) -> Self {
        Self {
            logger: logger.child("api"),
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        }
    }

    /// Base origin + path + encoded query pairs.
    pub fn build_url(&self, path: &str, query: Option<&str>) -> Result<Url, BridgeError> {
        let path = path.trim_start_matches('/');
        let joined = if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        };
        let mut url = Url::parse(&joined).map_err(|_| {
            BridgeError::argument("Invalid endpoint URL")
                .with_details(serde_json::json!({"url": joined}))
        })?;

        let pairs = parse_query(query)?;
        if !pairs.is_empty() {
            let encoded = serde_urlencoded::to_string(&pairs)
                .map_err(|_| BridgeError::argument("Query must be a flat JSON object"))?;
            let combined = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, encoded),
                _ => encoded,
            };
            url.set_query(Some(&combined));
        }
        Ok(url)
    }

    pub async fn call(&self, request: &ApiRequest, secret: &Secret) -> Result<ApiResult, BridgeError> {
        let method_name = request.method.trim().to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_| {
            BridgeError::argument(format!("Invalid HTTP method '{}'", request.method))
        })?;
        let url = self.build_url(&request.path, request.query.as_deref())?;
        let final_url = url.to_string();

        let mut authorization = secret
            .with_exposed(|token| HeaderValue::from_str(&format!("Bearer {}", token)))
            .map_err(|_| {
                BridgeError::configuration("Bearer token contains characters not allowed in headers")
            })?;
        authorization.set_sensitive(true);

        let body = request.body.as_deref().filter(|b| !b.is_empty());
        let mut meta = serde_json::json!({"method": method_name, "url": final_url});
        if let Some(body) = body {
            meta["body"] = Value::String(body.to_string());
        }
        self.logger.info("Calling endpoint", Some(&meta));

        let mut req = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, authorization);
        if let Some(body) = body {
            req = req
                .header(CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body.to_string());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            req = req.timeout(Duration::from_millis(timeout_ms));
        }

        let started = Instant::now();
        let result = match req.send().await {
            Ok(response) => {
                let status = response.status();
                let status_message = status_name(status)
                    .map(str::to_string)
                    .unwrap_or_else(|| status.as_u16().to_string());
                let mut is_successful = status.is_success() || status.is_redirection();
                let raw_body = match response.text().await {
                    Ok(text) => text,
                    Err(err) => {
                        self.logger.warn(
                            "Failed to read response body",
                            Some(&serde_json::json!({"error": err.to_string()})),
                        );
                        is_successful = false;
                        String::new()
                    }
                };
                ApiResult {
                    http_method: method_name,
                    final_url,
                    status_code: i32::from(status.as_u16()),
                    status_message,
                    is_successful,
                    raw_body,
                }
            }
            Err(err) => {
                self.logger.warn(
                    "Request failed without a response",
                    Some(&serde_json::json!({"error": err.to_string()})),
                );
                ApiResult::no_response(method_name, final_url)
            }
        };

        self.logger.info(
            "Endpoint call completed",
            Some(&serde_json::json!({
                "http_method": result.http_method,
                "endpoint_url": result.final_url,
                "status_code": result.status_code,
                "status_message": result.status_message,
                "is_successful": result.is_successful,
                "raw_response": preview(&result.raw_body, limits::LOG_RESPONSE_PREVIEW_CHARS),
                "duration_ms": started.elapsed().as_millis(),
            })),
        );
        Ok(result)
    }
}

/// Host-facing status name: the PascalCase identifier automation scripts
/// compare against (`OK`, `NotFound`, `TooManyRequests`). Aliased codes use
/// the RFC name. Unnamed codes have none.
pub fn status_name(status: StatusCode) -> Option<&'static str> {
    let name = match status.as_u16() {
        100 => "Continue",
        101 => "SwitchingProtocols",
        102 => "Processing",
        103 => "EarlyHints",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "NonAuthoritativeInformation",
        204 => "NoContent",
        205 => "ResetContent",
        206 => "PartialContent",
        207 => "MultiStatus",
        208 => "AlreadyReported",
        226 => "IMUsed",
        300 => "MultipleChoices",
        301 => "MovedPermanently",
        302 => "Found",
        303 => "SeeOther",
        304 => "NotModified",
        305 => "UseProxy",
        306 => "Unused",
        307 => "TemporaryRedirect",
        308 => "PermanentRedirect",
        400 => "BadRequest",
        401 => "Unauthorized",
        402 => "PaymentRequired",
        403 => "Forbidden",
        404 => "NotFound",
        405 => "MethodNotAllowed",
        406 => "NotAcceptable",
        407 => "ProxyAuthenticationRequired",
        408 => "RequestTimeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "LengthRequired",
        412 => "PreconditionFailed",
        413 => "RequestEntityTooLarge",
        414 => "RequestUriTooLong",
        415 => "UnsupportedMediaType",
        416 => "RequestedRangeNotSatisfiable",
        417 => "ExpectationFailed",
        421 => "MisdirectedRequest",
        422 => "UnprocessableEntity",
        423 => "Locked",
        424 => "FailedDependency",
        426 => "UpgradeRequired",
        428 => "PreconditionRequired",
        429 => "TooManyRequests",
        431 => "RequestHeaderFieldsTooLarge",
        451 => "UnavailableForLegalReasons",
        500 => "InternalServerError",
        501 => "NotImplemented",
        502 => "BadGateway",
        503 => "ServiceUnavailable",
        504 => "GatewayTimeout",
        505 => "HttpVersionNotSupported",
        506 => "VariantAlsoNegotiates",
        507 => "InsufficientStorage",
        508 => "LoopDetected",
        510 => "NotExtended",
        511 => "NetworkAuthenticationRequired",
        _ => return None,
    };
    Some(name)
}

/// Decodes the caller's query JSON object into ordered string pairs.
/// Scalars are stringified and nulls dropped; nested values are rejected.
pub fn parse_query(raw: Option<&str>) -> Result<Vec<(String, String)>, BridgeError> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(Vec::new()),
    };
    let parsed: Value = serde_json::from_str(raw).map_err(|err| {
        BridgeError::argument(format!("Query is not valid JSON: {}", err))
            .with_hint("Pass Query as a JSON object, e.g. {\"limit\":\"10\"}.")
    })?;
    let map = match parsed {
        Value::Object(map) => map,
        _ => {
            return Err(BridgeError::argument("Query must be a JSON object")
                .with_hint("Pass Query as a JSON object, e.g. {\"limit\":\"10\"}."))
        }
    };
    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let rendered = match value {
            Value::Null => continue,
            Value::String(text) => text,
            Value::Number(num) => num.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(BridgeError::argument(format!(
                    "Query value for '{}' must be a string",
                    key
                )))
            }
        };
        pairs.push((key, rendered));
    }
    Ok(pairs)
}
