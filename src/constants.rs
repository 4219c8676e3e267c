pub mod network {
    pub const DEFAULT_BASE_URL: &str = "https://api.streamelements.com/kappa";
    pub const BOOTSTRAP_PATH: &str = "v2/channels/me";
    pub const USER_AGENT: &str = concat!("se-bridge/", env!("CARGO_PKG_VERSION"));
}

pub mod globals {
    pub const TOKEN: &str = "DPAPIEncryption.StreamElementsJwtToken";
    pub const ENTROPY: &str = "DPAPIEncryption.Entropy";
}

pub mod args {
    pub const METHOD: &str = "Method";
    pub const PATH: &str = "Path";
    pub const BODY: &str = "Body";
    pub const QUERY: &str = "Query";
    pub const PARSE_RESPONSE: &str = "ParseResponse";
}

pub mod outputs {
    pub const DEFAULT_PREFIX: &str = "StreamElements";
    pub const HTTP_METHOD: &str = "HttpMethod";
    pub const ENDPOINT_URL: &str = "EndpointUrl";
    pub const STATUS_CODE: &str = "StatusCode";
    pub const STATUS_MESSAGE: &str = "StatusMessage";
    pub const IS_SUCCESSFUL: &str = "IsSuccessful";
    pub const RAW_RESPONSE: &str = "RawResponse";
    pub const PARSED_RESPONSE: &str = "ParsedResponse";
}

pub mod transport {
    pub const NO_RESPONSE_STATUS: i32 = -1;
    pub const NO_RESPONSE_TEXT: &str = "No response";
}

pub mod limits {
    pub const LOG_RESPONSE_PREVIEW_CHARS: usize = 250;
}

pub mod buffers {
    pub const CRYPTO_KEY_SIZE: usize = 32;
    pub const CRYPTO_IV_SIZE: usize = 12;
    pub const CRYPTO_TAG_SIZE: usize = 16;
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
}
