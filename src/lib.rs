pub mod app;
pub mod cli;
pub mod constants;
pub mod errors;

pub mod managers {
    pub mod api;
    pub mod bridge;
}

pub mod services {
    pub mod config;
    pub mod host;
    pub mod identity;
    pub mod logger;
    pub mod secret;
    pub mod security;
    pub mod vault;
}

pub mod utils {
    pub mod flatten;
    pub mod paths;
    pub mod template;
    pub mod text;
}
