use std::time::Duration;

use crate::config::{Lookup, parse_or};
use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GenBackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
}

impl GenBackendConfig {
    pub fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, AppError> {
        let base_url = lookup("CV_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let api_key = lookup("CV_API_KEY").filter(|key| !key.trim().is_empty());
        let connect_timeout = Duration::from_secs(parse_or(lookup, "CV_CONNECT_TIMEOUT_SECS", 10u64)?);

        Ok(Self {
            base_url,
            api_key,
            connect_timeout,
        })
    }
}
