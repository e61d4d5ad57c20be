use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::config::ProviderConfig;

pub fn http_client(cfg: &ProviderConfig) -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .user_agent(cfg.user_agent.clone())
        .default_headers(headers)
        .build()
}
