use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::http_client::http_client;

const ERROR_SNIPPET_CHARS: usize = 220;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid json from {origin}: {source}")]
    InvalidJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("event id is required")]
    MissingEventId,

    #[error("invalid event id {0:?}")]
    InvalidEventId(String),
}

/// Where events listings and per-event odds come from. Implementations return
/// the provider body untouched; shaping it is the extractors' job.
pub trait DataSource {
    fn fetch_events(&self) -> Result<Value, FetchError>;
    fn fetch_odds(&self, event_id: &str) -> Result<Value, FetchError>;
}

/// Live provider endpoints over blocking HTTP.
pub struct HttpSource {
    cfg: ProviderConfig,
    client: Client,
}

impl HttpSource {
    pub fn new(cfg: ProviderConfig) -> Result<Self, FetchError> {
        let client = http_client(&cfg).map_err(|source| FetchError::Network {
            url: cfg.events_url.clone(),
            source,
        })?;
        Ok(Self { cfg, client })
    }

    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        info!(url, "fetching");
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url).send().map_err(network)?;
        let status = resp.status();
        let body = resp.text().map_err(network)?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: upstream_message(&body),
            });
        }
        debug!(url, bytes = body.len(), "fetched");
        parse_body(url, &body)
    }
}

impl DataSource for HttpSource {
    fn fetch_events(&self) -> Result<Value, FetchError> {
        self.get_json(&self.cfg.events_url)
    }

    fn fetch_odds(&self, event_id: &str) -> Result<Value, FetchError> {
        if event_id.trim().is_empty() {
            return Err(FetchError::MissingEventId);
        }
        self.get_json(&self.cfg.odds_url(event_id))
    }
}

/// Saved provider bodies on disk: `events.json` and `odds_{event_id}.json`.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_json(&self, path: &Path) -> Result<Value, FetchError> {
        debug!(path = %path.display(), "reading snapshot");
        let body = fs::read_to_string(path).map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_body(&path.display().to_string(), &body)
    }
}

impl DataSource for DirSource {
    fn fetch_events(&self) -> Result<Value, FetchError> {
        self.read_json(&self.dir.join("events.json"))
    }

    fn fetch_odds(&self, event_id: &str) -> Result<Value, FetchError> {
        let event_id = event_id.trim();
        if event_id.is_empty() {
            return Err(FetchError::MissingEventId);
        }
        // Snapshot names must stay inside `dir`.
        if event_id.contains(['/', '\\']) || event_id.contains("..") {
            return Err(FetchError::InvalidEventId(event_id.to_string()));
        }
        self.read_json(&self.dir.join(format!("odds_{event_id}.json")))
    }
}

pub fn source_from_config(cfg: &ProviderConfig) -> Result<Box<dyn DataSource>, FetchError> {
    match cfg.snapshot_dir.as_ref() {
        Some(dir) => Ok(Box::new(DirSource::new(dir.clone()))),
        None => Ok(Box::new(HttpSource::new(cfg.clone())?)),
    }
}

fn parse_body(origin: &str, body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(|source| FetchError::InvalidJson {
        origin: origin.to_string(),
        source,
    })
}

/// The upstream `message`/`error` field when the body is JSON, otherwise a
/// single-line snippet of the body.
fn upstream_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body)
        && let Some(message) = ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
    {
        return message.to_string();
    }
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(ERROR_SNIPPET_CHARS)
        .collect()
}
