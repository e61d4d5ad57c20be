use std::env;
use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_EVENTS_URL: &str = "https://cms-prod.ladbrokes.com/cms/api/ladbrokes/fsc/16";
const DEFAULT_ODDS_URL_TEMPLATE: &str = "https://ss-aka-ori.ladbrokes.com/openbet-ssviewer/Drilldown/2.86/EventToOutcomeForEvent/{event_id}?scorecast=true&translationLang=en&responseFormat=json&referenceEachWayTerms=true";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub events_url: String,
    pub odds_url_template: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            events_url: DEFAULT_EVENTS_URL.to_string(),
            odds_url_template: DEFAULT_ODDS_URL_TEMPLATE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            snapshot_dir: None,
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        let timeout_secs = get("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.timeout_secs);

        Self {
            events_url: get("EVENTS_URL").unwrap_or(defaults.events_url),
            odds_url_template: get("ODDS_URL_TEMPLATE").unwrap_or(defaults.odds_url_template),
            user_agent: get("PROVIDER_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout_secs: clamp_timeout(timeout_secs),
            snapshot_dir: get("SNAPSHOT_DIR").map(PathBuf::from),
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = clamp_timeout(secs);
        self
    }

    pub fn odds_url(&self, event_id: &str) -> String {
        self.odds_url_template.replace("{event_id}", event_id.trim())
    }
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(1, 120)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            level: env::var("LOG_LEVEL").unwrap_or(defaults.level),
            format: env::var("LOG_FORMAT").unwrap_or(defaults.format),
        }
    }

    /// Installs the global subscriber. `RUST_LOG` wins over `level`.
    /// Output goes to stderr so listings on stdout stay clean.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            _ => {
                fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
    }
}
