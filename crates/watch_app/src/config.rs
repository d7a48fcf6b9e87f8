//! Startup configuration read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use watch_engine::WatchConfig;
use watch_logging::LogDestination;

pub const DEFAULT_DATA_DIR: &str = "./watch_data";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("URL is not set")]
    MissingUrl,
    #[error("URL {value:?} is invalid: {reason}")]
    InvalidUrl { value: String, reason: String },
    #[error("{name} must be a {expected}, got {value:?}")]
    InvalidNumber {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("WATCH_LOG must be terminal, file or both, got {0:?}")]
    InvalidLogDestination(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub log_destination: LogDestination,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let url = parse_url(get("URL").ok_or(ConfigError::MissingUrl)?)?;
        let data_dir = get("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let mut watch = WatchConfig::new(url, PathBuf::from(data_dir));

        if let Some(raw) = get("CHECK_INTERVAL_SECONDS") {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidNumber {
                    name: "CHECK_INTERVAL_SECONDS",
                    expected: "positive number of seconds",
                    value: raw,
                })?;
            watch.interval = Duration::from_secs(secs);
        }
        if let Some(raw) = get("KEEP_VERSIONS") {
            watch.keep_versions = raw.parse().map_err(|_| ConfigError::InvalidNumber {
                name: "KEEP_VERSIONS",
                expected: "non-negative integer",
                value: raw,
            })?;
        }
        if let Some(label) = get("WATCH_LABEL") {
            watch.label = label;
        }
        if let Some(title) = get("WATCH_TITLE_FIRST") {
            watch.titles.first_acquisition = title;
        }
        if let Some(title) = get("WATCH_TITLE_CHANGE") {
            watch.titles.change = title;
        }
        watch.telegram.token = get("TELEGRAM_BOT_TOKEN");
        watch.telegram.chat_id = get("TELEGRAM_CHAT_ID");

        let log_destination = match get("WATCH_LOG") {
            None => LogDestination::default(),
            Some(raw) => parse_log_destination(&raw)?,
        };

        Ok(Self {
            watch,
            log_destination,
        })
    }
}

fn parse_url(raw: String) -> Result<String, ConfigError> {
    let reason = match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => return Ok(raw),
        Ok(url) => format!("unsupported scheme {:?}", url.scheme()),
        Err(err) => err.to_string(),
    };
    Err(ConfigError::InvalidUrl { value: raw, reason })
}

fn parse_log_destination(raw: &str) -> Result<LogDestination, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "terminal" => Ok(LogDestination::Terminal),
        "file" => Ok(LogDestination::File),
        "both" => Ok(LogDestination::Both),
        _ => Err(ConfigError::InvalidLogDestination(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use watch_engine::{DEFAULT_INTERVAL_SECS, DEFAULT_KEEP_VERSIONS};

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = load(&[("URL", "https://example.com/bando")]).unwrap();
        let watch = &config.watch;
        assert_eq!(watch.url, "https://example.com/bando");
        assert_eq!(watch.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(watch.keep_versions, DEFAULT_KEEP_VERSIONS);
        assert_eq!(watch.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(watch.label, "Watched page");
        assert_eq!(watch.titles.change, "Change detected");
        assert_eq!(watch.telegram.token, None);
        assert_eq!(config.log_destination, LogDestination::Terminal);
    }

    #[test]
    fn every_variable_is_honoured() {
        let config = load(&[
            ("URL", "http://example.com"),
            ("CHECK_INTERVAL_SECONDS", "30"),
            ("KEEP_VERSIONS", "0"),
            ("DATA_DIR", "/var/lib/watch"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100"),
            ("WATCH_LABEL", "Bandi"),
            ("WATCH_TITLE_FIRST", "Monitor attivo"),
            ("WATCH_TITLE_CHANGE", "Modifica al bando"),
            ("WATCH_LOG", "Both"),
        ])
        .unwrap();
        let watch = &config.watch;
        assert_eq!(watch.interval, Duration::from_secs(30));
        assert_eq!(watch.keep_versions, 0);
        assert_eq!(watch.data_dir, PathBuf::from("/var/lib/watch"));
        assert_eq!(watch.telegram.token.as_deref(), Some("123:abc"));
        assert_eq!(watch.telegram.chat_id.as_deref(), Some("-100"));
        assert_eq!(watch.label, "Bandi");
        assert_eq!(watch.titles.first_acquisition, "Monitor attivo");
        assert_eq!(watch.titles.change, "Modifica al bando");
        assert_eq!(config.log_destination, LogDestination::Both);
    }

    #[test]
    fn missing_or_blank_url_is_rejected() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::MissingUrl);
        assert_eq!(load(&[("URL", "  ")]).unwrap_err(), ConfigError::MissingUrl);
    }

    #[test]
    fn relative_or_non_http_url_is_rejected() {
        assert!(matches!(
            load(&[("URL", "/bando")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            load(&[("URL", "ftp://example.com/file")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn zero_or_garbage_interval_is_rejected() {
        for value in ["0", "-5", "soon"] {
            let err = load(&[("URL", "https://example.com"), ("CHECK_INTERVAL_SECONDS", value)])
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidNumber {
                    name: "CHECK_INTERVAL_SECONDS",
                    ..
                }
            ));
        }
    }

    #[test]
    fn negative_keep_versions_is_rejected() {
        let err = load(&[("URL", "https://example.com"), ("KEEP_VERSIONS", "-1")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                name: "KEEP_VERSIONS",
                ..
            }
        ));
    }

    #[test]
    fn unknown_log_destination_is_rejected() {
        let err = load(&[("URL", "https://example.com"), ("WATCH_LOG", "syslog")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidLogDestination("syslog".to_string()));
    }
}
