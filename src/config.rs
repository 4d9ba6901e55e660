//! Configuration management

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::gate::{Allowlist, DEFAULT_TIMEOUT};
use crate::{Error, Result};

/// Upstream hosts the relay may contact. Edit per environment.
///
/// `*.<domain>` matches the domain and all of its subdomains. Leaving this
/// empty lets the relay reach any host.
pub const ALLOWED_HOSTS: &[&str] = &["*.tractionguest.com"];

/// The compiled-in allowlist
#[must_use]
pub fn allowlist() -> Allowlist {
    Allowlist::new(ALLOWED_HOSTS)
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Forwarding defaults
    pub forward: ForwardConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // RELAY_GATE_SERVER__PORT=9000 etc.
        figment = figment.merge(Env::prefixed("RELAY_GATE_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_body_size == 0 {
            return Err(Error::Config(
                "server.max_body_size must be greater than zero".to_string(),
            ));
        }
        if self.forward.default_timeout.is_zero() {
            return Err(Error::Config(
                "forward.default_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum inbound request body size (bytes)
    pub max_body_size: usize,
    /// Directory holding `index.html` and `app.js`
    pub assets_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_body_size: 10 * 1024 * 1024, // 10MB
            assets_dir: PathBuf::from("."),
        }
    }
}

/// Forwarding defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Timeout used when a request does not carry one
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s", "250ms")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Either form a duration may take in YAML or the environment
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Secs(u64),
        Text(String),
    }

    /// Deserialize a duration string ("30s", "5m", "100ms") or a bare number
    /// of seconds
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the value cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Secs(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(s) => parse(&s).map_err(serde::de::Error::custom),
        }
    }

    /// Parse "100ms", "30s", "5m" or a bare number of seconds
    pub(crate) fn parse(s: &str) -> Result<Duration, std::num::ParseIntError> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>().map(Duration::from_millis)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>().map(Duration::from_secs)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>().map(|m| Duration::from_secs(m * 60))
        } else {
            s.parse::<u64>().map(Duration::from_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.forward.default_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn compiled_allowlist_covers_tractionguest() {
        let list = allowlist();
        assert!(!list.is_empty());
        assert!(list.permits("api.tractionguest.com"));
        assert!(!list.permits("evil.com"));
    }

    #[test]
    fn load_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "server:\n  host: 0.0.0.0\n  port: 9001\n  assets_dir: /srv/relay\nforward:\n  default_timeout: 5s"
        )
        .unwrap();
        drop(f);

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.assets_dir, PathBuf::from("/srv/relay"));
        assert_eq!(config.forward.default_timeout, Duration::from_secs(5));
        assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
    }

    #[test]
    fn load_accepts_bare_seconds_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");
        std::fs::write(&path, "forward:\n  default_timeout: 45\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.forward.default_timeout, Duration::from_secs(45));
    }

    #[test]
    fn load_rejects_unparseable_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.yaml");
        std::fs::write(&path, "forward:\n  default_timeout: soon\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/relay.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("not found")));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.forward.default_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn humantime_parses_units() {
        assert_eq!(humantime_serde::parse("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(humantime_serde::parse("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(humantime_serde::parse("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(humantime_serde::parse("45").unwrap(), Duration::from_secs(45));
        assert!(humantime_serde::parse("soon").is_err());
    }
}
