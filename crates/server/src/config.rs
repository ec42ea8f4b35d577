use std::path::PathBuf;
use std::time::Duration;

use checkmp_upstream::ClientConfig;
use thiserror::Error;
use tracing::{debug, warn};

/// Default config file, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config_base.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{0} is not configured (set it in the config file or environment)")]
    Missing(&'static str),
}

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub verify_tls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            host: "0.0.0.0".to_string(),
            port: 8899,
            timeout: Duration::from_secs(15),
            verify_tls: false,
        }
    }
}

impl Config {
    /// Read the config file (if present), apply environment overrides and validate.
    ///
    /// The file path comes from `CHECKMP_CONFIG`, falling back to [`DEFAULT_CONFIG_FILE`].
    pub fn load() -> Result<Self, ConfigError> {
        let path: PathBuf = std::env::var("CHECKMP_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
            .into();

        let mut config = Self::default();
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                debug!(path = %path.display(), "reading config file");
                config.apply_file(&text)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using environment only");
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `key = value` lines. Blank lines and `#` comments are skipped, values may be quoted.
    pub fn apply_file(&mut self, text: &str) -> Result<(), ConfigError> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');

            match key.trim() {
                "base_url" => self.base_url = value.trim_end_matches('/').to_string(),
                "api_key" => self.api_key = value.to_string(),
                "timeout_secs" => self.timeout = parse_timeout("timeout_secs", value)?,
                "verify_tls" => self.verify_tls = parse_bool("verify_tls", value)?,
                other => warn!(key = %other, "ignoring unknown config key"),
            }
        }
        Ok(())
    }

    /// Apply environment overrides. Empty variables are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("MP_BASE_URL") {
            self.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = var("MP_API_KEY") {
            self.api_key = v.trim().to_string();
        }
        if let Some(v) = var("MP_TIMEOUT_SECS") {
            self.timeout = parse_timeout("MP_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("MP_VERIFY_TLS") {
            self.verify_tls = parse_bool("MP_VERIFY_TLS", &v)?;
        }
        if let Some(v) = var("SERVICE_HOST") {
            self.host = v.trim().to_string();
        }
        if let Some(v) = var("SERVICE_PORT") {
            self.port = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "SERVICE_PORT",
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Missing("base_url"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: self.timeout,
            verify_tls: self.verify_tls,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_timeout(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_config_file() {
        let mut config = Config::default();
        config
            .apply_file(
                "# MoviePilot\n\
                 base_url = \"https://mp.example.com:3000/\"\n\
                 api_key='abc123'\n\
                 \n\
                 timeout_secs = 5\n\
                 verify_tls = yes\n\
                 not a pair\n",
            )
            .unwrap();

        assert_eq!(config.base_url, "https://mp.example.com:3000");
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.verify_tls);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = Config::default();
        config
            .apply_file("base_url = http://file\napi_key = from-file\n")
            .unwrap();
        config
            .apply_env(env(&[
                ("MP_API_KEY", "from-env"),
                ("MP_BASE_URL", ""),
                ("SERVICE_PORT", "9000"),
                ("SERVICE_HOST", "127.0.0.1"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://file");
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("base_url"))));

        let config = Config {
            base_url: "http://mp".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Missing("api_key"))));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.apply_env(env(&[("SERVICE_PORT", "eighty")])),
            Err(ConfigError::Invalid { key: "SERVICE_PORT", .. })
        ));
        assert!(config.apply_file("timeout_secs = 0").is_err());
        assert!(config.apply_file("verify_tls = maybe").is_err());
    }

    #[test]
    fn client_config_carries_settings() {
        let config = Config {
            base_url: "http://mp".into(),
            api_key: "k".into(),
            timeout: Duration::from_secs(3),
            ..Default::default()
        };
        let client = config.client_config();
        assert_eq!(client.base_url, "http://mp");
        assert_eq!(client.timeout, Duration::from_secs(3));
        assert!(!client.verify_tls);
    }
}
