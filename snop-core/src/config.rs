use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::SnopError;

/// Upstream address used when neither the config file nor `BACKEND_URL` set one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Relay address the widget talks to by default.
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SnopConfig {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub http: HttpConfig,
    pub widget: WidgetConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// The text-to-SQL backend the relay forwards to.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to embed the widget. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WidgetConfig {
    pub relay_url: String,
    pub session_file: String,
    pub download_dir: String,
    pub timeout_seconds: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            session_file: "~/.snop/chat-session".to_string(),
            download_dir: ".".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl WidgetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.session_file).into_owned())
    }

    pub fn download_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.download_dir).into_owned())
    }
}

impl SnopConfig {
    /// Load configuration from defaults, an optional TOML file, `SNOP__*`
    /// environment variables and finally `BACKEND_URL`.
    pub fn load(path: Option<&str>) -> Result<Self, SnopError> {
        Self::load_with_backend_url(path, std::env::var("BACKEND_URL").ok())
    }

    /// Same as [`SnopConfig::load`] with the `BACKEND_URL` value passed in.
    pub fn load_with_backend_url(
        path: Option<&str>,
        backend_url: Option<String>,
    ) -> Result<Self, SnopError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let backend_url = backend_url.filter(|u| !u.trim().is_empty());

        let s = builder
            .add_source(
                Environment::with_prefix("SNOP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("http.cors_origins")
                    .try_parsing(true),
            )
            .set_override_option("backend.base_url", backend_url)?
            .build()?;
        Ok(s.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = SnopConfig::load_with_backend_url(None, None).unwrap();
        assert_eq!(config.backend.base_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.backend.timeout(), Duration::from_secs(30));
        assert_eq!(config.http.port, 3000);
        assert!(config.http.cors_origins.is_empty());
        assert_eq!(config.widget.relay_url, DEFAULT_RELAY_URL);
    }

    #[test]
    fn test_backend_url_override_wins_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [backend]
            base_url = "http://from-file:9000"
            timeout_seconds = 5

            [http]
            port = 4100
            cors_origins = ["http://localhost:3001"]
            "#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let from_file = SnopConfig::load_with_backend_url(Some(&path), None).unwrap();
        assert_eq!(from_file.backend.base_url, "http://from-file:9000");
        assert_eq!(from_file.backend.timeout_seconds, 5);
        assert_eq!(from_file.http.port, 4100);
        assert_eq!(from_file.http.cors_origins, vec!["http://localhost:3001"]);
        // Untouched sections keep their defaults
        assert_eq!(from_file.http.host, "127.0.0.1");

        let overridden = SnopConfig::load_with_backend_url(
            Some(&path),
            Some("http://from-env:8000".to_string()),
        )
        .unwrap();
        assert_eq!(overridden.backend.base_url, "http://from-env:8000");
    }

    #[test]
    fn test_blank_backend_url_is_ignored() {
        let config =
            SnopConfig::load_with_backend_url(None, Some("   ".to_string())).unwrap();
        assert_eq!(config.backend.base_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config =
            SnopConfig::load_with_backend_url(Some("/nonexistent/snop"), None).unwrap();
        assert_eq!(config.service.log_level, "info");
    }

    #[test]
    fn test_session_path_expands_tilde() {
        let widget = WidgetConfig::default();
        let path = widget.session_path();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with(".snop/chat-session"));
    }
}
