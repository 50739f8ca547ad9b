use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Settings read from the monitor's TOML file. The same file also carries the
/// `site_status` and `site_to_email_list_mapping` tables, which are owned by
/// [`crate::store`] and ignored here.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    pub lists: Lists,
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_logging_level")]
    pub logging_level: String,
    /// Log to `<log_dir>/site-monitor.log` instead of stdout.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_sentinel_url")]
    pub sentinel_url: String,
    #[serde(default)]
    pub probe_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logging_level: default_logging_level(),
            log_dir: None,
            sentinel_url: default_sentinel_url(),
            probe_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_secs.map(Duration::from_secs)
    }
}

fn default_logging_level() -> String { "info".into() }
fn default_sentinel_url() -> String { "http://www.google.com".into() }

#[derive(Debug, Deserialize, Clone)]
pub struct Lists {
    pub sites_path: PathBuf,
}

#[derive(Deserialize, Clone)]
pub struct EmailConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub default_recipient: String,
}

fn default_smtp_port() -> u16 { 587 }

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("default_recipient", &self.default_recipient)
            .finish()
    }
}

impl AppConfig {
    /// Loads `path`, then applies `SITE_MONITOR__<SECTION>__<KEY>` overrides
    /// from the environment. A relative `sites_path` is taken relative to the
    /// config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config: AppConfig = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("SITE_MONITOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if config.lists.sites_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.lists.sites_path = dir.join(&config.lists.sites_path);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const SAMPLE: &str = r#"
[lists]
sites_path = "site.list"

[email]
server = "smtp.example.com"
username = "monitor@example.com"
password = "hunter2"
from_address = "monitor@example.com"
default_recipient = "ops@example.com"

[site_status]
"www.example.com" = "up"
"#;

    #[test]
    fn loads_with_defaults_and_resolves_sites_path() {
        let dir = std::env::temp_dir().join(format!("site-monitor-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("monitor.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.settings.logging_level, "info");
        assert_eq!(config.settings.sentinel_url, "http://www.google.com");
        assert_eq!(config.settings.probe_timeout(), None);
        assert_eq!(config.email.port, 587);
        assert_eq!(config.lists.sites_path, dir.join("site.list"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("missing-{}.toml", uuid::Uuid::new_v4()));
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let email: EmailConfig = toml::from_str(
            r#"
server = "smtp.example.com"
username = "monitor"
password = "hunter2"
from_address = "monitor@example.com"
default_recipient = "ops@example.com"
"#,
        )
        .unwrap();
        let rendered = format!("{:?}", email);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
