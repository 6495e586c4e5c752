//! Client configuration.
//!
//! Stored as TOML:
//! - Linux: `$XDG_CONFIG_HOME/courier/client.toml` (or `~/.config/courier/client.toml`)
//! - Windows: `%APPDATA%/courier/client.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use courier_connection::{Environment, ManagerConfig};

/// Client configuration. Every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin of the web app; the socket endpoint is derived from it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// `development` connects to the local dev server instead of the origin host.
    #[serde(default)]
    pub environment: Environment,

    /// Recipient for lines typed without an explicit `@id` prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<u64>,

    /// Reconnect, health check and keepalive tunables.
    #[serde(default)]
    pub connection: ManagerConfig,
}

fn default_origin() -> String {
    "https://localhost".into()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            environment: Environment::default(),
            recipient: None,
            connection: ManagerConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Loads the configuration from its default location, writing the
    /// defaults there first if no file exists.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml::to_string_pretty(self)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("courier").join("client.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let base = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var("HOME")
                    .map_err(|_| anyhow::anyhow!("HOME is not set; pass --config"))?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(base.join("courier").join("client.toml"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            origin = "https://market.example.com"

            [connection]
            max_attempts = 4
            base_delay = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.origin, "https://market.example.com");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.recipient, None);
        assert_eq!(config.connection.max_attempts, 4);
        assert_eq!(config.connection.base_delay, Duration::from_millis(500));
        assert_eq!(config.connection.debounce, Duration::from_millis(300));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn development_environment_parses() {
        let config: ClientConfig = toml::from_str(r#"environment = "development""#).unwrap();
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("client.toml");

        let config = ClientConfig {
            origin: "http://10.0.0.5:3000".into(),
            recipient: Some(42),
            ..ClientConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client.toml");

        let loaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(loaded, ClientConfig::default());
        assert!(path.exists());
    }
}
