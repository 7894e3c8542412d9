use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "basera", about = "Real-estate listing backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    pub reset_code_minutes: u64,
}

/// Outbound mail settings, built once at startup and carried in AppState.
/// When disabled (the default), notification emails are logged instead of
/// handed to a transport.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub from_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "basera_session".to_string(),
            session_hours: 720,
            reset_code_minutes: 15,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from_address: "alerts@basera.local".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("basera.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not determine home directory")
                .join(".basera")
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        self.database.path.as_ref().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "basera_session");
        assert_eq!(config.auth.session_hours, 720);
        assert!(!config.mail.enabled);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(PathBuf::from("/tmp/test-basera")),
        };
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-basera"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), &tmp.path().join("basera.db"));
    }

    #[test]
    fn load_applies_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: None,
            host: Some("127.0.0.1".to_string()),
            port: Some(8080),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[auth]
session_hours = 24

[mail]
enabled = true
from_address = "noreply@example.com"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.session_hours, 24);
        assert!(config.mail.enabled);
        assert_eq!(config.mail.from_address, "noreply@example.com");
    }
}
