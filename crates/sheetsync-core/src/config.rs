//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/sheetsync/config.toml)
//! 3. Environment variables (SHEETSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Role;

/// Environment variable prefix
const ENV_PREFIX: &str = "SHEETSYNC";

pub const DEFAULT_SOCKET_URL: &str = "ws://127.0.0.1:6767/ws";
pub const DEFAULT_INTENT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SIMULATED_LATENCY_MS: u64 = 120;

/// Which transport backs the sync client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    #[serde(alias = "mock")]
    Simulated,
    #[serde(alias = "ws")]
    Socket,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Simulated => "simulated",
            TransportMode::Socket => "socket",
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "mock" => Ok(TransportMode::Simulated),
            "socket" | "ws" => Ok(TransportMode::Socket),
            other => Err(format!(
                "Unknown transport '{}'. Expected simulated or socket",
                other
            )),
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport used by the sync client
    #[serde(default)]
    pub transport: TransportMode,

    /// WebSocket endpoint for the socket transport
    #[serde(default = "default_socket_url")]
    pub socket_url: String,

    /// Seconds before an unresolved intent is failed locally
    #[serde(default = "default_intent_timeout_secs")]
    pub intent_timeout_secs: u64,

    /// Delay before the simulated backend delivers its snapshot
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,

    /// Role the console starts in
    #[serde(default = "default_role")]
    pub role: Role,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            socket_url: default_socket_url(),
            intent_timeout_secs: DEFAULT_INTENT_TIMEOUT_SECS,
            simulated_latency_ms: DEFAULT_SIMULATED_LATENCY_MS,
            role: default_role(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (SHEETSYNC_TRANSPORT, SHEETSYNC_SOCKET_URL, ...)
    /// 2. Config file (~/.config/sheetsync/config.toml or SHEETSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Values that fail to parse are ignored with a warning.
    fn apply_env_overrides(&mut self) {
        // SHEETSYNC_TRANSPORT
        if let Ok(val) = std::env::var(format!("{}_TRANSPORT", ENV_PREFIX)) {
            match val.parse() {
                Ok(mode) => self.transport = mode,
                Err(e) => tracing::warn!("Ignoring {}_TRANSPORT: {}", ENV_PREFIX, e),
            }
        }

        // SHEETSYNC_SOCKET_URL
        if let Ok(val) = std::env::var(format!("{}_SOCKET_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.socket_url = val;
            }
        }

        // SHEETSYNC_INTENT_TIMEOUT_SECS
        if let Ok(val) = std::env::var(format!("{}_INTENT_TIMEOUT_SECS", ENV_PREFIX)) {
            match val.parse() {
                Ok(secs) => self.intent_timeout_secs = secs,
                Err(e) => tracing::warn!("Ignoring {}_INTENT_TIMEOUT_SECS: {}", ENV_PREFIX, e),
            }
        }

        // SHEETSYNC_SIMULATED_LATENCY_MS
        if let Ok(val) = std::env::var(format!("{}_SIMULATED_LATENCY_MS", ENV_PREFIX)) {
            match val.parse() {
                Ok(ms) => self.simulated_latency_ms = ms,
                Err(e) => tracing::warn!("Ignoring {}_SIMULATED_LATENCY_MS: {}", ENV_PREFIX, e),
            }
        }

        // SHEETSYNC_ROLE
        if let Ok(val) = std::env::var(format!("{}_ROLE", ENV_PREFIX)) {
            match val.parse() {
                Ok(role) => self.role = role,
                Err(e) => tracing::warn!("Ignoring {}_ROLE: {}", ENV_PREFIX, e),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with SHEETSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetsync")
            .join("config.toml")
    }

    pub fn intent_timeout(&self) -> Duration {
        Duration::from_secs(self.intent_timeout_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

fn default_socket_url() -> String {
    DEFAULT_SOCKET_URL.to_string()
}

fn default_intent_timeout_secs() -> u64 {
    DEFAULT_INTENT_TIMEOUT_SECS
}

fn default_simulated_latency_ms() -> u64 {
    DEFAULT_SIMULATED_LATENCY_MS
}

fn default_role() -> Role {
    Role::Player
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "SHEETSYNC_TRANSPORT",
        "SHEETSYNC_SOCKET_URL",
        "SHEETSYNC_INTENT_TIMEOUT_SECS",
        "SHEETSYNC_SIMULATED_LATENCY_MS",
        "SHEETSYNC_ROLE",
        "SHEETSYNC_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Simulated);
        assert_eq!(config.socket_url, "ws://127.0.0.1:6767/ws");
        assert_eq!(config.intent_timeout(), Duration::from_secs(30));
        assert_eq!(config.simulated_latency(), Duration::from_millis(120));
        assert_eq!(config.role, Role::Player);
    }

    #[test]
    fn test_transport_mode_parse() {
        assert_eq!("mock".parse::<TransportMode>().unwrap(), TransportMode::Simulated);
        assert_eq!("WS".parse::<TransportMode>().unwrap(), TransportMode::Socket);
        assert_eq!("socket".parse::<TransportMode>().unwrap(), TransportMode::Socket);
        assert!("carrier-pigeon".parse::<TransportMode>().is_err());
    }

    #[test]
    fn test_env_override_transport() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("SHEETSYNC_TRANSPORT", "ws");
        config.apply_env_overrides();
        assert_eq!(config.transport, TransportMode::Socket);

        // Unparseable values leave the current setting alone
        env::set_var("SHEETSYNC_TRANSPORT", "smoke-signals");
        config.apply_env_overrides();
        assert_eq!(config.transport, TransportMode::Socket);
    }

    #[test]
    fn test_env_override_socket_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("SHEETSYNC_SOCKET_URL", "ws://table.local:9000/ws");
        config.apply_env_overrides();
        assert_eq!(config.socket_url, "ws://table.local:9000/ws");

        // Empty string is ignored
        env::set_var("SHEETSYNC_SOCKET_URL", "");
        config.apply_env_overrides();
        assert_eq!(config.socket_url, "ws://table.local:9000/ws");
    }

    #[test]
    fn test_env_override_numbers_and_role() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("SHEETSYNC_INTENT_TIMEOUT_SECS", "5");
        env::set_var("SHEETSYNC_SIMULATED_LATENCY_MS", "0");
        env::set_var("SHEETSYNC_ROLE", "gm");
        config.apply_env_overrides();

        assert_eq!(config.intent_timeout_secs, 5);
        assert_eq!(config.simulated_latency_ms, 0);
        assert_eq!(config.role, Role::Gm);

        env::set_var("SHEETSYNC_INTENT_TIMEOUT_SECS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.intent_timeout_secs, 5);
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            transport: TransportMode::Socket,
            socket_url: "ws://sync.example.com/ws".to_string(),
            intent_timeout_secs: 10,
            simulated_latency_ms: 50,
            role: Role::Gm,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("transport = \"socket\""));
        assert!(toml_str.contains("role = \"gm\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.transport, config.transport);
        assert_eq!(parsed.socket_url, config.socket_url);
        assert_eq!(parsed.intent_timeout_secs, 10);
        assert_eq!(parsed.role, Role::Gm);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            transport = "mock"
            socket_url = "ws://example.com/ws"
            intent_timeout_secs = 12
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.transport, TransportMode::Simulated);
        assert_eq!(config.socket_url, "ws://example.com/ws");
        assert_eq!(config.intent_timeout_secs, 12);
        assert_eq!(config.simulated_latency_ms, DEFAULT_SIMULATED_LATENCY_MS);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.transport, TransportMode::Simulated);
        assert_eq!(config.socket_url, DEFAULT_SOCKET_URL);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            transport: TransportMode::Socket,
            ..Default::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.transport, TransportMode::Socket);
        assert_eq!(loaded.intent_timeout_secs, DEFAULT_INTENT_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_file_path_override() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("SHEETSYNC_CONFIG", "/tmp/sheetsync-test/config.toml");
        assert_eq!(
            Config::config_file_path(),
            PathBuf::from("/tmp/sheetsync-test/config.toml")
        );

        env::remove_var("SHEETSYNC_CONFIG");
        assert!(Config::config_file_path().ends_with("sheetsync/config.toml"));
    }
}
