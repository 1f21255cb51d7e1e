//! Config command handlers

use anyhow::{bail, Context, Result};

use sheetsync_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "transport": config.transport.as_str(),
                    "socket_url": config.socket_url,
                    "intent_timeout_secs": config.intent_timeout_secs,
                    "simulated_latency_ms": config.simulated_latency_ms,
                    "role": config.role.as_str()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.transport);
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  transport:            {}", config.transport);
            println!("  socket_url:           {}", config.socket_url);
            println!("  intent_timeout_secs:  {}", config.intent_timeout_secs);
            println!("  simulated_latency_ms: {}", config.simulated_latency_ms);
            println!("  role:                 {}", config.role);
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    apply(&mut config, &key, &value)?;

    config.save().context("Failed to save configuration")?;
    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "transport" => {
            config.transport = value.parse().map_err(anyhow::Error::msg)?;
        }
        "socket_url" => {
            if value.is_empty() {
                bail!("socket_url cannot be empty");
            }
            config.socket_url = value.to_string();
        }
        "intent_timeout_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for intent_timeout_secs. Use a whole number of seconds.")?;
            if secs == 0 {
                bail!("intent_timeout_secs must be at least 1");
            }
            config.intent_timeout_secs = secs;
        }
        "simulated_latency_ms" => {
            config.simulated_latency_ms = value
                .parse()
                .context("Invalid value for simulated_latency_ms. Use a whole number of milliseconds.")?;
        }
        "role" => {
            config.role = value.parse().map_err(anyhow::Error::msg)?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: transport, socket_url, intent_timeout_secs, simulated_latency_ms, role",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsync_core::{Role, TransportMode};

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "transport", "ws").unwrap();
        apply(&mut config, "socket_url", "ws://table.local/ws").unwrap();
        apply(&mut config, "intent_timeout_secs", "10").unwrap();
        apply(&mut config, "simulated_latency_ms", "0").unwrap();
        apply(&mut config, "role", "GM").unwrap();

        assert_eq!(config.transport, TransportMode::Socket);
        assert_eq!(config.socket_url, "ws://table.local/ws");
        assert_eq!(config.intent_timeout_secs, 10);
        assert_eq!(config.simulated_latency_ms, 0);
        assert_eq!(config.role, Role::Gm);
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();

        assert!(apply(&mut config, "transport", "carrier-pigeon").is_err());
        assert!(apply(&mut config, "intent_timeout_secs", "0").is_err());
        assert!(apply(&mut config, "intent_timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "socket_url", "").is_err());
        assert!(apply(&mut config, "favorite_color", "blue").is_err());

        assert_eq!(config.transport, TransportMode::Simulated);
    }
}
