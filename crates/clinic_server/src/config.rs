//! Environment-driven server configuration.
//!
//! | variable                  | default            |
//! |---------------------------|--------------------|
//! | `CLINIC_DB_PATH`          | `clinic.sqlite3`   |
//! | `CLINIC_BIND_ADDR`        | `127.0.0.1:8080`   |
//! | `CLINIC_LOG_LEVEL`        | build-mode default |
//! | `CLINIC_LOG_DIR`          | unset: stderr      |
//! | `CLINIC_CONSULTATION_FEE` | `150000`           |

use clinic_api::DEFAULT_CONSULTATION_FEE;
use clinic_core::model::Money;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "clinic.sqlite3";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "warning", "error"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Absolute directory for rotating log files; `None` logs to stderr.
    pub log_dir: Option<String>,
    pub consultation_fee: Money,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = PathBuf::from(read("CLINIC_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()));

        let raw_addr = read("CLINIC_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse::<SocketAddr>()
            .map_err(|err| format!("CLINIC_BIND_ADDR `{raw_addr}` is not a socket address: {err}"))?;

        let log_level = match read("CLINIC_LOG_LEVEL") {
            Some(level) => {
                let level = level.to_ascii_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(format!(
                        "CLINIC_LOG_LEVEL `{level}` is not one of trace|debug|info|warn|error"
                    ));
                }
                level
            }
            None => clinic_core::default_log_level().to_string(),
        };

        let consultation_fee = match read("CLINIC_CONSULTATION_FEE") {
            Some(raw) => match raw.parse::<Money>() {
                Ok(fee) if fee >= 0 => fee,
                _ => {
                    return Err(format!(
                        "CLINIC_CONSULTATION_FEE `{raw}` must be a non-negative integer"
                    ))
                }
            },
            None => DEFAULT_CONSULTATION_FEE,
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_dir: read("CLINIC_LOG_DIR"),
            consultation_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.db_path.to_str(), Some("clinic.sqlite3"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, clinic_core::default_log_level());
        assert_eq!(config.log_dir, None);
        assert_eq!(config.consultation_fee, 150_000);
    }

    #[test]
    fn explicit_values_are_parsed() {
        let config = config_from(&[
            ("CLINIC_DB_PATH", "/var/lib/clinic/db.sqlite3"),
            ("CLINIC_BIND_ADDR", "0.0.0.0:9000"),
            ("CLINIC_LOG_LEVEL", " WARN "),
            ("CLINIC_LOG_DIR", "/var/log/clinic"),
            ("CLINIC_CONSULTATION_FEE", "200000"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/clinic"));
        assert_eq!(config.consultation_fee, 200_000);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("CLINIC_LOG_DIR", "  "), ("CLINIC_DB_PATH", "")]).unwrap();
        assert_eq!(config.log_dir, None);
        assert_eq!(config.db_path.to_str(), Some("clinic.sqlite3"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("CLINIC_BIND_ADDR", "localhost")])
            .unwrap_err()
            .contains("CLINIC_BIND_ADDR"));
        assert!(config_from(&[("CLINIC_LOG_LEVEL", "verbose")])
            .unwrap_err()
            .contains("CLINIC_LOG_LEVEL"));
        assert!(config_from(&[("CLINIC_CONSULTATION_FEE", "-5")]).is_err());
        assert!(config_from(&[("CLINIC_CONSULTATION_FEE", "12.5")]).is_err());
    }
}
