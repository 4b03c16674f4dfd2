//! Simulation configuration.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::Client;
use crate::delay::Delay;

const DEFAULT_SEATS: usize = 3;
const DEFAULT_CLIENTS: [&str; 6] = ["Alice", "Bob", "Charlie", "Diana", "Ethan", "Fiona"];
const DEFAULT_SERVICE: Delay = Delay::fixed(5000);
const DEFAULT_ARRIVAL: Delay = Delay::between(1000, 2500);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("waiting area must have at least one seat")]
    NoSeats,

    #[error("at least one client is required")]
    NoClients,

    #[error("client name at position {0} is empty")]
    EmptyName(usize),

    #[error("duplicate client name '{0}'")]
    DuplicateName(String),

    #[error("invalid {field} delay: min_ms {min_ms} exceeds max_ms {max_ms}")]
    InvertedDelay {
        field: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Construction-time parameters for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShopConfig {
    /// Waiting-area capacity.
    pub seats: usize,
    /// Names of the clients, in arrival order.
    pub clients: Vec<String>,
    /// Service duration per client.
    pub service: Delay,
    /// Gap before each arrival.
    pub arrival: Delay,
    /// Seed for the service and arrival RNGs. Entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            seats: DEFAULT_SEATS,
            clients: DEFAULT_CLIENTS.iter().map(|s| s.to_string()).collect(),
            service: DEFAULT_SERVICE,
            arrival: DEFAULT_ARRIVAL,
            seed: None,
        }
    }
}

impl ShopConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Replace the client list with `client-1` .. `client-<count>`.
    pub fn with_client_count(mut self, count: usize) -> Self {
        self.clients = (1..=count).map(|i| format!("client-{i}")).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seats == 0 {
            return Err(ConfigError::NoSeats);
        }
        if self.clients.is_empty() {
            return Err(ConfigError::NoClients);
        }

        let mut seen = HashSet::with_capacity(self.clients.len());
        for (i, name) in self.clients.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyName(i));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()));
            }
        }

        for (field, delay) in [("service", &self.service), ("arrival", &self.arrival)] {
            if !delay.is_valid() {
                return Err(ConfigError::InvertedDelay {
                    field,
                    min_ms: delay.min_ms,
                    max_ms: delay.max_ms,
                });
            }
        }

        Ok(())
    }

    pub fn build_clients(&self) -> Vec<Client> {
        self.clients.iter().map(Client::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_run() {
        let config = ShopConfig::default();
        config.validate().unwrap();
        insta::assert_json_snapshot!(config, @r###"
        {
          "seats": 3,
          "clients": [
            "Alice",
            "Bob",
            "Charlie",
            "Diana",
            "Ethan",
            "Fiona"
          ],
          "service": {
            "min_ms": 5000,
            "max_ms": 5000
          },
          "arrival": {
            "min_ms": 1000,
            "max_ms": 2500
          }
        }
        "###);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ShopConfig::from_json_str(r#"{"seats": 1, "seed": 9}"#).unwrap();
        assert_eq!(config.seats, 1);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.clients.len(), 6);
        assert_eq!(config.service, Delay::fixed(5000));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ShopConfig::from_json_str(r#"{"barbers": 2}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_seats_is_invalid() {
        let config = ShopConfig {
            seats: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoSeats)));
    }

    #[test]
    fn empty_roster_is_invalid() {
        let config = ShopConfig::default().with_client_count(0);
        assert!(matches!(config.validate(), Err(ConfigError::NoClients)));
    }

    #[test]
    fn duplicate_and_blank_names_are_invalid() {
        let mut config = ShopConfig::default();
        config.clients = vec!["Alice".into(), "Alice".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateName(name)) if name == "Alice"
        ));

        config.clients = vec!["Alice".into(), "  ".into()];
        assert!(matches!(config.validate(), Err(ConfigError::EmptyName(1))));
    }

    #[test]
    fn inverted_delay_names_the_field() {
        let config = ShopConfig {
            arrival: Delay::between(20, 10),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid arrival delay: min_ms 20 exceeds max_ms 10"
        );
    }

    #[test]
    fn client_count_generates_names() {
        let config = ShopConfig::default().with_client_count(2);
        assert_eq!(config.clients, ["client-1", "client-2"]);
        let clients = config.build_clients();
        assert_eq!(clients[1].name(), "client-2");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"seats": 2, "clients": ["Ann", "Ben"], "service": {{"min_ms": 10, "max_ms": 20}}}}"#
        )
        .unwrap();

        let config = ShopConfig::from_path(file.path()).unwrap();
        assert_eq!(config.seats, 2);
        assert_eq!(config.clients, ["Ann", "Ben"]);
        assert_eq!(config.service, Delay::between(10, 20));
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ShopConfig::from_path(Path::new("/nonexistent/shop.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
