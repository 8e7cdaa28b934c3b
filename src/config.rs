use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::detection::velocity::DEFAULT_MAX_VELOCITY_KMH;

/// Configuration for the impossible-travel service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Detection rule configuration
    pub detection: DetectionConfig,
    /// GeoIP database configuration
    pub geolocation: GeolocationConfig,
    /// Login history storage configuration
    pub persistence: PersistenceConfig,
    /// Bounds on collaborator calls
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the daemon listens on
    pub bind_address: String,
    /// Number of HTTP workers (defaults to the number of CPUs)
    pub workers: Option<usize>,
}

/// Detection rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Maximum plausible travel speed in km/h
    pub max_velocity_kmh: f64,
}

/// GeoIP database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// Path to the GeoLite2-City.mmdb file
    pub database_path: PathBuf,
}

/// Login history storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
    /// How long login records are kept when pruning
    pub retention_days: Option<u32>,
}

/// Per-call time limits, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub resolver_ms: u64,
    pub store_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            resolver_ms: 2000,
            store_ms: 2000,
        }
    }
}

impl TimeoutConfig {
    pub fn resolver(&self) -> Duration {
        Duration::from_millis(self.resolver_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind_address: "127.0.0.1:5000".to_string(),
                workers: None,
            },
            detection: DetectionConfig {
                max_velocity_kmh: DEFAULT_MAX_VELOCITY_KMH,
            },
            geolocation: GeolocationConfig {
                database_path: PathBuf::from("GeoLite2-City.mmdb"),
            },
            persistence: PersistenceConfig {
                database_path: PathBuf::from("detector.db"),
                retention_days: Some(90),
            },
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<(), String> {
        let threshold = self.detection.max_velocity_kmh;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(format!(
                "detection.max_velocity_kmh must be a positive number, got {}",
                threshold
            ));
        }
        if self.timeouts.resolver_ms == 0 || self.timeouts.store_ms == 0 {
            return Err("timeouts must be greater than zero".to_string());
        }
        if self.server.workers == Some(0) {
            return Err("server.workers must be greater than zero".to_string());
        }
        Ok(())
    }
}
