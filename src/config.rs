use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the JSON API
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Price feed parameters. The defaults are contract constants pinned by
/// the test suite; override only in simulation experiments.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Seconds between price ticks
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Per-tick uniform noise bound (price moves within +/- this fraction)
    #[serde(default = "default_noise_bound")]
    pub noise_bound: f64,
    /// Constant upward bias added to each tick's change
    #[serde(default = "default_drift")]
    pub drift: f64,
    /// Minimum price a tick may produce
    #[serde(default = "default_price_floor")]
    pub price_floor: Decimal,
}

fn default_tick_secs() -> u64 {
    30
}

fn default_noise_bound() -> f64 {
    0.01
}

fn default_drift() -> f64 {
    0.0005
}

fn default_price_floor() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            noise_bound: default_noise_bound(),
            drift: default_drift(),
            price_floor: default_price_floor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared key required to register an admin account
    #[serde(default)]
    pub admin_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("database.max_connections", 5)?
            .set_default("logging.level", "info")?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load machine-local overrides (config/local.toml, not committed)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Override with environment variables (BOURSE_DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("BOURSE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.feed.tick_secs == 0 {
            errors.push("feed.tick_secs must be positive".to_string());
        }

        if !(self.feed.noise_bound > 0.0 && self.feed.noise_bound < 1.0) {
            errors.push("feed.noise_bound must be between 0 and 1".to_string());
        }

        if self.feed.price_floor <= Decimal::ZERO {
            errors.push("feed.price_floor must be positive".to_string());
        }

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_feed_defaults_match_contract() {
        let feed = FeedConfig::default();
        assert_eq!(feed.tick_secs, 30);
        assert_eq!(feed.noise_bound, 0.01);
        assert_eq!(feed.drift, 0.0005);
        assert_eq!(feed.price_floor, dec!(0.01));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = AppConfig {
            database: DatabaseConfig {
                url: "postgres://localhost/bourse".to_string(),
                max_connections: 5,
            },
            server: ServerConfig::default(),
            feed: FeedConfig {
                tick_secs: 0,
                ..FeedConfig::default()
            },
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        };

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("tick_secs")));
    }
}
