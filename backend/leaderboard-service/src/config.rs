/// Configuration management for Leaderboard Service
///
/// Loads configuration from environment variables.
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ServiceError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub kafka: KafkaConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub reconciler: ReconcilerConfig,
    pub startup: StartupConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Host the admin HTTP server binds to
    pub host: String,
    /// Port for health, readiness, metrics and admin endpoints
    pub http_port: u16,
}

/// Score stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    /// Pipeline workers, each with its own consumer in `group_id`
    pub workers: usize,
    pub session_timeout_ms: u32,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// Sorted-set key holding the live standings
    pub leaderboard_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl ReconcilerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Bounded connection retry used before the service starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    pub connect_attempts: u32,
    pub connect_delay_secs: u64,
}

impl StartupConfig {
    pub fn connect_delay(&self) -> Duration {
        Duration::from_secs(self.connect_delay_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parse an optional variable; a present but unparseable value is an error.
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, ServiceError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ServiceError::Config(format!("{} has invalid value '{}'", key, raw))),
        _ => Ok(default),
    }
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool, ServiceError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ServiceError::Config(format!(
                "{} has invalid value '{}'",
                key, raw
            ))),
        },
        _ => Ok(default),
    }
}

/// DATABASE_URL, or one assembled from the DB_* parts the compose setup exports.
fn database_url_from_env() -> Result<String, ServiceError> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return Ok(url);
        }
    }

    let host = std::env::var("DB_HOST").map_err(|_| {
        ServiceError::Config("DATABASE_URL or DB_HOST environment variable must be set".into())
    })?;
    let port: u16 = parse_env("DB_PORT", 5432)?;
    let user = env_or("DB_USER", "postgres");
    let password = std::env::var("DB_PASSWORD").unwrap_or_default();
    let name = env_or("DB_NAME", "leaderboard");

    // Credentials and database name may contain URL delimiters such as '@' or '/'
    let user = urlencoding::encode(&user);
    let credentials = if password.is_empty() {
        user.into_owned()
    } else {
        format!("{}:{}", user, urlencoding::encode(&password))
    };

    Ok(format!(
        "postgres://{}@{}:{}/{}?sslmode=disable",
        credentials,
        host,
        port,
        urlencoding::encode(&name)
    ))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ServiceError> {
        let app = AppConfig {
            env: env_or("APP_ENV", "development"),
            host: env_or("APP_HOST", "0.0.0.0"),
            http_port: parse_env("PORT", 8090)?,
        };

        let kafka = KafkaConfig {
            brokers: env_or("KAFKA_BROKERS", "kafka:9092"),
            topic: env_or("KAFKA_LEADERBOARD_TOPIC", "leaderboard-scores"),
            group_id: env_or("KAFKA_CONSUMER_GROUP", "leaderboard-consumers"),
            workers: parse_env("KAFKA_CONSUMER_WORKERS", 1)?,
            session_timeout_ms: parse_env("KAFKA_SESSION_TIMEOUT_MS", 30_000)?,
        };

        let database = DatabaseConfig {
            url: database_url_from_env()?,
            max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", 2)?,
        };

        let redis = RedisConfig {
            url: env_or("REDIS_URL", "redis://localhost:6379"),
            leaderboard_key: env_or("LEADERBOARD_REDIS_KEY", "leaderboard"),
        };

        let reconciler = ReconcilerConfig {
            enabled: parse_bool_env("RANK_RECONCILE_ENABLED", true)?,
            interval_secs: parse_env("RANK_RECONCILE_INTERVAL_SECS", 30)?,
        };

        let startup = StartupConfig {
            connect_attempts: parse_env("STARTUP_CONNECT_ATTEMPTS", 10)?,
            connect_delay_secs: parse_env("STARTUP_CONNECT_DELAY_SECS", 5)?,
        };

        let config = Config {
            app,
            kafka,
            database,
            redis,
            reconciler,
            startup,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.kafka.workers == 0 {
            return Err(ServiceError::Config(
                "KAFKA_CONSUMER_WORKERS must be at least 1".into(),
            ));
        }
        if self.reconciler.interval_secs == 0 {
            return Err(ServiceError::Config(
                "RANK_RECONCILE_INTERVAL_SECS must be at least 1".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ServiceError::Config(
                "DB_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
