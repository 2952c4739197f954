use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionInfo, IntoConnectionInfo};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Redis connection pool backed by a reconnecting `ConnectionManager`.
///
/// `ConnectionManager` is cheap to clone and multiplexes commands over one
/// connection, so every clone handed out by [`RedisPool::manager`] shares it.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;

        let client = Client::open(info).context("failed to construct Redis client")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        Ok(Self { manager })
    }

    /// Connect, retrying up to `attempts` times with `delay` in between.
    ///
    /// A malformed URL fails immediately; only connection errors are retried.
    pub async fn connect_with_retry(redis_url: &str, attempts: u32, delay: Duration) -> Result<Self> {
        redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;

        let attempts = attempts.max(1);
        let mut attempt = 1;

        loop {
            match Self::connect(redis_url).await {
                Ok(pool) => {
                    info!(attempt, "Redis connection established");
                    return Ok(pool);
                }
                Err(err) if attempt < attempts => {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        retry_in_secs = delay.as_secs(),
                        error = %err,
                        "Failed to connect to Redis, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(attempts, error = %err, "Giving up connecting to Redis");
                    return Err(err);
                }
            }
        }
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// PING round-trip; used by readiness probes.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }
}
