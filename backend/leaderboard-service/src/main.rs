use std::sync::Arc;

use anyhow::{Context, Result};
use db_pool::{create_pool_with_retry, DbConfig, StartupRetry};
use leaderboard_service::config::{Config, KafkaConfig};
use leaderboard_service::consumers::{IngestionPipeline, KafkaScoreStream, PipelineStats};
use leaderboard_service::error::ServiceError;
use leaderboard_service::http::{run_admin_server, AdminState};
use leaderboard_service::jobs::{run_reconciler_loop, RankReconciler};
use leaderboard_service::repository::{
    LeaderboardStore, PostgresLeaderboardRepository, RankingStore, RedisRankingRepository,
};
use redis_utils::RedisPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "leaderboard_service=info,db_pool=info,redis_utils=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// One pipeline task per worker, each with its own consumer in the group.
fn spawn_ingestion_workers(
    kafka: &KafkaConfig,
    ranking: Arc<dyn RankingStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
    shutdown: &watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<PipelineStats>>, ServiceError> {
    let mut handles = Vec::with_capacity(kafka.workers);

    for worker in 0..kafka.workers {
        let mut stream = KafkaScoreStream::new(kafka, worker)?;
        let pipeline =
            IngestionPipeline::new(ranking.clone(), leaderboard.clone()).with_worker(worker);
        let shutdown = shutdown.clone();

        handles.push(tokio::spawn(async move {
            pipeline.run(&mut stream, shutdown).await
        }));
    }

    Ok(handles)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting Leaderboard Service");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        env = %config.app.env,
        http_port = config.app.http_port,
        topic = %config.kafka.topic,
        workers = config.kafka.workers,
        reconcile_enabled = config.reconciler.enabled,
        reconcile_interval_secs = config.reconciler.interval_secs,
        "Configuration loaded"
    );

    let retry = StartupRetry {
        attempts: config.startup.connect_attempts,
        delay: config.startup.connect_delay(),
    };

    // PostgreSQL (authoritative leaderboard)
    let db_config = DbConfig::new("leaderboard-service", &config.database.url).with_pool_size(
        config.database.max_connections,
        config.database.min_connections,
    );
    let pg_pool = create_pool_with_retry(&db_config, retry)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("✅ Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("✅ Database migrations applied");

    // Redis (live ranking)
    let redis = RedisPool::connect_with_retry(&config.redis.url, retry.attempts, retry.delay)
        .await
        .context("Failed to connect to Redis")?;
    redis.ping().await.context("Redis did not answer PING")?;
    info!(key = %config.redis.leaderboard_key, "✅ Connected to Redis");

    let ranking: Arc<dyn RankingStore> = Arc::new(RedisRankingRepository::new(
        redis.manager(),
        config.redis.leaderboard_key.clone(),
    ));
    let leaderboard: Arc<dyn LeaderboardStore> =
        Arc::new(PostgresLeaderboardRepository::new(pg_pool.clone()));
    let reconciler = Arc::new(RankReconciler::new(leaderboard.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers = spawn_ingestion_workers(
        &config.kafka,
        ranking.clone(),
        leaderboard.clone(),
        &shutdown_rx,
    )
    .context("Failed to start score consumers")?;
    info!(workers = workers.len(), "✅ Score ingestion workers started");

    let reconciler_task = if config.reconciler.enabled {
        let task = tokio::spawn(run_reconciler_loop(
            reconciler.clone(),
            config.reconciler.interval(),
            shutdown_rx.clone(),
        ));
        info!("✅ Rank reconciler started");
        Some(task)
    } else {
        info!("Rank reconciler disabled by configuration");
        None
    };

    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    let admin_state = AdminState {
        ranking,
        leaderboard,
        reconciler,
    };
    let mut http_task = tokio::spawn(run_admin_server(
        http_addr,
        admin_state,
        shutdown_rx.clone(),
    ));

    info!("🎉 leaderboard-service is running");

    let mut http_finished = false;
    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        result = &mut http_task => {
            http_finished = true;
            match result {
                Ok(Ok(())) => warn!("Admin HTTP server exited"),
                Ok(Err(e)) => error!(error = %e, "Admin HTTP server failed"),
                Err(e) => error!(error = %e, "Admin HTTP server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    for (worker, handle) in workers.into_iter().enumerate() {
        match handle.await {
            Ok(stats) => info!(
                worker,
                fetched = stats.fetched,
                applied = stats.applied,
                poison = stats.poison,
                "Ingestion worker finished"
            ),
            Err(e) => error!(worker, error = %e, "Ingestion worker panicked"),
        }
    }

    if let Some(task) = reconciler_task {
        if let Err(e) = task.await {
            error!(error = %e, "Rank reconciler task panicked");
        }
    }

    if !http_finished {
        match http_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Admin HTTP server failed during shutdown"),
            Err(e) => error!(error = %e, "Admin HTTP server task panicked"),
        }
    }

    pg_pool.close().await;
    info!("Leaderboard Service stopped");
    Ok(())
}
