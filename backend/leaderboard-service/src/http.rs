use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use tokio::sync::watch;
use tracing::{error, info};

use crate::jobs::RankReconciler;
use crate::metrics;
use crate::repository::{LeaderboardStore, RankingStore};

/// Shared state behind the admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub ranking: Arc<dyn RankingStore>,
    pub leaderboard: Arc<dyn LeaderboardStore>,
    pub reconciler: Arc<RankReconciler>,
}

async fn health() -> impl Responder {
    "OK"
}

/// Ready only when both stores answer.
async fn ready(state: web::Data<AdminState>) -> impl Responder {
    if let Err(e) = state.leaderboard.health_check().await {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unavailable",
            "store": "durable",
            "error": e.to_string(),
        }));
    }
    if let Err(e) = state.ranking.health_check().await {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unavailable",
            "store": "fast",
            "error": e.to_string(),
        }));
    }
    HttpResponse::Ok().json(serde_json::json!({ "status": "ready" }))
}

/// Run a reconciliation pass now and return its report.
async fn reconcile_now(state: web::Data<AdminState>) -> impl Responder {
    match state.reconciler.reconcile().await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!(error = %e, "On-demand rank reconciliation failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": e.to_string(),
            }))
        }
    }
}

/// Register the admin routes; `AdminState` must be added as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/ready", web::get().to(ready))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .route("/admin/reconcile", web::post().to(reconcile_now));
}

/// Serve the admin endpoints until `shutdown` flips to `true`.
pub async fn run_admin_server(
    addr: String,
    state: AdminState,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let data = web::Data::new(state);
    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .disable_signals()
        .bind(&addr)?
        .run();

    let handle = server.handle();
    tokio::spawn(async move {
        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
        handle.stop(true).await;
    });

    info!(addr = %addr, "Admin HTTP server listening");
    server.await
}
