//! callsight: ingestion and quality classification for assistant
//! interaction events.
//!
//! The service accepts discrete interaction events over HTTP (queries,
//! outcomes, upstream model calls), persists them, and classifies each
//! interaction's quality through a three-tier cascade (heuristics, outcome
//! rules, external quality model) driven by a durable work queue. Hourly
//! per-store rollups and per-customer insights are maintained as best-effort
//! side-effects of ingestion.
//!
//! # Architecture
//!
//! - **Ingestion gateway** ([`api::handlers::ingest`]): validates and
//!   persists events; enqueues classification work and updates aggregates on
//!   a detached task the caller never waits on.
//! - **Batch classifier** ([`classifier`]): drains the queue on a fixed
//!   interval and writes one automatic verdict per item.
//! - **Aggregate maintainer** ([`aggregates`]): hourly store rollups,
//!   per-model usage, per-customer running totals.
//!
//! [`Application`] owns the full lifecycle: pool setup, migrations,
//! background services, HTTP serving, graceful shutdown.

pub mod aggregates;
pub mod api;
pub mod classifier;
pub mod config;
pub mod db;
pub mod errors;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::classifier::{BatchClassifier, QualityJudge};
use crate::config::Config;
use axum::{
    Json, Router,
    routing::{get, post},
};
use bon::Builder;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::OpenApi;

/// Shared state available to every request handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the callsight database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "callsight",
        description = "Ingestion and quality-classification pipeline for assistant interaction events"
    ),
    paths(
        api::handlers::healthz,
        api::handlers::ingest::ingest,
        api::handlers::stats::hourly,
        api::handlers::stats::llm_usage,
        api::handlers::stats::customer_insight,
        api::handlers::stats::queue_depth,
        api::handlers::evaluations::list,
        api::handlers::evaluations::review,
        api::handlers::evaluations::export,
    )
)]
pub struct ApiDoc;

/// Assemble the full route table.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(api::handlers::healthz))
        .route("/ingest", post(api::handlers::ingest::ingest))
        .route("/stats/hourly", get(api::handlers::stats::hourly))
        .route("/stats/llm-usage", get(api::handlers::stats::llm_usage))
        .route("/customers/{customer_id}/insight", get(api::handlers::stats::customer_insight))
        .route("/queue/depth", get(api::handlers::stats::queue_depth))
        .route("/evaluations", get(api::handlers::evaluations::list))
        .route("/evaluations/{query_id}", post(api::handlers::evaluations::review))
        .route("/export/evaluations", get(api::handlers::evaluations::export))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handles to the background tasks, for coordinated shutdown.
///
/// When dropped without an explicit [`shutdown`](BackgroundServices::shutdown),
/// the drop guard cancels the token and tasks stop on their own.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Start the classifier daemon.
fn setup_background_services(
    pool: PgPool,
    config: &Config,
    shutdown_token: tokio_util::sync::CancellationToken,
) -> anyhow::Result<BackgroundServices> {
    let drop_guard = shutdown_token.clone().drop_guard();

    let judge = config.judge.as_ref().map(QualityJudge::new).transpose()?;
    if judge.is_none() {
        info!("no quality model configured; unmatched queries default to REVIEW");
    }

    let classifier = BatchClassifier::new(pool, &config.classifier, judge);
    let handle = tokio::spawn(classifier::run_daemon(
        classifier,
        config.classifier.interval,
        shutdown_token.clone(),
    ));

    Ok(BackgroundServices {
        background_tasks: vec![handle],
        shutdown_token,
        drop_guard: Some(drop_guard),
    })
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects the pool, runs migrations,
///    and starts the classifier daemon.
/// 2. **Serve**: [`Application::serve`] binds the port and handles requests
///    until the shutdown future resolves, then stops background services.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("starting with configuration: {:#?}", config);

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;
        migrator().run(&pool).await?;

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(pool.clone(), &config, shutdown_token)?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(state);

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("callsight listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("shutting down background services");
        self.bg_services.shutdown().await;

        info!("closing database connections");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::models::IngestResponse;
    use crate::db::handlers::{Events, Evaluations, HourlyStats, WorkQueue};
    use crate::db::models::{EvaluatedBy, QualityLabel};
    use crate::types::hour_bucket;
    use axum_test::TestServer;
    use serde_json::json;
    use std::time::Duration;

    fn server(pool: PgPool) -> TestServer {
        let state = AppState::builder().db(pool).config(Config::default()).build();
        TestServer::new(build_router(state)).unwrap()
    }

    /// Poll for an asynchronous side-effect to land.
    async fn eventually<F, Fut>(mut condition: F, what: &str)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn healthz_responds(pool: PgPool) {
        let server = server(pool);
        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn openapi_document_is_served(pool: PgPool) {
        let server = server(pool);
        let response = server.get("/api-docs/openapi.json").await;
        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/ingest"].is_object());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn ingest_query_persists_then_enqueues_and_aggregates(pool: PgPool) {
        let server = server(pool.clone());

        let response = server
            .post("/ingest")
            .json(&json!({
                "type": "query",
                "storeId": "s1",
                "sessionId": "sess-1",
                "queryText": "what's the weather like"
            }))
            .await;
        response.assert_status_ok();
        let body: IngestResponse = response.json();

        // Synchronous persist is visible immediately
        let stored = Events::get_query(&pool, &body.id).await.unwrap().unwrap();
        assert_eq!(stored.store_id, "s1");

        // Queue enqueue and the hourly rollup are detached side-effects
        eventually(|| async { WorkQueue::depth(&pool).await.unwrap() == 1 }, "work-queue enqueue").await;
        let bucket = hour_bucket(stored.created_at);
        eventually(
            || async {
                HourlyStats::get(&pool, "s1", bucket)
                    .await
                    .unwrap()
                    .is_some_and(|stat| stat.total_queries == 1 && stat.unique_sessions == 1)
            },
            "hourly rollup",
        )
        .await;
    }

    #[sqlx::test]
    #[test_log::test]
    async fn unrecognized_event_type_is_a_400(pool: PgPool) {
        let server = server(pool);
        let response = server
            .post("/ingest")
            .json(&json!({ "type": "heartbeat", "storeId": "s1" }))
            .await;
        response.assert_status_bad_request();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn duplicate_outcome_is_a_409(pool: PgPool) {
        let server = server(pool.clone());

        server
            .post("/ingest")
            .json(&json!({ "type": "query", "id": "q-1", "storeId": "s1", "queryText": "play jazz" }))
            .await
            .assert_status_ok();

        let outcome = json!({ "type": "outcome", "queryId": "q-1", "latencyMs": 1200 });
        server.post("/ingest").json(&outcome).await.assert_status_ok();

        let response = server.post("/ingest").json(&outcome).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn outcome_for_an_unknown_query_is_a_400(pool: PgPool) {
        let server = server(pool);
        let response = server
            .post("/ingest")
            .json(&json!({ "type": "outcome", "queryId": "no-such-query", "latencyMs": 100 }))
            .await;
        response.assert_status_bad_request();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn llm_call_ingestion_feeds_customer_insight(pool: PgPool) {
        let server = server(pool.clone());

        let response = server
            .post("/ingest")
            .json(&json!({
                "type": "llm_call",
                "customerId": "cust-1",
                "modelName": "gpt-x",
                "provider": "openai",
                "promptText": "hello",
                "latencyMs": 150,
                "costUsd": 0.002
            }))
            .await;
        response.assert_status_ok();

        eventually(
            || async {
                let response = server.get("/customers/cust-1/insight").await;
                response.status_code().is_success()
            },
            "customer insight",
        )
        .await;

        let insight: serde_json::Value = server.get("/customers/cust-1/insight").await.json();
        assert_eq!(insight["totalInteractions"], 1);
        assert_eq!(insight["avgLatencyMs"], 150.0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn unknown_customer_insight_is_a_404(pool: PgPool) {
        let server = server(pool);
        server.get("/customers/nobody/insight").await.assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn human_review_round_trip(pool: PgPool) {
        let server = server(pool.clone());

        server
            .post("/ingest")
            .json(&json!({ "type": "query", "id": "q-1", "storeId": "s1", "queryText": "dim the lights" }))
            .await
            .assert_status_ok();

        let response = server
            .post("/evaluations/q-1")
            .json(&json!({ "label": "BAD", "reason": "wrong_action" }))
            .await;
        response.assert_status_ok();

        let evaluation = Evaluations::get(&pool, "q-1").await.unwrap().unwrap();
        assert_eq!(evaluation.label, QualityLabel::Bad);
        assert_eq!(evaluation.evaluated_by, EvaluatedBy::Human);

        // Listing filters by label
        let listed: serde_json::Value = server.get("/evaluations?label=BAD").await.json();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        // Reviewing a nonexistent query is a 404
        server
            .post("/evaluations/missing")
            .json(&json!({ "label": "GOOD" }))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn export_emits_one_json_object_per_line(pool: PgPool) {
        let server = server(pool.clone());

        for id in ["q-1", "q-2"] {
            server
                .post("/ingest")
                .json(&json!({ "type": "query", "id": id, "storeId": "s1", "queryText": "hello world" }))
                .await
                .assert_status_ok();
            server
                .post(&format!("/evaluations/{id}"))
                .json(&json!({ "label": "GOOD" }))
                .await
                .assert_status_ok();
        }

        let response = server.get("/export/evaluations").await;
        response.assert_status_ok();
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/x-ndjson"
        );

        let body = response.text();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let row: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(row["label"], "GOOD");
            assert_eq!(row["queryText"], "hello world");
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn queue_depth_reflects_pending_work(pool: PgPool) {
        let server = server(pool.clone());

        let depth: serde_json::Value = server.get("/queue/depth").await.json();
        assert_eq!(depth["depth"], 0);

        server
            .post("/ingest")
            .json(&json!({ "type": "query", "storeId": "s1", "queryText": "hello" }))
            .await
            .assert_status_ok();

        eventually(
            || async {
                let depth: serde_json::Value = server.get("/queue/depth").await.json();
                depth["depth"] == 1
            },
            "queue depth",
        )
        .await;
    }
}
