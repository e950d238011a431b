use std::sync::Arc;

use axum::{routing::get, Router};
use axum_prometheus::PrometheusMetricLayer;
use metrics_exporter_prometheus::PrometheusHandle;
use roadwatch_server::{
    api::{self, AppState},
    config::{Config, StoreBackend},
    gemini::GeminiClient,
    store::{DocumentStore, MemoryStore, MongoStore},
};

fn with_metrics(app: Router, layer: PrometheusMetricLayer<'static>, handle: PrometheusHandle) -> Router {
    app.layer(layer)
        .route("/metrics", get(|| async move { handle.render() }))
}

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    roadwatch_server::telemetry::init_telemetry("roadwatch-server", &config.telemetry);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    // A failed connection is logged; requests then fail one by one.
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Mongo => Arc::new(MongoStore::connect(&config.mongo_url, config.mongo_db.as_deref()).await),
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; documents are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let analyzer = match GeminiClient::new(&config.gemini) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("failed to build Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let app = with_metrics(api::router(AppState::new(store, analyzer)), prometheus_layer, metric_handle);

    let addr = config.listen_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Server running on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
    }
}
