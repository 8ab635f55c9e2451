//! AnswerForge API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Question answering against the knowledge base
//! - Conversation sessions
//! - Rate limiting
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;
mod sessions;

use answerforge_common::{
    config::AppConfig,
    embeddings::create_embedder,
    knowledge::KnowledgeBase,
    llm::{create_language_model, LanguageModel},
    metrics,
    refine::{LlmQueryRefiner, PassthroughRefiner, QueryRefiner},
    resolution::AnswerResolver,
    routing::{IntentRouter, LexicalIntentRouter},
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use middleware::rate_limit::{create_rate_limiter, GlobalRateLimiter};
use sessions::SessionStore;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub knowledge: Arc<KnowledgeBase>,
    pub resolver: Arc<AnswerResolver>,
    pub intent_router: Arc<dyn IntentRouter>,
    pub sessions: Arc<SessionStore>,
    pub limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// Wire the resolution pipeline from configuration
    pub fn build(config: AppConfig) -> answerforge_common::Result<Self> {
        let knowledge = Arc::new(KnowledgeBase::open(&config.knowledge.path));
        let embedder = create_embedder(&config.embedding)?;
        let model = create_language_model(&config.llm)?;

        // Without a live model the refiner prompts would only echo back.
        let refiner: Arc<dyn QueryRefiner> = match config.llm.provider.as_str() {
            "mock" | "offline" => Arc::new(PassthroughRefiner),
            _ => Arc::new(LlmQueryRefiner::new(Arc::clone(&model))),
        };

        Ok(Self::from_parts(config, knowledge, embedder, model, refiner))
    }

    pub fn from_parts(
        config: AppConfig,
        knowledge: Arc<KnowledgeBase>,
        embedder: Arc<dyn answerforge_common::Embedder>,
        model: Arc<dyn LanguageModel>,
        refiner: Arc<dyn QueryRefiner>,
    ) -> Self {
        let resolver = AnswerResolver::new(
            &config.resolution,
            Arc::clone(&knowledge),
            embedder,
            model,
            refiner,
        );

        let limiter = if config.rate_limit.enabled {
            create_rate_limiter(config.rate_limit.requests_per_second, config.rate_limit.burst)
        } else {
            None
        };

        Self {
            sessions: Arc::new(SessionStore::new(&config.sessions)),
            config: Arc::new(config),
            knowledge,
            resolver: Arc::new(resolver),
            intent_router: Arc::new(LexicalIntentRouter),
            limiter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config);

    info!("Starting AnswerForge API Gateway v{}", answerforge_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    let state = AppState::build(config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize resolution pipeline");
        e
    })?;

    if state.knowledge.is_empty() {
        warn!("Knowledge base is empty; every question will fall back");
    }

    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;
    let shutdown_timeout = state.config.shutdown_timeout();
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Draining starts on the signal; past the deadline in-flight requests are dropped.
    let draining = Arc::new(Notify::new());
    let signalled = Arc::clone(&draining);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signalled.notify_one();
        })
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = async {
            draining.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Shutdown deadline reached, abandoning in-flight requests"
            );
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        .route("/ask", post(handlers::ask::ask))
        .route("/sessions", post(handlers::sessions::create_session))
        .route("/sessions/{id}", delete(handlers::sessions::delete_session))
        .route("/admin/reload", post(handlers::admin::reload_knowledge))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics));

    Router::new()
        // Health endpoints (no rate limit)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
