use axum::{
    http::Method,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use clinflow_backend::config::Config;
use clinflow_backend::db::change_feed::ChangeFeed;
use clinflow_backend::db::connection::{create_pool, DbPool};
use clinflow_backend::docs::ApiDoc;
use clinflow_backend::handlers;
use clinflow_backend::repositories::{DoctorDirectory, RequestRepository};
use clinflow_backend::services::{
    AuditLogService, EmailNotifier, RefundPolicyEngine, ReviewOrchestrator,
};
use clinflow_backend::services::refund::{
    PaymentGateway, RefundGatewayError, RefundReceipt,
};
use clinflow_backend::state::AppState;
use clinflow_backend::types::RequestId;

/// Placeholder gateway wired in until the payment collaborator endpoint is
/// configured; every refund reports as retryable failure.
struct UnconfiguredGateway;

#[async_trait::async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn refund(&self, _request_id: RequestId) -> Result<RefundReceipt, RefundGatewayError> {
        Err(RefundGatewayError::Unavailable(
            "payment gateway not configured".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinflow_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        bind_port = config.bind_port,
        change_feed_capacity = config.change_feed_capacity,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("./migrations").run(pool.as_ref()).await?;

    let feed = ChangeFeed::new(config.change_feed_capacity);
    let requests = Arc::new(RequestRepository::new());
    let doctors = Arc::new(DoctorDirectory::new());
    let audit = Arc::new(AuditLogService::new());
    let refunds = RefundPolicyEngine::new(Arc::new(UnconfiguredGateway));
    let notifier = Arc::new(EmailNotifier::new()?);

    let orchestrator = ReviewOrchestrator::new(
        pool.clone(),
        requests.clone(),
        doctors,
        audit,
        refunds,
        notifier,
        feed.clone(),
    );

    let state = AppState::new(pool, config.clone(), feed, requests, orchestrator);

    let app = Router::new()
        .route(
            "/api/requests",
            post(handlers::requests::create_request),
        )
        .route(
            "/api/requests/{id}",
            get(handlers::requests::get_request),
        )
        .route(
            "/api/requests/{id}/status",
            put(handlers::requests::change_status),
        )
        .route(
            "/api/requests/{id}/payment",
            put(handlers::requests::update_payment_status),
        )
        .route(
            "/api/requests/{id}/audit",
            get(handlers::requests::get_audit_history),
        )
        .route(
            "/api/requests/claim",
            post(handlers::requests::claim_batch),
        )
        .route("/api/queue", get(handlers::queue::get_queue))
        .route("/api/queue/stream", get(handlers::queue::stream_queue))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.bind_port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
