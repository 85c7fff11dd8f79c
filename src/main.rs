//src/main.rs

use anyhow::Context;
use axum::{
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

use leave_desk::{
    config::{AppState, Settings},
    docs::ApiDoc,
    handlers,
};

const DEFAULT_LOG_FILTER: &str = "leave_desk=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let bind_addr = settings.bind_addr.clone();
    let app_state = AppState::new(settings).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let cancel = CancellationToken::new();
    let scheduler = tokio::spawn(app_state.scheduler().run(cancel.clone()));

    let app = router(app_state.clone());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("server error")?;

    cancel.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Scheduler task panicked");
    }
    // In-flight approval notifications finish before the process exits.
    app_state.notifier.drain().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn router(app_state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/telegram", post(handlers::auth::telegram_login))
        .route("/telegram/is-employee", get(handlers::auth::is_employee));

    let employee_routes = Router::new()
        .route("/me", get(handlers::employees::get_me))
        .route("/me/vacation-used", get(handlers::employees::vacation_used));

    let leave_type_routes = Router::new().route(
        "/",
        get(handlers::leave_types::list_leave_types).post(handlers::leave_types::create_leave_type),
    );

    let leave_request_routes = Router::new()
        .route(
            "/",
            get(handlers::leave_requests::list_requests).post(handlers::leave_requests::create_request),
        )
        .route("/check-overlap", get(handlers::leave_requests::check_overlap))
        .route("/pending", get(handlers::leave_requests::pending_requests))
        .route(
            "/{id}",
            get(handlers::leave_requests::get_request)
                .put(handlers::leave_requests::update_request)
                .delete(handlers::leave_requests::delete_request),
        )
        .route("/{id}/submit", post(handlers::leave_requests::submit_request))
        .route("/{id}/decide", post(handlers::leave_requests::decide_request));

    let duty_routes = Router::new()
        .route("/", get(handlers::duty::duty_history))
        .route("/current", get(handlers::duty::current_duty))
        .route("/advance", post(handlers::duty::advance_duty));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/auth", auth_routes)
        .nest("/api/employees", employee_routes)
        .nest("/api/leave-types", leave_type_routes)
        .nest("/api/leave-requests", leave_request_routes)
        .nest("/api/duty", duty_routes)
        .route("/api/periods/reset", post(handlers::periods::reset_period))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
