//! API layer -- axum routes, handlers, and middleware.

mod routes;
pub mod state;

use self::state::AppState;
use axum::http::Method;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router with all API routes.
///
/// Read-only: every route is a GET, so any origin may poll it.
pub fn router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET])
                .allow_origin(Any),
        );

    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .layer(middleware)
        .with_state(state)
}

async fn fallback() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "not found")
}
