use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers;
use crate::middleware::gatekeeper_middleware;
use crate::state::AppState;

/// Full application router: `/health` outside the gate, everything else behind it.
pub fn build_router(state: AppState, security: &SecurityConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(gated_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(security)),
        )
        .with_state(state)
}

fn gated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(handlers::whoami))
        .route("/auth/logout", post(handlers::logout))
        // Anything else belongs to the application server
        .fallback(handlers::forward)
        .layer(middleware::from_fn_with_state(state, gatekeeper_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    // Session cookies need credentials, which rules out wildcards
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}
