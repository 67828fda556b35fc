mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::service::NoteService;

pub use middleware::SecurityConfig;

pub fn create_router(service: NoteService) -> Router {
    create_router_with_security(service, SecurityConfig::default())
}

pub fn create_router_with_security(service: NoteService, security: SecurityConfig) -> Router {
    let protected = Router::new()
        // Identity
        .route("/user", get(handlers::current_user))
        // Notes
        .route("/notes", get(handlers::list_notes).post(handlers::create_note))
        .route("/notes/events", get(handlers::note_events))
        .route(
            "/notes/{id}",
            get(handlers::get_note)
                .patch(handlers::update_note)
                .delete(handlers::delete_note),
        )
        // Summaries
        .route("/summarize", post(handlers::summarize))
        .route_layer(from_fn_with_state(
            service.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        .merge(protected)
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&security)),
        )
        .with_state(service)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        None => CorsLayer::permissive(),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();
            CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
        }
    }
}
