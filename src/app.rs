// region:    --- Imports
use crate::auction::rules::AuctionRules;
use crate::error::AuctionError;
use crate::handlers;
use crate::notifier::LiveNotifier;
use crate::store::AuctionStore;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

// endregion: --- Imports

// region:    --- App State

pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub notifier: LiveNotifier,
    pub rules: AuctionRules,
    pub admin_secret: Arc<str>,
    pub sse_keepalive: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn AuctionStore>, rules: AuctionRules, admin_secret: &str) -> Self {
        Self {
            store,
            notifier: LiveNotifier::default(),
            rules,
            admin_secret: Arc::from(admin_secret),
            sse_keepalive: Duration::from_secs(15),
        }
    }
}

// endregion: --- App State

// region:    --- Router

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/lots", post(handlers::handle_add_lot))
        .route("/lots/:id", delete(handlers::handle_delete_lot))
        .route("/lots/:id/start", post(handlers::handle_start_lot))
        .route("/lots/:id/end", post(handlers::handle_end_lot))
        .route("/game/phase", put(handlers::handle_set_phase))
        .route("/game/phases/:name", put(handlers::handle_set_phase_enabled))
        .route("/users/:id/points", post(handlers::handle_adjust_points))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // the mini app is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/lots", get(handlers::handle_get_lots))
        .route("/lots/active", get(handlers::handle_get_active_lot))
        .route("/lots/:id", get(handlers::handle_get_lot))
        .route("/lots/:id/bids", get(handlers::handle_get_lot_bids))
        .route("/bids", post(handlers::handle_place_bid))
        .route("/live", get(handlers::handle_live))
        .route("/game/state", get(handlers::handle_get_game_state))
        .route("/users", post(handlers::handle_register_user))
        .route("/users/:id", get(handlers::handle_get_user))
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

/// Admin routes need the shared secret header.
async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuctionError> {
    let authorized = request
        .headers()
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|secret| secret == &*state.admin_secret);

    if !authorized {
        warn!(
            "{:<12} --> rejected admin call to {}",
            "Auth",
            request.uri().path()
        );
        return Err(AuctionError::Unauthorized);
    }
    Ok(next.run(request).await)
}

// endregion: --- Router
