use crate::{controller::health_check_controller, sse::handler};
use axum::{routing::get, Router};
use service::AppState;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(subscribe_routes(app_state))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

fn subscribe_routes(app_state: AppState) -> Router {
    Router::new()
        // GET /subscribe/:userid/client/:clientid
        .route(
            "/subscribe/:userid/client/:clientid",
            get(handler::subscribe),
        )
        // GET /subscribe (identity claim header)
        .route("/subscribe", get(handler::subscribe_with_claim))
        .with_state(app_state)
}
