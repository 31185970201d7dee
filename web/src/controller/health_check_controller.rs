use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use service::AppState;

/// GET reports liveness along with the number of open event streams and how
/// many connections were displaced by a newer one with the same identity
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    let manager = &app_state.sse_manager;
    (
        StatusCode::OK,
        format!(
            "healthy ({} connections, {} replaced)",
            manager.connection_count(),
            manager.registry().replaced_count()
        ),
    )
}
