use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::web::history::AlertRecord;
use crate::web::stream::WebState;

pub fn create_router(state: WebState) -> Router {
    Router::new()
        .route("/api/alerts", get(get_alert_history))
        .route("/ws", get(crate::web::stream::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn get_alert_history(State(state): State<WebState>) -> Json<Vec<AlertRecord>> {
    let history = state.history.lock().unwrap();
    Json(history.get_events())
}
