pub mod error;
pub mod middleware;
pub mod routes;

use axum::{routing::get, Router};
use soiree_core::AppState;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

async fn root() -> &'static str {
    "Soiree API is running"
}

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .nest("/api/auth", routes::auth::router())
        .nest("/api/users", routes::users::router())
        .nest("/api/events", routes::events::router())
        .nest("/api/comments", routes::comments::router())
        .nest("/api/polls", routes::polls::router())
        .nest("/api/todos", routes::todos::router())
        .nest("/api/webhooks", routes::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
