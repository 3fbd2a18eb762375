use axum::{http::Method, routing::get, Router};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{config::Settings, factory, routes};

pub fn create(connection_pool: PgPool, config: Settings) -> Router<()> {
    let app = Router::new()
        .route("/", get(|| async { "attest-api" }))
        .nest("/time-entries", routes::time_entries::router())
        .nest("/timesheets", routes::timesheets::router())
        .nest("/approvals", routes::approvals::router())
        .nest("/allocations", routes::allocations::router());

    let app_state = factory::build_app_state(connection_pool, &config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(["content-type".parse().unwrap()])
        .allow_origin(Any);

    app.with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
