use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use attest_api::{config::read_config, router};

#[tokio::main]
async fn main() {
    dotenvy::from_filename("./attest-api/.env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = read_config().expect("Failed to read configuration");

    let connection_pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_with(config.database.with_db())
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to run database migrations");

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind address");
    tracing::info!("listening on {}", address);

    let app = router::create(connection_pool, config);
    axum::serve(listener, app)
        .await
        .expect("Failed to run server");
}
