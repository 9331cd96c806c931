use std::net::TcpListener;
use std::sync::Arc;

use bearer_auth::configuration::get_configuration;
use bearer_auth::repository::{PostgresAccountRepository, PostgresTokenRepository};
use bearer_auth::startup::{run, AppState};
use bearer_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!(
        host = %configuration.database.host,
        database = %configuration.database.database_name,
        "Attempting to connect to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
        })?;

    tracing::info!("Database ready");

    let state = AppState::new(
        Arc::new(PostgresAccountRepository::new(pool.clone())),
        Arc::new(PostgresTokenRepository::new(pool)),
        &configuration.auth,
    )
    .map_err(|e| {
        tracing::error!("Failed to initialize authentication services: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Startup error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, state)?.await
}
