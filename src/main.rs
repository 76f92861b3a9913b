use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qr_payment_core::adapters::PostgresTransactionRepository;
use qr_payment_core::cli::{self, Cli, Commands, DbCommands};
use qr_payment_core::config::{self, Config, LogFormat};
use qr_payment_core::services::events::EVENT_QUEUE_CAPACITY;
use qr_payment_core::services::{event_channel, spawn_dispatcher, spawn_hub, TransactionEngine};
use qr_payment_core::utils::reference::ReferenceGenerator;
use qr_payment_core::utils::signature::SignatureVerifier;
use qr_payment_core::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Signing only needs the key, so it works without a database configured.
    if let Some(Commands::Sign(args)) = &cli.command {
        init_tracing(LogFormat::Pretty);
        let secret = config::hmac_secret_from_env()?;
        return cli::handle_sign(&secret, args);
    }

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Db(DbCommands::Migrate)) => cli::handle_db_migrate(&config).await,
        Some(Commands::Config) => cli::handle_config_validate(&config),
        Some(Commands::Sign(_)) => Ok(()),
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    let repository = Arc::new(PostgresTransactionRepository::new(pool));

    let (hub, _hub_task) = spawn_hub(config.ws_client_queue_capacity);
    let (events, event_receiver) = event_channel(EVENT_QUEUE_CAPACITY);
    let _dispatcher = spawn_dispatcher(event_receiver, hub.clone());

    let engine = TransactionEngine::new(
        repository,
        ReferenceGenerator::new(config.reference_prefix.clone()),
        events,
    );

    let app_state = AppState {
        engine: Arc::new(engine),
        hub,
        verifier: SignatureVerifier::new(config.hmac_secret.as_bytes()),
        ws_idle_timeout: Duration::from_secs(config.ws_idle_timeout_secs),
    };
    let app = create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
