//! buildboard server entrypoint

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use buildboard::config::{AppConfig, LogTarget};
use buildboard::services::{
    start_alert_scheduler, AlertEngine, AlertSchedulerState, NotificationDispatcher,
};
use buildboard::{api, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("buildboard {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_help();
                std::process::exit(2);
            }
        }
    }

    let config = AppConfig::load().context("Failed to load configuration")?;

    // The appender guard must outlive the server or file logs are dropped
    let _log_guard = init_logging(&config)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting buildboard");

    let pool = db::init_pool(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to initialize database")?;

    let dispatcher = Arc::new(NotificationDispatcher::new(config.smtp.as_ref()));
    let engine = AlertEngine::new(pool.clone(), config.alerting.clone(), dispatcher);

    let scheduler = if config.alerting.enabled {
        start_alert_scheduler(engine.clone(), &config.alerting)
    } else {
        tracing::info!("Alert scheduler disabled by configuration");
        AlertSchedulerState::new()
    };

    let state = AppState {
        config: Arc::new(config.clone()),
        db: pool,
        engine,
        scheduler,
    };

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, "Listening");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_logging(config: &AppConfig) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.target {
        LogTarget::Console => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            Ok(None)
        }
        LogTarget::File => {
            let (writer, guard) = file_writer(config);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        LogTarget::Both => {
            let (writer, guard) = file_writer(config);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
    }
}

fn file_writer(
    config: &AppConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    let appender = if config.logging.daily_rotation {
        tracing_appender::rolling::daily(&config.logging.log_dir, &config.logging.log_prefix)
    } else {
        tracing_appender::rolling::never(
            &config.logging.log_dir,
            format!("{}.log", config.logging.log_prefix),
        )
    };
    tracing_appender::non_blocking(appender)
}

fn print_help() {
    println!("buildboard {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    buildboard [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help");
    println!("    -V, --version    Print version");
    println!();
    println!("Configuration is read from config.yaml (or BUILDBOARD_CONFIG)");
    println!("with BUILDBOARD_* environment variable overrides.");
}
