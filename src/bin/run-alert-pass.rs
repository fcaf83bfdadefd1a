//! One-shot alert evaluation pass
//!
//! Runs a single evaluation pass against the configured database and
//! integrations, prints a summary and exits. Meant for cron jobs and
//! operational debugging; it does not start the HTTP server or the
//! background scheduler.

use std::sync::Arc;

use anyhow::{Context, Result};

use buildboard::config::AppConfig;
use buildboard::db;
use buildboard::services::{AlertEngine, NotificationDispatcher};

#[tokio::main]
async fn main() -> Result<()> {
    let mut verbose = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args
                    .next()
                    .context("--config requires a path argument")?;
                std::env::set_var("BUILDBOARD_CONFIG", path);
            }
            "--verbose" | "-v" => verbose = true,
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

    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let pool = db::init_pool(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to initialize database")?;

    let dispatcher = Arc::new(NotificationDispatcher::new(config.smtp.as_ref()));
    let engine = AlertEngine::new(pool, config.alerting.clone(), dispatcher);

    let summary = engine.evaluate_all().await?;

    println!(
        "Evaluated {} alert(s), sent {} notification(s) in {}ms",
        summary.alerts_evaluated,
        summary.notifications_sent,
        (summary.finished_at - summary.started_at).num_milliseconds()
    );
    for result in &summary.results {
        match result.error {
            Some(ref error) => println!("  {}: ERROR {}", result.name, error),
            None => println!(
                "  {}: matched {}, notified {}",
                result.name, result.matched, result.notified
            ),
        }
    }

    if summary.results.iter().any(|r| r.error.is_some()) {
        std::process::exit(1);
    }
    Ok(())
}

fn print_help() {
    println!("run-alert-pass {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    run-alert-pass [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>    Configuration file to load");
    println!("    -v, --verbose          Debug logging");
    println!("    -h, --help             Print help");
}
