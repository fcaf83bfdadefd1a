//! buildboard: CI build monitoring with alerting
//!
//! Polls Jenkins and GitHub Actions integrations, evaluates alert
//! definitions against recent runs and dispatches notifications over
//! email and chat webhooks, with windowed dedup and a persistent
//! notification history.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use config::AppConfig;
use db::DbPool;
use services::{AlertEngine, AlertSchedulerState};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub engine: AlertEngine,
    pub scheduler: AlertSchedulerState,
}
