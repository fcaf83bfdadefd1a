//! Service layer
//!
//! Business logic of the alerting subsystem: provider clients, the
//! evaluation engine, the notification dispatcher and the background
//! scheduler.

pub mod dispatcher;
pub mod evaluator;
pub mod providers;
pub mod scheduler;

pub use dispatcher::NotificationDispatcher;
pub use evaluator::AlertEngine;
pub use scheduler::{start_alert_scheduler, AlertSchedulerState};
