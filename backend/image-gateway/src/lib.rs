//! Image Gateway
//!
//! Accepts image uploads over HTTP, hands each one to an external worker
//! through the message broker, and answers with the processed result once
//! the worker's reply arrives.

pub mod config;
pub mod error;
pub mod handlers;
pub mod kafka;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
pub use state::{AppState, UploadLimits};
