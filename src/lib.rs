pub mod adapters;
#[cfg(feature = "cli")]
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::smtp::SmtpMailer;
pub use config::cli::LocalStorage;
pub use core::engine::ReceiptEngine;
pub use domain::model::{RunSummary, StudentRecord};
pub use utils::error::{ReceiptError, Result};
