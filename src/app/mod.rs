// Application layer: wires CLI settings, config files and adapters into a receipt run.

use crate::adapters::smtp::{validate_sender, SmtpMailer};
use crate::config::cli::LocalStorage;
use crate::config::positions::PositionsConfig;
use crate::config::receipt::ReceiptConfig;
use crate::config::smtp::SmtpSettings;
use crate::config::CliConfig;
use crate::core::composer::EmailComposer;
use crate::core::engine::ReceiptEngine;
use crate::core::reader::read_students;
use crate::core::renderer::ReceiptTemplate;
use crate::domain::model::RunSummary;
use crate::domain::ports::Mailer;
use crate::utils::error::{ReceiptError, Result};
use crate::utils::validation::Validate;
use std::path::Path;

/// Loads every input and returns an engine in preview mode.
///
/// Any error here is a setup failure: nothing has been rendered yet.
pub fn build_engine(config: &CliConfig) -> Result<ReceiptEngine<LocalStorage>> {
    config.validate()?;

    let receipt = ReceiptConfig::from_file(&config.config)?;
    let positions = PositionsConfig::from_file(&config.positions)?;
    let composer = EmailComposer::from_file(&config.email_template, &receipt.email_subject)?;
    let template = ReceiptTemplate::from_file(&config.template)?;
    tracing::info!(
        "Loaded template {} ({} positioned fields)",
        config.template,
        positions.fields.len()
    );

    std::fs::create_dir_all(&config.output)
        .map_err(|e| ReceiptError::file(config.output.clone(), e.to_string()))?;

    Ok(ReceiptEngine::new(
        LocalStorage::new(config.output.clone()),
        template,
        positions,
        receipt,
        composer,
    ))
}

/// Runs with SMTP delivery when `--send` is given, otherwise previews.
pub async fn run(config: &CliConfig) -> Result<RunSummary> {
    let mailer: Option<Box<dyn Mailer>> = if config.send {
        let settings = SmtpSettings::from_env()?;
        tracing::info!("Sending through {}:{}", settings.host, settings.port);
        Some(Box::new(SmtpMailer::new(&settings)?))
    } else {
        None
    };

    run_with_mailer(config, mailer).await
}

pub async fn run_with_mailer(
    config: &CliConfig,
    mailer: Option<Box<dyn Mailer>>,
) -> Result<RunSummary> {
    let mut engine = build_engine(config)?;
    if let Some(mailer) = mailer {
        validate_sender(engine.receipt_config())?;
        engine = engine.with_mailer(mailer);
    }

    let records = read_students(Path::new(&config.excel), engine.receipt_config())?;
    Ok(engine.run(records).await)
}
