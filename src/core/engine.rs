use crate::config::positions::PositionsConfig;
use crate::config::receipt::ReceiptConfig;
use crate::core::composer::EmailComposer;
use crate::core::mapper::map_fields;
use crate::core::renderer::{receipt_file_name, ReceiptTemplate};
use crate::domain::model::{
    FailedRecord, OutgoingEmail, RenderedReceipt, RunSummary, Stage, StudentRecord,
};
use crate::domain::ports::{Mailer, Storage};
use crate::utils::error::{ReceiptError, Result};

type StageResult<T> = std::result::Result<T, (Stage, ReceiptError)>;

/// Renders one receipt per student and either previews or emails it.
///
/// Records are handled one at a time; a failing record is counted and the run moves on.
pub struct ReceiptEngine<S: Storage> {
    storage: S,
    template: ReceiptTemplate,
    positions: PositionsConfig,
    receipt: ReceiptConfig,
    composer: EmailComposer,
    mailer: Option<Box<dyn Mailer>>,
}

impl<S: Storage> ReceiptEngine<S> {
    pub fn new(
        storage: S,
        template: ReceiptTemplate,
        positions: PositionsConfig,
        receipt: ReceiptConfig,
        composer: EmailComposer,
    ) -> Self {
        Self {
            storage,
            template,
            positions,
            receipt,
            composer,
            mailer: None,
        }
    }

    /// Switches the engine from preview to send mode.
    pub fn with_mailer(mut self, mailer: Box<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn is_preview(&self) -> bool {
        self.mailer.is_none()
    }

    pub fn receipt_config(&self) -> &ReceiptConfig {
        &self.receipt
    }

    pub async fn run<I>(&self, records: I) -> RunSummary
    where
        I: IntoIterator<Item = Result<StudentRecord>>,
    {
        let mut summary = RunSummary::default();
        tracing::info!(
            "Starting receipt run in {} mode",
            if self.is_preview() { "preview" } else { "send" }
        );

        for item in records {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    let row = match &e {
                        ReceiptError::RowError { row, .. } => *row,
                        _ => 0,
                    };
                    tracing::warn!("Skipping row {}: {}", row, e);
                    summary.record_failure(FailedRecord {
                        row,
                        stage: Stage::Read,
                        recipient: format!("row {}", row),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.process(&record).await {
                Ok(path) => {
                    summary.record_success();
                    summary.written.push(path);
                }
                Err((stage, e)) => {
                    tracing::error!(
                        "Row {} ({}) failed at {}: {}",
                        record.row,
                        record.name,
                        stage,
                        e
                    );
                    summary.record_failure(FailedRecord {
                        row: record.row,
                        stage,
                        recipient: recipient_label(&record),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!("{}", summary);
        summary
    }

    async fn process(&self, record: &StudentRecord) -> StageResult<String> {
        let placements = map_fields(
            record,
            &self.receipt,
            &self.positions,
            self.template.page_size(),
        )
        .map_err(|e| (Stage::Map, e))?;
        tracing::debug!("Row {}: {} fields placed", record.row, placements.len());

        let receipt = RenderedReceipt {
            file_name: receipt_file_name(record),
            bytes: self
                .template
                .render(&placements)
                .map_err(|e| (Stage::Render, e))?,
        };

        let path = self
            .storage
            .write_file(&receipt.file_name, &receipt.bytes)
            .await
            .map_err(|e| (Stage::Write, e))?;

        let email = self.composer.compose(record, &self.receipt);

        match &self.mailer {
            None => {
                println!("Prepared email to {} with receipt {}", email.to, path);
            }
            Some(mailer) => {
                let outgoing = OutgoingEmail {
                    from_name: self.receipt.from_name.clone(),
                    from_email: self.receipt.from_email.clone(),
                    to: email.to,
                    subject: email.subject,
                    body: email.body,
                    attachment: receipt,
                };
                mailer
                    .send(&outgoing)
                    .await
                    .map_err(|e| (Stage::Send, e))?;
                println!("Sent receipt {} to {}", path, outgoing.to);
            }
        }

        Ok(path)
    }
}

fn recipient_label(record: &StudentRecord) -> String {
    if !record.email.trim().is_empty() {
        record.email.clone()
    } else if !record.name.trim().is_empty() {
        record.name.clone()
    } else {
        format!("row {}", record.row)
    }
}
