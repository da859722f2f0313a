use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One student row read from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// 1-based spreadsheet row number (the header is row 1).
    pub row: usize,
    pub name: String,
    pub email: String,
    pub amount: String,
    pub date: String,
    pub payment_method: String,
    pub receipt_number: String,
    /// Remaining columns keyed by normalized header.
    pub extra: BTreeMap<String, String>,
}

impl StudentRecord {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// Looks up a record-level value by field key.
    pub fn value(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "email" => Some(&self.email),
            "amount" => Some(&self.amount),
            "date" => Some(&self.date),
            "payment_method" => Some(&self.payment_method),
            "receipt_number" => Some(&self.receipt_number),
            other => self.extra.get(other).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Truncate,
    Wrap,
}

/// A single text drawing instruction in absolute page units.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub key: String,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub max_width: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub overflow: Overflow,
}

#[derive(Debug, Clone)]
pub struct RenderedReceipt {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from_name: String,
    pub from_email: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: RenderedReceipt,
}

/// Where in the per-record flow a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Map,
    Render,
    Write,
    Send,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Stage::Read => "read",
            Stage::Map => "map",
            Stage::Render => "render",
            Stage::Write => "write",
            Stage::Send => "send",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecord {
    pub row: usize,
    pub stage: Stage,
    /// Recipient address when known, otherwise the student name or row label.
    pub recipient: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failures: Vec<FailedRecord>,
    /// Receipt files written by successful records, in processing order.
    pub written: Vec<String>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, failure: FailedRecord) {
        self.processed += 1;
        self.failures.push(failure);
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Processed {}: {} succeeded, {} failed",
            self.processed,
            self.succeeded,
            self.failed()
        )
    }
}
