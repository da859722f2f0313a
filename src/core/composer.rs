use crate::config::receipt::ReceiptConfig;
use crate::domain::model::{ComposedEmail, StudentRecord};
use crate::utils::error::{ReceiptError, Result};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

pub const PLACEHOLDERS: &[&str] = &[
    "student_first_name",
    "student_name",
    "student_email",
    "amount",
    "payment_date",
    "payment_method",
    "receipt_number",
    "semester",
    "from_name",
    "from_title",
    "from_email",
];

fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z0-9_]+)\}").expect("valid placeholder pattern")
    })
}

/// Subject and body templates, checked for unknown placeholders up front.
#[derive(Debug, Clone)]
pub struct EmailComposer {
    subject: String,
    body: String,
}

impl EmailComposer {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Result<Self> {
        let composer = Self {
            subject: subject.into(),
            body: body.into(),
        };
        check_placeholders("email_subject", &composer.subject)?;
        check_placeholders("email body", &composer.body)?;
        Ok(composer)
    }

    pub fn from_file<P: AsRef<Path>>(body_path: P, subject: &str) -> Result<Self> {
        let body = std::fs::read_to_string(&body_path).map_err(|e| {
            ReceiptError::file(body_path.as_ref().display().to_string(), e.to_string())
        })?;
        Self::new(subject, body)
    }

    pub fn compose(&self, record: &StudentRecord, config: &ReceiptConfig) -> ComposedEmail {
        let subject = fill(&self.subject, record, config);
        ComposedEmail {
            to: record.email.clone(),
            // Header values must stay on one line.
            subject: subject.lines().map(str::trim).collect::<Vec<_>>().join(" "),
            body: fill(&self.body, record, config),
        }
    }
}

fn check_placeholders(source: &str, template: &str) -> Result<()> {
    for caps in placeholder_pattern().captures_iter(template) {
        if let Some(name) = caps.get(1) {
            if !PLACEHOLDERS.contains(&name.as_str()) {
                return Err(ReceiptError::config(format!(
                    "unknown placeholder {{{}}} in {}; expected one of: {}",
                    name.as_str(),
                    source,
                    PLACEHOLDERS.join(", ")
                )));
            }
        }
    }
    Ok(())
}

fn placeholder_value<'a>(
    name: &str,
    record: &'a StudentRecord,
    config: &'a ReceiptConfig,
) -> &'a str {
    match name {
        "student_first_name" => record.first_name(),
        "student_name" => &record.name,
        "student_email" => &record.email,
        "amount" => &record.amount,
        "payment_date" => &record.date,
        "payment_method" => &record.payment_method,
        "receipt_number" => &record.receipt_number,
        "semester" => &config.semester,
        "from_name" => &config.from_name,
        "from_title" => &config.from_title,
        "from_email" => &config.from_email,
        _ => "",
    }
}

fn fill(template: &str, record: &StudentRecord, config: &ReceiptConfig) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| match caps.get(1) {
            Some(name) => placeholder_value(name.as_str(), record, config).to_string(),
            None => caps[0][..1].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record() -> StudentRecord {
        StudentRecord {
            row: 3,
            name: "Eric Mugisha".to_string(),
            email: "eric@example.com".to_string(),
            amount: "10,000 RWF".to_string(),
            date: "05 March 2026".to_string(),
            payment_method: "Bank Transfer".to_string(),
            receipt_number: "R-0003".to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn config() -> ReceiptConfig {
        ReceiptConfig::from_json_str(
            r#"{"from_name": "Grace", "from_title": "Treasurer", "from_email": "grace@example.org", "semester": "Spring 2026"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_compose_substitutes_placeholders() {
        let composer = EmailComposer::new(
            "Receipt {receipt_number} for {semester}",
            "Dear {student_first_name},\n\nWe received {amount} via {payment_method} on {payment_date}.\n\n{from_name}\n{from_title}",
        )
        .unwrap();

        let email = composer.compose(&record(), &config());
        assert_eq!(email.to, "eric@example.com");
        assert_eq!(email.subject, "Receipt R-0003 for Spring 2026");
        assert_eq!(
            email.body,
            "Dear Eric,\n\nWe received 10,000 RWF via Bank Transfer on 05 March 2026.\n\nGrace\nTreasurer"
        );
    }

    #[test]
    fn test_escaped_braces_are_literal() {
        let composer = EmailComposer::new("Receipt", "Use {{receipt_number}} as reference: {receipt_number}").unwrap();
        let email = composer.compose(&record(), &config());
        assert_eq!(email.body, "Use {receipt_number} as reference: R-0003");
    }

    #[test]
    fn test_unknown_placeholder_is_config_error() {
        let err = EmailComposer::new("Receipt", "Hello {student_nickname}").unwrap_err();
        assert!(matches!(err, ReceiptError::ConfigError { .. }));
        assert!(err.to_string().contains("student_nickname"));
    }

    #[test]
    fn test_subject_is_single_line() {
        let composer = EmailComposer::new("Receipt\n{receipt_number}", "body").unwrap();
        assert_eq!(composer.compose(&record(), &config()).subject, "Receipt R-0003");
    }

    #[test]
    fn test_from_file() {
        let mut body = NamedTempFile::new().unwrap();
        write!(body, "Hi {{student_name}}").unwrap();
        let composer = EmailComposer::from_file(body.path(), "Subject").unwrap();
        assert_eq!(composer.compose(&record(), &config()).body, "Hi Eric Mugisha");

        let err = EmailComposer::from_file("/nonexistent/email_template.txt", "Subject").unwrap_err();
        assert!(matches!(err, ReceiptError::FileError { .. }));
    }
}
