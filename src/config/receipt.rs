use crate::utils::error::{ReceiptError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_SUBJECT: &str = "Official Receipt – Spring Semester Contribution";

/// Sender identity and per-run labels shared by every receipt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptConfig {
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub from_title: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default = "default_subject")]
    pub email_subject: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub amount_words: String,
    #[serde(default = "default_payment_method")]
    pub default_payment_method: String,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_currency() -> String {
    "RWF".to_string()
}

fn default_payment_method() -> String {
    "Mobile Money".to_string()
}

impl ReceiptConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ReceiptError::file(path.as_ref().display().to_string(), e.to_string()))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        serde_json::from_str(&processed_content)
            .map_err(|e| ReceiptError::config(format!("receipt config: {}", e)))
    }

    /// Receipt-level values that can be placed on the template.
    pub fn value(&self, key: &str) -> Option<&str> {
        match key {
            "semester" => Some(&self.semester),
            "from_name" => Some(&self.from_name),
            "from_title" => Some(&self.from_title),
            "amount_words" => Some(&self.amount_words),
            _ => None,
        }
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables are kept as-is.
pub fn substitute_env_vars(content: &str) -> String {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}
