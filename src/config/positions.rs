use crate::domain::model::Overflow;
use crate::utils::error::{ReceiptError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_FONT_SIZE: f32 = 10.0;
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Field keys accepted for compatibility with older positions files.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("received_from", "name"),
    ("student_name", "name"),
    ("contribution_period", "semester"),
    ("authorized_by", "from_name"),
    ("payment_date", "date"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    #[default]
    BottomLeft,
    TopLeft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub x_pct: f32,
    pub y_pct: f32,
    #[serde(default)]
    pub max_width: Option<f32>,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub overflow: Overflow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionsConfig {
    #[serde(default)]
    pub origin: Origin,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,
    pub fields: BTreeMap<String, PositionEntry>,
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_required_fields() -> Vec<String> {
    vec!["name".to_string(), "amount".to_string()]
}

pub fn canonical_key(key: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(key)
}

impl PositionsConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ReceiptError::file(path.as_ref().display().to_string(), e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parses, folds aliased keys onto their canonical names and validates.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: PositionsConfig = serde_json::from_str(content)
            .map_err(|e| ReceiptError::config(format!("positions config: {}", e)))?;

        let mut fields = BTreeMap::new();
        for (key, entry) in raw.fields {
            let canonical = canonical_key(key.trim().to_lowercase().as_str()).to_string();
            if fields.insert(canonical.clone(), entry).is_some() {
                return Err(ReceiptError::config(format!(
                    "field '{}' is positioned more than once",
                    canonical
                )));
            }
        }

        let required_fields = raw
            .required_fields
            .iter()
            .map(|key| canonical_key(key.trim().to_lowercase().as_str()).to_string())
            .collect();

        let config = Self {
            origin: raw.origin,
            font_size: raw.font_size,
            required_fields,
            fields,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn entry(&self, key: &str) -> Option<&PositionEntry> {
        self.fields.get(canonical_key(key))
    }
}

impl Validate for PositionsConfig {
    fn validate(&self) -> Result<()> {
        validate_range("font_size", self.font_size, 1.0, 200.0)?;

        for (key, entry) in &self.fields {
            validate_non_empty_string("fields", key)?;
            validate_range(&format!("fields.{}.x_pct", key), entry.x_pct, 0.0, 1.0)?;
            validate_range(&format!("fields.{}.y_pct", key), entry.y_pct, 0.0, 1.0)?;
            if let Some(max_width) = entry.max_width {
                if max_width <= 0.0 {
                    return Err(ReceiptError::InvalidConfigValueError {
                        field: format!("fields.{}.max_width", key),
                        value: max_width.to_string(),
                        reason: "Value must be positive".to_string(),
                    });
                }
            }
            if let Some(font_size) = entry.font_size {
                validate_range(&format!("fields.{}.font_size", key), font_size, 1.0, 200.0)?;
            }
        }

        Ok(())
    }
}
