pub mod cli;
pub mod positions;
pub mod receipt;
pub mod smtp;

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["csv", "xlsx", "xlsm", "xls", "xlsb", "ods"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "receipt-mailer")]
#[command(about = "Generate receipts and email them to students")]
pub struct CliConfig {
    /// Spreadsheet with one row per student
    #[arg(long, default_value = "Student Funds List 2026-2027.xlsx")]
    pub excel: String,

    /// PDF the receipt text is drawn onto
    #[arg(long, default_value = "Receipt Template.pdf")]
    pub template: String,

    /// Directory receiving one PDF per student
    #[arg(long, default_value = "receipts")]
    pub output: String,

    /// Sender, semester and subject settings (JSON)
    #[arg(long, default_value = "receipt_config.json")]
    pub config: String,

    /// Field coordinates on the template (JSON)
    #[arg(long, default_value = "template_positions.json")]
    pub positions: String,

    /// Plain-text email body with {placeholder} tokens
    #[arg(long, default_value = "email_template.txt")]
    pub email_template: String,

    /// Actually send emails (otherwise preview only)
    #[arg(long)]
    pub send: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        use crate::utils::validation::{
            validate_existing_file, validate_file_extension, validate_path,
        };

        validate_existing_file("excel", &self.excel)?;
        validate_file_extension("excel", &self.excel, SPREADSHEET_EXTENSIONS)?;
        validate_existing_file("template", &self.template)?;
        validate_existing_file("config", &self.config)?;
        validate_existing_file("positions", &self.positions)?;
        validate_existing_file("email_template", &self.email_template)?;
        validate_path("output", &self.output)?;
        Ok(())
    }
}
