use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("File error ({path}): {message}")]
    FileError { path: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Row {row}: {message}")]
    RowError { row: usize, message: String },

    #[error("PDF error: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("Render error: {message}")]
    RenderError { message: String },

    #[error("Failed to send to {recipient}: {message}")]
    SendError { recipient: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    File,
    Config,
    Data,
    Render,
    Send,
}

impl ReceiptError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::RenderError {
            message: message.into(),
        }
    }

    pub fn file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileError { .. } | Self::IoError(_) => ErrorCategory::File,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Config,
            Self::CsvError(_) | Self::SpreadsheetError(_) | Self::RowError { .. } => {
                ErrorCategory::Data
            }
            Self::PdfError(_) | Self::RenderError { .. } => ErrorCategory::Render,
            Self::SendError { .. } => ErrorCategory::Send,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::File => format!("Could not read an input file. {}", self),
            ErrorCategory::Config => format!("The configuration is incomplete or invalid. {}", self),
            ErrorCategory::Data => format!("The spreadsheet could not be processed. {}", self),
            ErrorCategory::Render => format!("The receipt could not be rendered. {}", self),
            ErrorCategory::Send => format!("The email could not be delivered. {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::File => "Check that the path exists and the spreadsheet headers include name, email and amount",
            ErrorCategory::Config => "Review the JSON configuration files and the SMTP_* environment variables",
            ErrorCategory::Data => "Make sure the first worksheet has a header row followed by one row per student",
            ErrorCategory::Render => "Verify the template is a valid PDF and the positions file matches its layout",
            ErrorCategory::Send => "Check the SMTP credentials and network access, then resend to the failed recipients",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReceiptError>;
