use crate::utils::error::{ReceiptError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_required_field};

pub const DEFAULT_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_PORT: u16 = 587;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    StartTls,
    Tls,
    None,
}

impl std::str::FromStr for SmtpSecurity {
    type Err = ReceiptError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "starttls" => Ok(Self::StartTls),
            "tls" | "ssl" => Ok(Self::Tls),
            "none" | "plain" => Ok(Self::None),
            other => Err(ReceiptError::InvalidConfigValueError {
                field: "SMTP_SECURITY".to_string(),
                value: other.to_string(),
                reason: "Expected one of: starttls, tls, none".to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("security", &self.security)
            .finish()
    }
}

impl SmtpSettings {
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASSWORD` and `SMTP_SECURITY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = non_blank("SMTP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        validate_non_empty_string("SMTP_HOST", &host)?;

        let port = match non_blank("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ReceiptError::InvalidConfigValueError {
                    field: "SMTP_PORT".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_PORT,
        };

        let security = non_blank("SMTP_SECURITY")
            .map(|raw| raw.parse::<SmtpSecurity>())
            .transpose()?
            .unwrap_or(SmtpSecurity::StartTls);

        let username = non_blank("SMTP_USER");
        let password = non_blank("SMTP_PASSWORD");

        // Unauthenticated relays are only accepted on plain connections.
        if security != SmtpSecurity::None {
            validate_required_field("SMTP_USER", &username)?;
            validate_required_field("SMTP_PASSWORD", &password)?;
        }

        Ok(Self {
            host,
            port,
            username,
            password,
            security,
        })
    }
}
