use crate::config::receipt::ReceiptConfig;
use crate::config::smtp::{SmtpSecurity, SmtpSettings};
use crate::domain::model::OutgoingEmail;
use crate::domain::ports::Mailer;
use crate::utils::error::{ReceiptError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Sends receipts through an SMTP relay, one message per student.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let builder = match settings.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                    .map_err(|e| ReceiptError::config(format!("SMTP_HOST: {}", e)))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| ReceiptError::config(format!("SMTP_HOST: {}", e)))?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            }
        };

        let mut builder = builder.port(settings.port);
        if let (Some(user), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        tracing::debug!("SMTP transport configured: {:?}", settings);
        Ok(Self {
            transport: builder.build(),
        })
    }
}

/// Checks the sender address before any record is processed.
pub fn validate_sender(config: &ReceiptConfig) -> Result<Address> {
    config
        .from_email
        .trim()
        .parse::<Address>()
        .map_err(|e| ReceiptError::InvalidConfigValueError {
            field: "from_email".to_string(),
            value: config.from_email.clone(),
            reason: e.to_string(),
        })
}

/// Builds a `multipart/mixed` message: plain text body plus the receipt PDF.
pub fn build_message(email: &OutgoingEmail) -> Result<Message> {
    let send_error = |message: String| ReceiptError::SendError {
        recipient: email.to.clone(),
        message,
    };

    let from_address = email
        .from_email
        .trim()
        .parse::<Address>()
        .map_err(|e| send_error(format!("invalid sender address: {}", e)))?;
    let to_address = email
        .to
        .trim()
        .parse::<Address>()
        .map_err(|e| send_error(format!("invalid recipient address: {}", e)))?;

    let from_name = email.from_name.trim();
    let from = Mailbox::new(
        (!from_name.is_empty()).then(|| from_name.to_string()),
        from_address,
    );

    let pdf = ContentType::parse("application/pdf")
        .map_err(|e| send_error(format!("attachment content type: {}", e)))?;
    let attachment = Attachment::new(email.attachment.file_name.clone())
        .body(email.attachment.bytes.clone(), pdf);

    Message::builder()
        .from(from)
        .to(Mailbox::new(None, to_address))
        .subject(email.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(email.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|e| send_error(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(email)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| ReceiptError::SendError {
                recipient: email.to.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!("SMTP accepted message for {}: {:?}", email.to, response.code());
        Ok(())
    }
}
