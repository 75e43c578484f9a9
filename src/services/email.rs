//! Email service for lifecycle notifications and report delivery

use lettre::{
    message::{header::ContentType, Attachment, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn reports_recipient(&self) -> &str {
        &self.config.reports_to
    }

    /// Notify a user that their borrow request was fulfilled
    pub async fn send_issue_notification(&self, to: &str, book_title: &str) -> AppResult<()> {
        let subject = "Your book is ready";
        let body = format!(
            r#"
Your borrow request for "{title}" has been fulfilled.

The book is now available in your library. Happy reading!
"#,
            title = book_title
        );

        self.send_email(to, subject, &body, None).await
    }

    /// Notify a user that their borrow request was denied
    pub async fn send_rejection_notification(&self, to: &str, book_title: &str) -> AppResult<()> {
        let subject = "About your borrow request";
        let body = format!(
            r#"
Your borrow request for "{title}" could not be fulfilled and has been denied by a librarian.

You can request another title at any time.
"#,
            title = book_title
        );

        self.send_email(to, subject, &body, None).await
    }

    /// Send the issue-activity CSV export as an attachment
    pub async fn send_csv_report(&self, to: &str, filename: &str, csv: &str) -> AppResult<()> {
        let subject = "Issue activity CSV report";
        let body = "Attached is the issue activity CSV report.".to_string();

        self.send_email(to, subject, &body, Some((filename.to_string(), csv.to_string())))
            .await
    }

    /// Send the monthly activity report as HTML
    pub async fn send_monthly_report(&self, to: &str, html: &str) -> AppResult<()> {
        let from_mailbox = self.from_mailbox()?;
        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject("Monthly activity report")
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html.to_string()),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport()?.send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;
        Ok(())
    }

    /// Generic email sending function, optionally with a CSV attachment
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<(String, String)>,
    ) -> AppResult<()> {
        let from_mailbox = self.from_mailbox()?;
        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let text_part = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string());

        let multipart = match attachment {
            Some((filename, csv)) => {
                let content_type = ContentType::parse("text/csv")
                    .map_err(|e| AppError::Internal(format!("Invalid content type: {}", e)))?;
                MultiPart::mixed()
                    .singlepart(text_part)
                    .singlepart(Attachment::new(filename).body(csv.into_bytes(), content_type))
            }
            None => MultiPart::alternative().singlepart(text_part),
        };

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(multipart)
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport()?.send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }

    fn from_mailbox(&self) -> AppResult<Mailbox> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Lectern");
        Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(builder.build())
    }
}
