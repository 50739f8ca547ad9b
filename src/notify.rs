use std::fmt::Display;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, warn};

use crate::config::EmailConfig;
use crate::error::NotificationError;
use crate::models::RecipientList;

/// Delivers one message to a recipient list. Failures are logged and
/// swallowed; callers never see them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipients: &RecipientList, subject: &str, body: &str);
}

/// Sends a single email addressed to every recipient at once.
pub struct EmailNotifier<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
}

impl EmailNotifier {
    /// SMTP relay with STARTTLS and the configured credentials.
    pub fn smtp(config: &EmailConfig) -> Result<Self, NotificationError> {
        let from = parse_mailbox(&config.from_address)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self::with_transport(transport, from))
    }
}

impl<T> EmailNotifier<T>
where
    T: AsyncTransport + Send + Sync,
    T::Ok: Send,
    T::Error: Display + Send,
{
    pub fn with_transport(transport: T, from: Mailbox) -> Self {
        Self { transport, from }
    }

    async fn dispatch(
        &self,
        recipients: &RecipientList,
        subject: &str,
        body: &str,
    ) -> Result<(), NotificationError> {
        if recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for address in recipients.addresses() {
            builder = builder.to(parse_mailbox(address)?);
        }
        let message = builder.body(body.to_string())?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Dispatch(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl<T> Notifier for EmailNotifier<T>
where
    T: AsyncTransport + Send + Sync,
    T::Ok: Send,
    T::Error: Display + Send,
{
    async fn notify(&self, recipients: &RecipientList, subject: &str, body: &str) {
        match self.dispatch(recipients, subject, body).await {
            Ok(()) => info!(recipients = %recipients, "Sent \"{}\"", subject),
            Err(e) => {
                warn!(recipients = %recipients, error = %e, "Failed to send \"{}\"", subject);
                debug!("Undelivered message body: {}", body);
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|source| NotificationError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}
