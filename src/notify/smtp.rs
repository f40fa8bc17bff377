use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Delivery, Notifier};

/// SMTP relay delivery via lettre.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from: &str,
    ) -> Result<Self, String> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| format!("Invalid sender address {from}: {e}"))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| format!("Invalid SMTP relay {host}: {e}"))?
            .port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Delivery {
        let to: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => return Delivery::failed(format!("Invalid recipient {to}: {e}")),
        };

        let message = match Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
        {
            Ok(message) => message,
            Err(e) => return Delivery::failed(format!("Failed to build email: {e}")),
        };

        match self.transport.send(message).await {
            Ok(_) => Delivery::sent(),
            Err(e) => Delivery::failed(format!("SMTP delivery failed: {e}")),
        }
    }
}
