use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{ContactMessage, ContactNotifier};
use crate::config::SmtpConfig;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.user.clone(), cfg.pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .context("invalid SMTP host")?
            .credentials(creds)
            .build();

        let from = cfg.from.parse().context("invalid CONTACT_EMAIL_FROM")?;
        let to = cfg.to.parse().context("invalid CONTACT_EMAIL_TO")?;

        Ok(Self { mailer, from, to })
    }
}

#[async_trait]
impl ContactNotifier for EmailSender {
    async fn notify(&self, msg: &ContactMessage) -> Result<()> {
        let subject = format!("Contact Form: {}", msg.subject);
        let body = format!(
            "New contact form submission\n\n\
             Name: {} {}\n\
             Email: {}\n\
             Subject: {}\n\n\
             {}\n",
            msg.first_name, msg.last_name, msg.email, msg.subject, msg.message
        );

        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN);

        // Reply straight to the submitter when their address parses.
        if let Ok(reply_to) = msg.email.parse::<Mailbox>() {
            builder = builder.reply_to(reply_to);
        }

        let mail = builder.body(body).context("build contact email")?;
        self.mailer.send(mail).await.context("send contact email")?;
        Ok(())
    }
}
