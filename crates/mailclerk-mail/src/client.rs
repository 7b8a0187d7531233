//! Mail client seam: async IMAP retrieval + SMTP sending.
//!
//! The jobs only ever talk to [`MailClient`]; [`ImapSmtpClient`] is the
//! production implementation (TLS IMAP for finding/reading candidates,
//! async lettre over STARTTLS for sending).

use async_trait::async_trait;
use futures::StreamExt;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use mailclerk_core::config::MailConfig;
use mailclerk_core::{ClerkError, Outcome};

use crate::message::{Address, OutgoingEmail};

/// Opaque handle to a message found on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle {
    pub uid: u32,
}

/// Capabilities the jobs need from the mail provider.
#[async_trait]
pub trait MailClient: Send + Sync {
    /// Newest message matching the search criteria, if any.
    async fn latest_matching(&self, query: &str) -> Outcome<Option<MessageHandle>>;

    /// Full raw RFC822 content of a message, if still retrievable.
    async fn raw_content(&self, handle: &MessageHandle) -> Outcome<Option<Vec<u8>>>;

    /// Send a constructed message; returns the formatted text as submitted.
    async fn send(&self, email: &OutgoingEmail) -> Outcome<String>;

    /// Send pre-built raw RFC822 bytes with an explicit envelope.
    async fn send_raw(&self, from: &Address, recipients: &[Address], raw: &[u8]) -> Outcome<()>;
}

type ImapTlsStream = async_imap::Client<tokio_native_tls::TlsStream<tokio::net::TcpStream>>;
type ImapSession = async_imap::Session<tokio_native_tls::TlsStream<tokio::net::TcpStream>>;

/// Create TLS-wrapped IMAP connection (async, tokio-native).
async fn connect_imap_tls(host: &str, port: u16) -> Outcome<ImapTlsStream> {
    let tcp = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(|e| ClerkError::mail(format!("TCP connect: {e}")))?;

    let connector = native_tls::TlsConnector::new()
        .map_err(|e| ClerkError::mail(format!("TLS connector: {e}")))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    let tls_stream = connector
        .connect(host, tcp)
        .await
        .map_err(|e| ClerkError::mail(format!("TLS handshake: {e}")))?;

    Ok(async_imap::Client::new(tls_stream))
}

/// Production mail client over one IMAP/SMTP account.
pub struct ImapSmtpClient {
    config: MailConfig,
}

impl ImapSmtpClient {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    async fn session(&self) -> Outcome<ImapSession> {
        let client = connect_imap_tls(&self.config.imap_host, self.config.imap_port).await?;
        let mut session = client
            .login(&self.config.email, &self.config.password)
            .await
            .map_err(|e| ClerkError::mail(format!("IMAP login: {}", e.0)))?;
        session
            .select(&self.config.mailbox)
            .await
            .map_err(|e| ClerkError::mail(format!("select: {e}")))?;
        Ok(session)
    }

    fn mailer(&self) -> Outcome<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(self.config.email.clone(), self.config.password.clone());
        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| ClerkError::mail(format!("SMTP relay: {e}")))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build(),
        )
    }

    fn envelope(from: &Address, recipients: &[Address]) -> Outcome<lettre::address::Envelope> {
        let sender = from
            .email
            .parse()
            .map_err(|e| ClerkError::mail(format!("invalid sender '{}': {e}", from.email)))?;
        let rcpts = recipients
            .iter()
            .map(|a| {
                a.email
                    .parse()
                    .map_err(|e| ClerkError::mail(format!("invalid recipient '{}': {e}", a.email)))
            })
            .collect::<Outcome<Vec<_>>>()?;
        lettre::address::Envelope::new(Some(sender), rcpts)
            .map_err(|e| ClerkError::mail(format!("envelope: {e}")))
    }
}

#[async_trait]
impl MailClient for ImapSmtpClient {
    async fn latest_matching(&self, query: &str) -> Outcome<Option<MessageHandle>> {
        let mut session = self.session().await?;
        let uids = session
            .uid_search(query)
            .await
            .map_err(|e| ClerkError::mail(format!("search: {e}")))?;
        session.logout().await.ok();

        let latest = uids.into_iter().max();
        tracing::debug!(query, ?latest, "searched for candidate email");
        Ok(latest.map(|uid| MessageHandle { uid }))
    }

    async fn raw_content(&self, handle: &MessageHandle) -> Outcome<Option<Vec<u8>>> {
        let mut session = self.session().await?;
        let mut messages = session
            .uid_fetch(handle.uid.to_string(), "(UID RFC822)")
            .await
            .map_err(|e| ClerkError::mail(format!("fetch: {e}")))?;

        let mut raw = None;
        while let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| ClerkError::mail(format!("fetch msg: {e}")))?;
            if let Some(body) = msg.body() {
                raw = Some(body.to_vec());
            }
        }
        drop(messages);
        session.logout().await.ok();
        Ok(raw)
    }

    async fn send(&self, email: &OutgoingEmail) -> Outcome<String> {
        let message = email.to_message()?;
        let formatted = message.formatted();
        self.mailer()?
            .send(message)
            .await
            .map_err(|e| ClerkError::mail(format!("SMTP send: {e}")))?;
        tracing::info!(to = ?email.recipient_lines(), subject = %email.subject, "email sent");
        String::from_utf8(formatted).map_err(|_| ClerkError::CouldNotDecodeRawContent)
    }

    async fn send_raw(&self, from: &Address, recipients: &[Address], raw: &[u8]) -> Outcome<()> {
        let envelope = Self::envelope(from, recipients)?;
        self.mailer()?
            .send_raw(&envelope, raw)
            .await
            .map_err(|e| ClerkError::mail(format!("SMTP send: {e}")))?;
        tracing::info!(recipients = recipients.len(), "raw email forwarded");
        Ok(())
    }
}
