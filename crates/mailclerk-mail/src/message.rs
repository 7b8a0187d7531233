//! Email value types and raw-message helpers.
//!
//! [`OutgoingEmail`] is the constructed message the rotation job sends;
//! [`rewrite_for_forwarding`] re-addresses a fetched raw message the way the
//! forwarder needs (new From/To/Bcc, everything else untouched).

use std::fmt;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use mailclerk_core::{ClerkError, Outcome};

/// A display name + email address pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub name: Option<String>,
    pub email: String,
}

impl Address {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() { None } else { Some(name) },
            email: email.into(),
        }
    }

    pub fn bare(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    fn to_mailbox(&self) -> Outcome<Mailbox> {
        let rendered = self.to_string();
        rendered
            .parse()
            .map_err(|e| ClerkError::mail(format!("invalid address '{rendered}': {e}")))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// Parse a comma-separated address list ("a@x.com, B <b@y.com>").
///
/// Any invalid entry rejects the whole list; a half-parsed recipient set
/// must never reach the send stage.
pub fn parse_address_list(list: &str) -> Outcome<Vec<Address>> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut addresses = Vec::new();
    for entry in list.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(ClerkError::NotAListOfEmailAddresses(list.to_string()));
        }
        let mailbox: Mailbox = entry
            .parse()
            .map_err(|_| ClerkError::NotAListOfEmailAddresses(list.to_string()))?;
        addresses.push(Address {
            name: mailbox.name.clone(),
            email: mailbox.email.to_string(),
        });
    }
    Ok(addresses)
}

/// A message constructed from templates, ready to be formatted and sent.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: Address,
    pub to: Vec<Address>,
    pub bcc: Vec<Address>,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// Build the lettre message. Each call generates a fresh Message-ID;
    /// dedup strips it before comparing.
    pub fn to_message(&self) -> Outcome<Message> {
        let mut builder = Message::builder()
            .from(self.from.to_mailbox()?)
            .subject(&self.subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.to_mailbox()?);
        }
        for bcc in &self.bcc {
            builder = builder.bcc(bcc.to_mailbox()?);
        }
        builder
            .body(self.body.clone())
            .map_err(|e| ClerkError::mail(format!("build email: {e}")))
    }

    /// Formatted RFC822 text of the message.
    pub fn formatted(&self) -> Outcome<String> {
        let bytes = self.to_message()?.formatted();
        String::from_utf8(bytes).map_err(|_| ClerkError::CouldNotDecodeRawContent)
    }

    /// Recipient list in the "Name <addr>" form used by diagnostics.
    pub fn recipient_lines(&self) -> Vec<String> {
        self.to.iter().map(|a| a.to_string()).collect()
    }
}

/// Subject of a raw RFC822 message, when one can be parsed out.
pub fn subject_of(raw: &[u8]) -> Option<String> {
    let parsed = mail_parser::MessageParser::default().parse(raw)?;
    parsed.subject().map(String::from)
}

/// Re-address a raw message for forwarding: replace the From, To and Bcc
/// headers (dropping their folded continuation lines), leave every other
/// header and the whole body untouched.
pub fn rewrite_for_forwarding(raw: &str, from: &Address, to: &Address, bcc: &[Address]) -> String {
    let (headers, body, sep) = match raw.find("\r\n\r\n") {
        Some(i) => (&raw[..i], &raw[i + 4..], "\r\n"),
        None => match raw.find("\n\n") {
            Some(i) => (&raw[..i], &raw[i + 2..], "\n"),
            None => (raw, "", "\n"),
        },
    };

    let bcc_line = bcc
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut out: Vec<String> = Vec::new();
    let mut replaced_from = false;
    let mut replaced_to = false;
    let mut replaced_bcc = false;
    let mut skip_continuation = false;

    for line in headers.lines() {
        if skip_continuation && (line.starts_with(' ') || line.starts_with('\t')) {
            continue;
        }
        skip_continuation = false;
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("from:") {
            out.push(format!("From: {from}"));
            replaced_from = true;
            skip_continuation = true;
        } else if lower.starts_with("to:") {
            out.push(format!("To: {to}"));
            replaced_to = true;
            skip_continuation = true;
        } else if lower.starts_with("bcc:") {
            if !bcc_line.is_empty() {
                out.push(format!("Bcc: {bcc_line}"));
            }
            replaced_bcc = true;
            skip_continuation = true;
        } else {
            out.push(line.to_string());
        }
    }
    if !replaced_from {
        out.push(format!("From: {from}"));
    }
    if !replaced_to {
        out.push(format!("To: {to}"));
    }
    if !replaced_bcc && !bcc_line.is_empty() {
        out.push(format!("Bcc: {bcc_line}"));
    }

    format!("{}{sep}{sep}{}", out.join(sep), body)
}
