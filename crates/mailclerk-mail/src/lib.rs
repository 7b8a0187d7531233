//! # Mailclerk Mail
//!
//! The mail-provider boundary: a [`client::MailClient`] trait the jobs are
//! written against, an IMAP/SMTP implementation, and the message value types
//! shared across jobs.

pub mod client;
pub mod message;

pub use client::{ImapSmtpClient, MailClient, MessageHandle};
pub use message::{Address, OutgoingEmail, parse_address_list, rewrite_for_forwarding, subject_of};
