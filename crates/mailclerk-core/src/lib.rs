//! # Mailclerk Core
//!
//! Shared foundation for the mailclerk jobs: the failure taxonomy
//! ([`error::ClerkError`]), the [`error::Outcome`] result alias every
//! pipeline stage returns, and the TOML configuration schema.

pub mod config;
pub mod error;

pub use config::MailclerkConfig;
pub use error::{ClerkError, Outcome};
