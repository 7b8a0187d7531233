//! Mailclerk configuration system.
//!
//! One TOML file describes the mail account, the Dropbox backend and both
//! jobs. Every field the jobs need is an explicit key here; `validate`
//! reports all missing required keys at once so a misconfigured deployment
//! fails before any network call.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ClerkError, Outcome};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailclerkConfig {
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub dropbox: DropboxConfig,
    #[serde(default)]
    pub forwarder: ForwarderConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
}

impl MailclerkConfig {
    /// Load config from the default path (~/.mailclerk/config.toml).
    pub fn load() -> Outcome<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Outcome<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClerkError::config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ClerkError::config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mailclerk")
            .join("config.toml")
    }

    /// Check every required key, reporting all missing ones in one error.
    pub fn validate(&self) -> Outcome<()> {
        fn require(missing: &mut Vec<String>, key: &str, value: &str) {
            if value.trim().is_empty() {
                missing.push(key.to_string());
            }
        }

        let mut missing = Vec::new();

        require(&mut missing, "mail.imap_host", &self.mail.imap_host);
        require(&mut missing, "mail.smtp_host", &self.mail.smtp_host);
        require(&mut missing, "mail.email", &self.mail.email);
        require(&mut missing, "mail.password", &self.mail.password);
        require(&mut missing, "dropbox.access_token", &self.dropbox.access_token);

        if self.forwarder.enabled {
            require(&mut missing, "forwarder.query", &self.forwarder.query);
            require(&mut missing, "forwarder.from_address", &self.forwarder.from_address);
            require(&mut missing, "forwarder.to_address", &self.forwarder.to_address);
            require(&mut missing, "forwarder.bcc_address", &self.forwarder.bcc_address);
            if self.forwarder.run_on_days.is_empty() {
                missing.push("forwarder.run_on_days".to_string());
            }
        }

        if self.rotation.enabled {
            require(&mut missing, "rotation.from_address", &self.rotation.from_address);
            require(&mut missing, "rotation.subject_cleaning", &self.rotation.subject_cleaning);
            require(&mut missing, "rotation.body_cleaning", &self.rotation.body_cleaning);
            require(&mut missing, "rotation.subject_reminder", &self.rotation.subject_reminder);
            require(&mut missing, "rotation.body_reminder", &self.rotation.body_reminder);
            if self.rotation.run_on_days_of_week.is_empty() {
                missing.push("rotation.run_on_days_of_week".to_string());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClerkError::config(format!(
                "missing required keys: {}",
                missing.join(", ")
            )))
        }
    }
}

/// IMAP/SMTP account configuration, shared by both jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_imap_host")]
    pub imap_host: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

fn default_imap_host() -> String {
    "imap.gmail.com".into()
}
fn default_imap_port() -> u16 {
    993
}
fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_mailbox() -> String {
    "INBOX".into()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            imap_host: default_imap_host(),
            imap_port: default_imap_port(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            email: String::new(),
            password: String::new(),
            mailbox: default_mailbox(),
        }
    }
}

/// Dropbox backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_dropbox_api_base")]
    pub api_base: String,
}

fn default_dropbox_api_base() -> String {
    "https://content.dropboxapi.com".into()
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base: default_dropbox_api_base(),
        }
    }
}

/// Forwarder job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderConfig {
    #[serde(default)]
    pub enabled: bool,
    /// IMAP SEARCH criteria selecting candidate emails.
    #[serde(default)]
    pub query: String,
    /// Days of month (1..=31) on which the job may run.
    #[serde(default)]
    pub run_on_days: Vec<u32>,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub to_address: String,
    #[serde(default)]
    pub to_name: String,
    /// Comma-separated list of bcc addresses.
    #[serde(default)]
    pub bcc_address: String,
    #[serde(default = "default_forwarder_state_path")]
    pub state_path: String,
}

fn default_forwarder_state_path() -> String {
    "/gmailer_state.json".into()
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            query: String::new(),
            run_on_days: Vec::new(),
            from_address: String::new(),
            from_name: String::new(),
            to_address: String::new(),
            to_name: String::new(),
            bcc_address: String::new(),
            state_path: default_forwarder_state_path(),
        }
    }
}

/// Rotation (newsletter) job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Full weekday names ("Thursday") on which the job may run.
    #[serde(default)]
    pub run_on_days_of_week: Vec<String>,
    /// Earliest local time of day ("HH:MM") the job may run.
    #[serde(default = "default_run_after")]
    pub run_after: String,
    /// Fixed UTC offset of the deployment's wall clock, e.g. "+01:00".
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: String,
    /// Zone label used in diagnostic messages, e.g. "CET".
    #[serde(default = "default_timezone_label")]
    pub timezone_label: String,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub from_name: String,
    /// Comma-separated list of bcc addresses.
    #[serde(default)]
    pub bcc_address: String,
    #[serde(default)]
    pub subject_cleaning: String,
    #[serde(default)]
    pub body_cleaning: String,
    #[serde(default)]
    pub subject_reminder: String,
    #[serde(default)]
    pub body_reminder: String,
    #[serde(default = "default_rotation_state_path")]
    pub state_path: String,
    #[serde(default = "default_roster_path")]
    pub roster_path: String,
}

fn default_run_after() -> String {
    "10:00".into()
}
fn default_timezone_offset() -> String {
    "+00:00".into()
}
fn default_timezone_label() -> String {
    "UTC".into()
}
fn default_rotation_state_path() -> String {
    "/newsletter_state.json".into()
}
fn default_roster_path() -> String {
    "/members.json".into()
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            run_on_days_of_week: Vec::new(),
            run_after: default_run_after(),
            timezone_offset: default_timezone_offset(),
            timezone_label: default_timezone_label(),
            from_address: String::new(),
            from_name: String::new(),
            bcc_address: String::new(),
            subject_cleaning: String::new(),
            body_cleaning: String::new(),
            subject_reminder: String::new(),
            body_reminder: String::new(),
            state_path: default_rotation_state_path(),
            roster_path: default_roster_path(),
        }
    }
}
