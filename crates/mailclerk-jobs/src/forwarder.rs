//! Simple-forward job: once a month, find the newest email matching the
//! configured query, re-address it and send it on, then record what was
//! sent so the decision is never repeated.
//!
//! There is no discrete state machine here; eligibility is a pure function
//! of the persisted `(lastEmailSent, emailContents)` pair and "now",
//! evaluated as one ordered decision table.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use mailclerk_core::config::ForwarderConfig;
use mailclerk_core::{ClerkError, Outcome};
use mailclerk_mail::{Address, MailClient, parse_address_list, rewrite_for_forwarding, subject_of};
use mailclerk_store::{BlobStore, Datastore};
use serde::{Deserialize, Serialize};

use crate::dedup;
use crate::gate::ScheduleGate;
use crate::Job;

/// Persisted forwarder state. The JSON document keeps the field names and
/// base64 `emailContents` encoding of the original state blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardState {
    pub last_email_sent: DateTime<Utc>,
    #[serde(with = "base64_text")]
    pub email_contents: String,
}

mod base64_text {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(&encoded).map_err(serde::de::Error::custom)?;
        String::from_utf8(bytes).map_err(serde::de::Error::custom)
    }
}

pub struct ForwarderJob {
    config: ForwarderConfig,
    mail: Arc<dyn MailClient>,
    datastore: Datastore<ForwardState>,
    gate: ScheduleGate,
}

impl ForwarderJob {
    pub fn new(config: ForwarderConfig, mail: Arc<dyn MailClient>, blobs: Arc<dyn BlobStore>) -> Self {
        let gate = ScheduleGate::on_days_of_month(config.run_on_days.clone());
        let datastore = Datastore::new(blobs, config.state_path.clone());
        Self {
            config,
            mail,
            datastore,
            gate,
        }
    }

    async fn execute(&self, now: DateTime<Utc>) -> Outcome<String> {
        let now = self.gate.evaluate(now)?;
        let state = self.datastore.current().await?;
        let candidate = self.eligible_candidate(&state, now).await?;
        self.forward_and_record(candidate, now).await
    }

    /// The ordered decision table: integrity first, then candidate
    /// availability, then dedup, then the calendar-month rule.
    async fn eligible_candidate(&self, state: &ForwardState, now: DateTime<Utc>) -> Outcome<String> {
        if state.last_email_sent > now {
            return Err(ClerkError::InvalidStateInFuture);
        }

        let handle = self.mail.latest_matching(&self.config.query).await?;
        let Some(handle) = handle else {
            return Err(ClerkError::NoMatchingResultsForQuery(self.config.query.clone()));
        };
        let Some(bytes) = self.mail.raw_content(&handle).await? else {
            return Err(ClerkError::CouldNotGetRawContent);
        };
        let candidate =
            String::from_utf8(bytes).map_err(|_| ClerkError::CouldNotDecodeRawContent)?;

        if dedup::is_duplicate_content(&candidate, &state.email_contents) {
            return Err(ClerkError::ThisEmailAlreadySent);
        }

        match year_month(state.last_email_sent).cmp(&year_month(now)) {
            Ordering::Equal => Err(ClerkError::already_sent_this_month(now)),
            Ordering::Less => Ok(candidate),
            // Unreachable: a later month implies a future timestamp, caught
            // above.
            Ordering::Greater => Err(ClerkError::Unknown),
        }
    }

    async fn forward_and_record(&self, candidate: String, now: DateTime<Utc>) -> Outcome<String> {
        let from = Address::new(&self.config.from_name, &self.config.from_address);
        let to = Address::new(&self.config.to_name, &self.config.to_address);
        let bcc = parse_address_list(&self.config.bcc_address)?;

        let outgoing = rewrite_for_forwarding(&candidate, &from, &to, &bcc);
        let mut recipients = vec![to.clone()];
        recipients.extend(bcc.iter().cloned());

        self.mail
            .send_raw(&from, &recipients, outgoing.as_bytes())
            .await
            .map_err(|_| ClerkError::CouldNotSendEmail {
                subject: subject_of(outgoing.as_bytes()).unwrap_or_default(),
                recipients: vec![to.to_string()],
            })?;
        tracing::info!(job = self.name(), "candidate email forwarded");

        let new_state = ForwardState {
            last_email_sent: now,
            email_contents: outgoing,
        };
        self.datastore.store(&new_state, "New email has been sent").await
    }
}

#[async_trait]
impl Job for ForwarderJob {
    fn name(&self) -> &str {
        "forwarder"
    }

    async fn run(&self, now: DateTime<Utc>) -> String {
        self.execute(now).await.unwrap_or_else(|e| e.to_string())
    }
}

fn year_month(t: DateTime<Utc>) -> (i32, u32) {
    (t.year(), t.month())
}
