//! Rotation job: a two-phase weekly cycle over a member roster.
//!
//! In `CLEANING_THIS_WEEK` every member gets the cleaning announcement and
//! the member on notice is the current cleaner; in `NOT_CLEANING_THIS_WEEK`
//! only the next cleaner gets a reminder. Each successful send flips the
//! phase, advances the cyclic cursor and replaces the persisted state in
//! one write; the gate and the dedup check alone never change state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mailclerk_core::config::RotationConfig;
use mailclerk_core::{ClerkError, Outcome};
use mailclerk_mail::{Address, MailClient, OutgoingEmail, parse_address_list};
use mailclerk_store::{BlobStore, Datastore};
use serde::{Deserialize, Serialize};

use crate::dedup;
use crate::gate::{ScheduleGate, Zone, time_from_config, weekday_from_name};
use crate::roster::{Member, Roster};
use crate::Job;

const CLEANING_SUCCESS: &str = "{{cleaner}} is cleaning this week - an email has been sent to all members.\nCurrent state has been stored in Dropbox";
const REMINDER_SUCCESS: &str = "There is no cleaning this week - an email reminder has been sent to {{cleaner}} who is cleaning next week.\nCurrent state has been stored in Dropbox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationStatus {
    #[serde(rename = "CLEANING_THIS_WEEK")]
    CleaningThisWeek,
    #[serde(rename = "NOT_CLEANING_THIS_WEEK")]
    NotCleaningThisWeek,
}

impl RotationStatus {
    pub fn flip(self) -> Self {
        match self {
            Self::CleaningThisWeek => Self::NotCleaningThisWeek,
            Self::NotCleaningThisWeek => Self::CleaningThisWeek,
        }
    }
}

/// Persisted rotation state; same JSON layout as the original documents.
/// `cleaner` is present only while `status` is `CLEANING_THIS_WEEK`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationState {
    pub status: RotationStatus,
    pub cleaner: Option<Member>,
    pub next_up: Member,
    pub last_ran_on: NaiveDate,
    pub email_contents: String,
}

/// Ephemeral per-run context: what to send, to whom, and which member the
/// pending cycle is about. Owned by a single pipeline run, never persisted.
struct SendContext {
    email: OutgoingEmail,
    success_template: &'static str,
    previous_contents: String,
    on_notice: Member,
}

pub struct RotationJob {
    config: RotationConfig,
    mail: Arc<dyn MailClient>,
    state_store: Datastore<RotationState>,
    roster_store: Datastore<Roster>,
    gate: ScheduleGate,
}

impl RotationJob {
    pub fn new(
        config: RotationConfig,
        mail: Arc<dyn MailClient>,
        blobs: Arc<dyn BlobStore>,
    ) -> Outcome<Self> {
        let days = config
            .run_on_days_of_week
            .iter()
            .map(|name| weekday_from_name(name))
            .collect::<Outcome<Vec<_>>>()?;
        let zone = Zone::parse(&config.timezone_offset, &config.timezone_label)?;
        let gate = ScheduleGate::on_weekdays_after(days, time_from_config(&config.run_after)?, zone);
        let state_store = Datastore::new(blobs.clone(), config.state_path.clone());
        let roster_store = Datastore::new(blobs, config.roster_path.clone());
        Ok(Self {
            config,
            mail,
            state_store,
            roster_store,
            gate,
        })
    }

    async fn execute(&self, now: DateTime<Utc>) -> Outcome<String> {
        let now = self.gate.evaluate(now)?;

        // State and roster live in two independent documents; the first
        // failed fetch ends the run.
        let state = self.state_store.current().await?;
        let roster = self.roster_store.current().await?;

        let context = self.build_context(&state, &roster)?;

        let candidate = context.email.formatted()?;
        if dedup::is_duplicate_message(&candidate, &context.previous_contents) {
            return Err(ClerkError::ThisEmailAlreadySent);
        }

        let sent_contents = self
            .mail
            .send(&context.email)
            .await
            .map_err(|_| ClerkError::CouldNotSendEmail {
                subject: context.email.subject.clone(),
                recipients: context.email.recipient_lines(),
            })?;
        tracing::info!(
            job = self.name(),
            on_notice = %context.on_notice.full_name(),
            "rotation email sent"
        );

        let success = context
            .success_template
            .replace("{{cleaner}}", &context.on_notice.full_name());
        let description = success.split('\n').next().unwrap_or(&success).to_string();

        let next = next_state(&state, &roster, &context.on_notice, sent_contents, now)?;
        self.state_store.store(&next, &description).await?;
        Ok(success)
    }

    fn build_context(&self, state: &RotationState, roster: &Roster) -> Outcome<SendContext> {
        let from = Address::new(&self.config.from_name, &self.config.from_address);
        let bcc = parse_address_list(&self.config.bcc_address)?;

        match state.status {
            RotationStatus::CleaningThisWeek => {
                // Invariant: a cleaning week always has a cleaner on record.
                let cleaner = state.cleaner.clone().ok_or(ClerkError::Unknown)?;
                Ok(SendContext {
                    email: OutgoingEmail {
                        from,
                        to: roster.addresses(),
                        bcc,
                        subject: self.config.subject_cleaning.clone(),
                        body: self.config.body_cleaning.clone(),
                    },
                    success_template: CLEANING_SUCCESS,
                    previous_contents: state.email_contents.clone(),
                    on_notice: cleaner,
                })
            }
            RotationStatus::NotCleaningThisWeek => Ok(SendContext {
                email: OutgoingEmail {
                    from,
                    to: vec![state.next_up.address()],
                    bcc,
                    subject: self.config.subject_reminder.clone(),
                    body: self.config.body_reminder.clone(),
                },
                success_template: REMINDER_SUCCESS,
                previous_contents: state.email_contents.clone(),
                on_notice: state.next_up.clone(),
            }),
        }
    }
}

/// The transition applied by a successful send: all five fields replaced
/// together, no intermediate state ever written.
fn next_state(
    state: &RotationState,
    roster: &Roster,
    on_notice: &Member,
    sent_contents: String,
    now: DateTime<Utc>,
) -> Outcome<RotationState> {
    let status = state.status.flip();
    let cleaner = match status {
        RotationStatus::CleaningThisWeek => Some(state.next_up.clone()),
        RotationStatus::NotCleaningThisWeek => None,
    };
    let next_up = roster
        .next_after(on_notice)
        .ok_or(ClerkError::Unknown)?
        .clone();
    Ok(RotationState {
        status,
        cleaner,
        next_up,
        last_ran_on: now.date_naive(),
        email_contents: sent_contents,
    })
}

#[async_trait]
impl Job for RotationJob {
    fn name(&self) -> &str {
        "rotation"
    }

    async fn run(&self, now: DateTime<Utc>) -> String {
        self.execute(now).await.unwrap_or_else(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn roster() -> Roster {
        Roster {
            members: vec![
                Member::new("Ann", Some("Archer"), "ann@example.com"),
                Member::new("Ben", None, "ben@example.com"),
                Member::new("Cat", Some("Cole"), "cat@example.com"),
            ],
        }
    }

    fn cleaning_state() -> RotationState {
        let r = roster();
        RotationState {
            status: RotationStatus::CleaningThisWeek,
            cleaner: Some(r.members[0].clone()),
            next_up: r.members[1].clone(),
            last_ran_on: NaiveDate::from_ymd_opt(2018, 5, 31).unwrap(),
            email_contents: "previous contents".to_string(),
        }
    }

    #[test]
    fn flip_is_an_involution() {
        for status in [
            RotationStatus::CleaningThisWeek,
            RotationStatus::NotCleaningThisWeek,
        ] {
            assert_eq!(status.flip().flip(), status);
        }
    }

    #[test]
    fn transition_flips_status_and_advances_the_cursor() {
        let now = Utc.with_ymd_and_hms(2018, 6, 7, 10, 0, 0).unwrap();
        let state = cleaning_state();
        let on_notice = state.cleaner.clone().unwrap();

        let next = next_state(&state, &roster(), &on_notice, "sent".into(), now).unwrap();
        assert_eq!(next.status, RotationStatus::NotCleaningThisWeek);
        assert_eq!(next.cleaner, None);
        assert_eq!(next.next_up.email, "ben@example.com");
        assert_eq!(next.last_ran_on, NaiveDate::from_ymd_opt(2018, 6, 7).unwrap());
        assert_eq!(next.email_contents, "sent");
    }

    #[test]
    fn reminder_transition_promotes_next_up_to_cleaner() {
        let now = Utc.with_ymd_and_hms(2018, 6, 14, 10, 0, 0).unwrap();
        let state = RotationState {
            status: RotationStatus::NotCleaningThisWeek,
            cleaner: None,
            ..cleaning_state()
        };
        // On notice in a reminder week is next_up.
        let on_notice = state.next_up.clone();

        let next = next_state(&state, &roster(), &on_notice, "sent".into(), now).unwrap();
        assert_eq!(next.status, RotationStatus::CleaningThisWeek);
        assert_eq!(next.cleaner.unwrap().email, "ben@example.com");
        assert_eq!(next.next_up.email, "cat@example.com");
    }

    #[test]
    fn two_transitions_with_a_constant_roster_restore_the_status() {
        let now = Utc.with_ymd_and_hms(2018, 6, 7, 10, 0, 0).unwrap();
        let r = roster();
        let state = cleaning_state();

        let once = next_state(&state, &r, &state.cleaner.clone().unwrap(), "a".into(), now).unwrap();
        let on_notice = once.next_up.clone();
        let twice = next_state(&once, &r, &on_notice, "b".into(), now).unwrap();
        assert_eq!(twice.status, state.status);
    }

    #[test]
    fn state_document_keeps_original_field_names() {
        let json = serde_json::to_string(&cleaning_state()).unwrap();
        assert!(json.contains("\"status\":\"CLEANING_THIS_WEEK\""));
        assert!(json.contains("\"nextUp\""));
        assert!(json.contains("\"lastRanOn\""));
        assert!(json.contains("\"emailContents\""));
    }

    #[test]
    fn state_document_parses_the_original_layout() {
        let json = r#"{
            "status": "NOT_CLEANING_THIS_WEEK",
            "cleaner": null,
            "nextUp": { "name": "Ben", "email": "ben@example.com" },
            "lastRanOn": "2018-06-07",
            "emailContents": "whatever was sent"
        }"#;
        let state: RotationState = serde_json::from_str(json).unwrap();
        assert_eq!(state.status, RotationStatus::NotCleaningThisWeek);
        assert_eq!(state.cleaner, None);
        assert_eq!(state.next_up.email, "ben@example.com");
    }
}
