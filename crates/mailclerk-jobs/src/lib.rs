//! # Mailclerk Jobs
//!
//! The decision/state-transition pipelines. Each job is one linear chain
//! (gate, state fetch, context build, dedup, send, state update) where every
//! stage returns an [`mailclerk_core::Outcome`] and the first failure ends
//! the run with one human-readable message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod dedup;
pub mod forwarder;
pub mod gate;
pub mod roster;
pub mod rotation;

pub use forwarder::{ForwardState, ForwarderJob};
pub use gate::{ScheduleGate, Zone};
pub use roster::{Member, Roster};
pub use rotation::{RotationJob, RotationState, RotationStatus};

/// A single-shot scheduled job: the sole entry point external schedulers
/// invoke.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Run once against the given clock value. Always returns a
    /// human-readable outcome message; never propagates a failure.
    async fn run(&self, now: DateTime<Utc>) -> String;
}
