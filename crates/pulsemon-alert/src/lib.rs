//! Alert state machine for monitor results.
//!
//! Decisions are driven off the persisted counters
//! (`consecutive_failure_count`, `alerts_sent_for_failure`) rather than an
//! in-memory window, so the machine survives restarts. The engine decides
//! *that* and *what* to notify; delivery is the external collaborator's
//! concern and never happens here.

pub mod engine;


pub use engine::{failure_alert_due, AlertDecision, AlertEngine, MAX_ALERTS_PER_INCIDENT};
