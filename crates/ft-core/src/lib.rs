//! Core domain logic for the focus tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Observations: point-in-time samples of what has user focus
//! - Tracking: turning observations into focus and web sessions
//! - Reports: row types, domain extraction, and caller-side folding

pub mod domain;
pub mod observation;
pub mod report;
pub mod track;
mod tracker;
pub mod types;

pub use domain::{domain_key, domain_of};
pub use observation::{Observation, ObservationSource};
pub use report::{DomainRow, GroupBy, TagGroup, UsageRow, fold_untagged, merge_by_key, top_n};
pub use track::Track;
pub use tracker::{
    DEFAULT_BROWSERS, OpenSession, Outcome, SessionStore, Tracker, TrackerConfig, duration_secs,
};
pub use types::{AppId, AppName, TagName, ValidationError};
