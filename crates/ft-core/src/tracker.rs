//! Session tracking state machine.
//!
//! Converts a stream of [`Observation`]s into contiguous, non-overlapping
//! session records.
//!
//! # Algorithm Summary
//!
//! 1. Unfocused and blocked observations are ignored; they never close a session.
//! 2. An application observation closes the current web session, then either
//!    extends the current focus session (same app, gap within the continuity
//!    threshold) or closes it and opens a new one. A different app observed
//!    within the threshold first stretches the old session to the switch.
//! 3. A browser observation closes the current focus session. Without a URL
//!    nothing else happens. With a URL the current web session is extended if
//!    the URL matches. Otherwise it is stretched to the switch and closed
//!    before a new one is opened.
//!
//! All persistence goes through [`SessionStore`]; callers are expected to run
//! one [`Tracker::observe`] call per store transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::observation::Observation;
use crate::track::Track;
use crate::types::{AppId, AppName};

/// Browsers recognized when no configuration is given.
pub const DEFAULT_BROWSERS: &[&str] = &["Google Chrome", "Safari"];

/// Configuration for session tracking.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Largest gap between two observations of the same application that
    /// still extends the current focus session.
    /// Default: 1500ms.
    pub continuity_threshold: Duration,

    /// Application names whose observations belong to the web track.
    pub browsers: BTreeSet<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            continuity_threshold: Duration::milliseconds(1500),
            browsers: DEFAULT_BROWSERS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TrackerConfig {
    pub fn is_browser(&self, app_name: &str) -> bool {
        self.browsers.contains(app_name)
    }
}

/// The current session of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSession {
    pub id: i64,
    pub track: Track,
    pub app_id: AppId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Set for web sessions only.
    pub url: Option<String>,
}

/// Persistence operations the tracker needs.
///
/// Implementations must keep at most one current session per track. The
/// tracker always closes the current session before starting another one on
/// the same track.
pub trait SessionStore {
    type Error;

    /// Returns whether observations of this application are discarded.
    fn is_blocked(&self, app_name: &str) -> Result<bool, Self::Error>;

    /// Returns the application's ID, creating the application on first sight.
    fn resolve_app(&mut self, app_name: &AppName) -> Result<AppId, Self::Error>;

    /// Returns the current session of the track, if any.
    fn open_session(&self, track: Track) -> Result<Option<OpenSession>, Self::Error>;

    /// Marks the current session of the track as no longer current.
    ///
    /// Returns whether a session was closed.
    fn close_open(&mut self, track: Track) -> Result<bool, Self::Error>;

    /// Starts a zero-length current focus session at `now`.
    fn start_focus(&mut self, app: AppId, now: DateTime<Utc>) -> Result<(), Self::Error>;

    /// Starts a zero-length current web session at `now`.
    fn start_web(
        &mut self,
        app: AppId,
        url: &str,
        title: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), Self::Error>;

    /// Moves the session's end to `now` and recomputes its duration from its
    /// start. A `title` replaces the stored one; `None` leaves it unchanged.
    fn extend(
        &mut self,
        session: &OpenSession,
        now: DateTime<Utc>,
        title: Option<&str>,
    ) -> Result<(), Self::Error>;
}

/// What an observation did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing focused, blocked application, or blank name.
    Ignored,
    /// Browser observed before its tab had a URL.
    AwaitingUrl,
    /// A session was started on a track that had none.
    Opened(Track),
    /// The current session was closed and a new one started.
    Rotated(Track),
    /// The current session was extended to the observation time.
    Extended(Track),
}

/// Whole seconds between `start` and `end`, truncated toward zero.
pub fn duration_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    end.signed_duration_since(start).num_seconds()
}

/// Where an observation is routed.
enum Target<'a> {
    App,
    Tab {
        title: Option<&'a str>,
        url: Option<&'a str>,
    },
}

/// The session tracker.
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    config: TrackerConfig,
}

impl Tracker {
    pub const fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Applies one observation taken at `now`.
    ///
    /// On error the store may hold partial writes; the caller must roll its
    /// transaction back.
    pub fn observe<S>(
        &self,
        store: &mut S,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Result<Outcome, S::Error>
    where
        S: SessionStore + ?Sized,
    {
        let Some((app_name, target)) = self.route(observation) else {
            return Ok(Outcome::Ignored);
        };
        if store.is_blocked(app_name.as_str())? {
            tracing::debug!(app = %app_name, "ignoring blocked application");
            return Ok(Outcome::Ignored);
        }

        let app = store.resolve_app(&app_name)?;
        let outcome = match target {
            Target::App => self.observe_app(store, app, now)?,
            Target::Tab { title, url } => self.observe_tab(store, app, title, url, now)?,
        };
        tracing::debug!(app = %app_name, ?outcome, "observation applied");
        Ok(outcome)
    }

    fn route<'a>(&self, observation: &'a Observation) -> Option<(AppName, Target<'a>)> {
        let (app_name, target) = match observation {
            Observation::Unfocused => return None,
            Observation::Focused { app_name } if self.config.is_browser(app_name) => (
                app_name,
                Target::Tab {
                    title: None,
                    url: None,
                },
            ),
            Observation::Focused { app_name } => (app_name, Target::App),
            Observation::FocusedTab {
                app_name,
                title,
                url,
            } => (
                app_name,
                Target::Tab {
                    title: non_empty(title.as_deref()),
                    url: non_empty(url.as_deref()),
                },
            ),
        };
        AppName::new(app_name.as_str()).ok().map(|name| (name, target))
    }

    fn observe_app<S>(&self, store: &mut S, app: AppId, now: DateTime<Utc>) -> Result<Outcome, S::Error>
    where
        S: SessionStore + ?Sized,
    {
        store.close_open(Track::Web)?;

        match store.open_session(Track::Focus)? {
            None => {
                store.start_focus(app, now)?;
                Ok(Outcome::Opened(Track::Focus))
            }
            Some(open) if open.app_id == app && self.is_continuous(&open, now) => {
                store.extend(&open, now, None)?;
                Ok(Outcome::Extended(Track::Focus))
            }
            Some(open) => {
                if self.is_continuous(&open, now) {
                    store.extend(&open, now, None)?;
                }
                store.close_open(Track::Focus)?;
                store.start_focus(app, now)?;
                Ok(Outcome::Rotated(Track::Focus))
            }
        }
    }

    fn observe_tab<S>(
        &self,
        store: &mut S,
        app: AppId,
        title: Option<&str>,
        url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, S::Error>
    where
        S: SessionStore + ?Sized,
    {
        store.close_open(Track::Focus)?;

        let Some(url) = url else {
            return Ok(Outcome::AwaitingUrl);
        };

        match store.open_session(Track::Web)? {
            None => {
                store.start_web(app, url, title, now)?;
                Ok(Outcome::Opened(Track::Web))
            }
            Some(open) if open.url.as_deref() == Some(url) && now >= open.end_time => {
                store.extend(&open, now, title)?;
                Ok(Outcome::Extended(Track::Web))
            }
            Some(open) => {
                if now >= open.end_time {
                    store.extend(&open, now, None)?;
                }
                store.close_open(Track::Web)?;
                store.start_web(app, url, title, now)?;
                Ok(Outcome::Rotated(Track::Web))
            }
        }
    }

    /// A clock that moved backwards never continues a session.
    fn is_continuous(&self, open: &OpenSession, now: DateTime<Utc>) -> bool {
        let gap = now.signed_duration_since(open.end_time);
        gap >= Duration::zero() && gap <= self.config.continuity_threshold
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
