//! The sampling loop behind `ft track`.
//!
//! Each tick probes the observation source once and applies the result in
//! its own transaction. Transient store failures drop that observation and
//! the loop carries on; anything else stops the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ft_core::{ObservationSource, Outcome, Tracker};
use ft_db::{Database, DbError};

/// Sleep granularity while waiting for the next sample.
const STOP_POLL: Duration = Duration::from_millis(50);

pub struct Sampler<S> {
    db: Database,
    tracker: Tracker,
    source: S,
    interval: Duration,
}

impl<S: ObservationSource> Sampler<S> {
    pub const fn new(db: Database, tracker: Tracker, source: S, interval: Duration) -> Self {
        Self {
            db,
            tracker,
            source,
            interval,
        }
    }

    /// Probes once and applies the observation at `now`.
    ///
    /// Returns `Ok(None)` when a transient failure dropped the observation.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<Outcome>, DbError> {
        let observation = self.source.probe();
        match self.db.observe(&self.tracker, &observation, now) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "dropping observation after transient failure");
                Ok(None)
            }
            Err(err) => {
                tracing::error!(error = %err, "tracking failed");
                Err(err)
            }
        }
    }

    /// Samples until `stop` is set, returning the number of ticks taken.
    ///
    /// `stop` is checked between ticks and while sleeping, so shutdown waits
    /// for at most one tick plus [`STOP_POLL`].
    pub fn run(&mut self, stop: &AtomicBool) -> Result<u64, DbError> {
        let mut ticks = 0;
        while !stop.load(Ordering::SeqCst) {
            self.tick(Utc::now())?;
            ticks += 1;
            sleep_unless_stopped(self.interval, stop);
        }
        Ok(ticks)
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::SeqCst) {
        let slice = remaining.min(STOP_POLL);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
