//! Observe command for feeding a single observation from an external hook.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use ft_core::{Observation, Tracker};

use crate::Config;
use crate::commands::util::{open_database, parse_datetime};

#[derive(Debug, Args)]
pub struct ObserveArgs {
    /// Name of the focused application.
    #[arg(long)]
    pub app: String,

    /// URL of the focused browser tab.
    #[arg(long)]
    pub url: Option<String>,

    /// Title of the focused browser tab.
    #[arg(long)]
    pub title: Option<String>,

    /// Observation time (RFC 3339 or e.g. '5 minutes ago'). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,
}

impl ObserveArgs {
    /// A tab observation if any tab detail was given, otherwise a plain focus.
    pub fn observation(&self) -> Observation {
        if self.url.is_none() && self.title.is_none() {
            Observation::focused(self.app.clone())
        } else {
            Observation::tab(self.app.clone(), self.title.as_deref(), self.url.as_deref())
        }
    }
}

pub fn run(args: &ObserveArgs, config: &Config) -> Result<()> {
    let now = Utc::now();
    let at = match &args.at {
        Some(at) => parse_datetime(at, now)?,
        None => now,
    };

    let mut db = open_database(config)?;
    let outcome = db
        .observe(&Tracker::new(config.tracker_config()), &args.observation(), at)
        .context("failed to record observation")?;
    tracing::debug!(?outcome, %at, "observation recorded");
    Ok(())
}
