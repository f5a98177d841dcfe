//! Drop command for wiping all tracking data.

use std::io::Write;

use anyhow::{Result, bail};

use crate::Config;
use crate::commands::track::acquire_writer_lock;
use crate::commands::util::open_database;

pub fn run<W: Write>(writer: &mut W, yes: bool, config: &Config) -> Result<()> {
    if !yes {
        bail!("refusing to delete all tracking data without --yes");
    }
    // A running tracker would keep writing sessions.
    let _lock = acquire_writer_lock(&config.database_path)?;
    let mut db = open_database(config)?;
    let sessions = db.drop_all()?;
    writeln!(writer, "Deleted {sessions} sessions.")?;
    Ok(())
}
