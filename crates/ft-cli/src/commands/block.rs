//! Block list commands.

use std::io::Write;

use anyhow::{Result, bail};

use crate::Config;
use crate::commands::util::open_database;

/// Blocks an application and deletes its recorded sessions.
pub fn block<W: Write>(writer: &mut W, app: &str, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    if !db.block(app)? {
        bail!("application not found: {app}");
    }
    writeln!(writer, "Blocked {app}.")?;
    Ok(())
}

pub fn unblock<W: Write>(writer: &mut W, app: &str, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    if !db.unblock(app)? {
        bail!("application is not blocked: {app}");
    }
    writeln!(writer, "Unblocked {app}.")?;
    Ok(())
}

pub fn list<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let names = db.blocked_names()?;
    if names.is_empty() {
        writeln!(writer, "No blocked applications.")?;
        return Ok(());
    }
    writeln!(writer, "Blocked applications:")?;
    for name in names {
        writeln!(writer, "- {name}")?;
    }
    Ok(())
}
