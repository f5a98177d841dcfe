//! Status command for showing what is being tracked right now.

use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;
use ft_core::Track;

use crate::Config;
use crate::commands::report::format_duration;
use crate::commands::util::open_database;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;

    writeln!(writer, "Focus tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    for track in Track::ALL {
        match db.current_session(track)? {
            Some(session) => {
                let subject = match (&session.title, &session.url) {
                    (Some(title), Some(url)) => format!("{} {title} <{url}>", session.app_name),
                    (None, Some(url)) => format!("{} <{url}>", session.app_name),
                    _ => session.app_name.clone(),
                };
                writeln!(
                    writer,
                    "{track}: {subject} since {} ({})",
                    session
                        .start_time
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                    format_duration(session.duration_secs)
                )?;
            }
            None => writeln!(writer, "{track}: idle")?,
        }
    }

    let blocked = db.blocked_names()?;
    writeln!(writer, "Blocked applications: {}", blocked.len())?;
    Ok(())
}
