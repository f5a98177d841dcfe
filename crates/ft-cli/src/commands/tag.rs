//! Tag commands for grouping applications in reports.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;
use ft_core::TagName;

use crate::Config;
use crate::commands::util::open_database;

#[derive(Debug, Args)]
pub struct TagArgs {
    /// Remove the tag from this application instead.
    #[arg(long, value_name = "APP", conflicts_with_all = ["tag", "app"])]
    pub clear: Option<String>,

    /// Tag to attach.
    #[arg(required_unless_present = "clear")]
    pub tag: Option<String>,

    /// Application to tag (exact name).
    #[arg(required_unless_present = "clear")]
    pub app: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, args: &TagArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;

    if let Some(app) = &args.clear {
        if !db.remove_tag(app)? {
            bail!("application not found: {app}");
        }
        writeln!(writer, "Cleared tag of {app}")?;
        return Ok(());
    }

    let (Some(tag), Some(app)) = (&args.tag, &args.app) else {
        bail!("both a tag and an application are required");
    };
    let tag = TagName::new(tag.trim())?;
    if !db.add_tag(&tag, app)? {
        bail!("application not found: {app}");
    }
    writeln!(writer, "Tagged {app} with {tag}")?;
    Ok(())
}

/// Lists every tag with its applications.
pub fn list<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let groups = db.tags()?;
    if groups.is_empty() {
        writeln!(writer, "No tags defined.")?;
        return Ok(());
    }
    for group in groups {
        writeln!(writer, "{}", group.tag_name)?;
        for app in group.app_names {
            writeln!(writer, "  - {app}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone, Utc};
    use ft_core::{Observation, Tracker};
    use ft_db::Database;
    use insta::assert_snapshot;

    fn config_with_apps(apps: &[&str]) -> (tempfile::TempDir, Config) {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("ft.db"),
            ..Config::default()
        };
        let mut db = Database::open(&config.database_path).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        for (offset, app) in (0..).zip(apps) {
            db.observe(
                &Tracker::default(),
                &Observation::focused(*app),
                start + Duration::seconds(offset),
            )
            .unwrap();
        }
        (temp, config)
    }

    fn tag_args(tag: &str, app: &str) -> TagArgs {
        TagArgs {
            clear: None,
            tag: Some(tag.to_string()),
            app: Some(app.to_string()),
        }
    }

    #[test]
    fn tag_then_list() {
        let (_temp, config) = config_with_apps(&["Terminal", "Editor", "Music"]);
        let mut output = Vec::new();

        run(&mut output, &tag_args("Developing", "Terminal"), &config).unwrap();
        run(&mut output, &tag_args("Developing", "Editor"), &config).unwrap();
        run(&mut output, &tag_args("Fun", "Music"), &config).unwrap();
        list(&mut output, &config).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Tagged Terminal with Developing
        Tagged Editor with Developing
        Tagged Music with Fun
        Developing
          - Editor
          - Terminal
        Fun
          - Music
        ");
    }

    #[test]
    fn clear_removes_tag() {
        let (_temp, config) = config_with_apps(&["Music"]);
        let mut output = Vec::new();
        run(&mut output, &tag_args("Fun", "Music"), &config).unwrap();

        let clear = TagArgs {
            clear: Some("Music".to_string()),
            tag: None,
            app: None,
        };
        run(&mut output, &clear, &config).unwrap();
        list(&mut output, &config).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Tagged Music with Fun
        Cleared tag of Music
        No tags defined.
        ");
    }

    #[test]
    fn tag_rejects_missing_app() {
        let (_temp, config) = config_with_apps(&["Music"]);
        let mut output = Vec::new();

        let err = run(&mut output, &tag_args("Fun", "Spotify"), &config).unwrap_err();

        assert!(err.to_string().contains("application not found: Spotify"));
    }

    #[test]
    fn tag_rejects_blank_tag() {
        let (_temp, config) = config_with_apps(&["Music"]);
        let mut output = Vec::new();

        let err = run(&mut output, &tag_args("   ", "Music"), &config).unwrap_err();

        assert!(err.to_string().contains("tag name cannot be empty"));
    }
}
