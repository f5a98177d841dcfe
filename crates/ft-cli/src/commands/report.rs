//! Report command for showing where the time went.
//!
//! This module implements `ft report` over a range of local calendar days,
//! grouped by application, by tag (`--tags`) or by web domain (`ft report web`),
//! rendered as an aligned table or as JSON.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Args, ValueEnum};
use ft_core::{GroupBy, UsageRow, fold_untagged, merge_by_key, top_n};
use ft_db::Database;
use serde::Serialize;

use crate::Config;
use crate::commands::util::{open_database, parse_day};

/// Label for time spent in untagged applications.
pub const OTHERS: &str = "Others";

const BAR_WIDTH: usize = 10;

/// What a report is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    /// Applications (or tags with `--tags`).
    Apps,
    /// Web domains.
    Web,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Report on applications or web domains.
    #[arg(value_enum, default_value_t = ReportKind::Apps)]
    pub kind: ReportKind,

    /// First day to include (YYYY-MM-DD, 'yesterday', '3 days ago'). Defaults to today.
    #[arg(short, long)]
    pub from: Option<String>,

    /// Last day to include. Defaults to today.
    #[arg(short, long)]
    pub to: Option<String>,

    /// Start from today.
    #[arg(short, long, conflicts_with_all = ["from", "week", "month", "year"])]
    pub day: bool,

    /// Start from this week's Monday.
    #[arg(short, long, conflicts_with_all = ["from", "month", "year"])]
    pub week: bool,

    /// Start from the first of this month.
    #[arg(short, long, conflicts_with_all = ["from", "year"])]
    pub month: bool,

    /// Start from January 1st.
    #[arg(short, long, conflicts_with = "from")]
    pub year: bool,

    /// Show only the top N rows.
    #[arg(short = 'n', long = "num", default_value_t = 10)]
    pub number: usize,

    /// Group applications by tag, with untagged time under "Others".
    #[arg(short = 'T', long)]
    pub tags: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Write JSON to this file instead of printing.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ReportArgs {
    fn period(&self) -> Option<Period> {
        if self.day {
            Some(Period::Day)
        } else if self.week {
            Some(Period::Week)
        } else if self.month {
            Some(Period::Month)
        } else if self.year {
            Some(Period::Year)
        } else {
            None
        }
    }
}

/// Shortcut periods, each ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// First day of the period containing `today`. Weeks start on Monday.
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => today,
            Self::Week => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            Self::Month => today.with_day(1).unwrap_or(today),
            Self::Year => today.with_ordinal(1).unwrap_or(today),
        }
    }
}

/// An inclusive range of local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DayRange {
    /// Resolves `--from`, `--to` and the period shortcuts against `now`.
    pub fn resolve(args: &ReportArgs, now: DateTime<Utc>) -> Result<Self> {
        let today = now.with_timezone(&Local).date_naive();
        let to = match &args.to {
            Some(to) => parse_day(to, now)?,
            None => today,
        };
        let from = match (args.period(), &args.from) {
            (Some(period), _) => period.start(today),
            (None, Some(from)) => parse_day(from, now)?,
            (None, None) => today,
        };
        if from > to {
            bail!("'from' ({from}) must not be after 'to' ({to})");
        }
        Ok(Self { from, to })
    }

    /// Half-open UTC bounds: `from` at local midnight to the midnight after `to`.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            local_midnight_to_utc(self.from),
            local_midnight_to_utc(self.to + Duration::days(1)),
        )
    }
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // Midnight skipped by a DST jump; the day starts an hour later.
            let one_am = midnight + Duration::hours(1);
            Local.from_local_datetime(&one_am).earliest().map_or_else(
                || Utc.from_utc_datetime(&one_am),
                |dt| dt.with_timezone(&Utc),
            )
        }
    }
}

/// What each report row names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    App,
    Tag,
    Domain,
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub timezone: String,
    pub range: DayRange,
    pub grouping: Grouping,
    /// Longest first, already cut to the requested size.
    pub rows: Vec<UsageRow>,
}

impl ReportData {
    pub fn total_secs(&self) -> i64 {
        self.rows.iter().map(|r| r.duration_secs).sum()
    }
}

/// Queries and folds the rows for a report.
///
/// Focus and web rows for the same key are summed, untagged time is folded
/// into [`OTHERS`], and only the `number` longest rows are kept.
pub fn generate_report_data(
    db: &Database,
    args: &ReportArgs,
    range: DayRange,
    generated_at: DateTime<Utc>,
) -> Result<ReportData> {
    let (start, end) = range.bounds();
    let (grouping, rows) = match (args.kind, args.tags) {
        (ReportKind::Web, true) => bail!("--tags cannot be combined with the web report"),
        (ReportKind::Web, false) => (
            Grouping::Domain,
            db.web_report(start, end)?
                .into_iter()
                .map(UsageRow::from)
                .collect(),
        ),
        (ReportKind::Apps, true) => (
            Grouping::Tag,
            fold_untagged(db.report(start, end, GroupBy::TagName)?, OTHERS),
        ),
        (ReportKind::Apps, false) => (Grouping::App, db.report(start, end, GroupBy::AppName)?),
    };

    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    Ok(ReportData {
        generated_at,
        timezone,
        range,
        grouping,
        rows: top_n(merge_by_key(rows), args.number),
    })
}

// ========== Formatting ==========

/// Formats seconds like `1h 02m 03s`, `05m 00s` or `09s`.
/// Negative durations are treated as zero.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let minutes = secs % 3600 / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes:02}m {seconds:02}s")
    } else {
        format!("{seconds:02}s")
    }
}

/// Generates a 10-character progress bar.
/// Values <5% of the total get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, total: i64) -> String {
    if total <= 0 {
        return "░".repeat(BAR_WIDTH);
    }

    let ratio = value as f64 / total as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize
    };

    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Share of `total`, in percent, rounded to one decimal.
#[allow(clippy::cast_precision_loss)]
fn percent(value: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (value as f64 / total as f64 * 1000.0).round() / 10.0
}

fn row_name(row: &UsageRow) -> &str {
    row.key.as_deref().unwrap_or(OTHERS)
}

/// Writes the human-readable report.
pub fn write_report<W: Write>(writer: &mut W, data: &ReportData) -> std::io::Result<()> {
    let header = format!(
        "{} - {}",
        data.range.from.format("%Y %b %d"),
        data.range.to.format("%Y %b %d")
    );
    let rule = "─".repeat(header.chars().count());
    writeln!(writer, "{header}")?;
    writeln!(writer, "{rule}")?;

    if data.rows.is_empty() {
        writeln!(writer, "No data collected in this period.")?;
        writeln!(writer)?;
        writeln!(writer, "Hint: Run 'ft status' to check tracking.")?;
        return Ok(());
    }

    let total = data.total_secs();
    let width = data
        .rows
        .iter()
        .map(|r| row_name(r).chars().count())
        .max()
        .unwrap_or(0)
        .max("Total".len());

    for row in &data.rows {
        writeln!(
            writer,
            "{name:<width$}  {duration:>11}  {bar}  {pct:>5.1}%",
            name = row_name(row),
            duration = format_duration(row.duration_secs),
            bar = progress_bar(row.duration_secs, total),
            pct = percent(row.duration_secs, total),
        )?;
    }
    writeln!(writer, "{rule}")?;
    writeln!(writer, "{:<width$}  {:>11}", "Total", format_duration(total))?;
    Ok(())
}

// ========== JSON Output ==========

#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: String,
    pub timezone: String,
    pub from: String,
    pub to: String,
    pub group: Grouping,
    pub total_secs: i64,
    pub rows: Vec<JsonRow>,
}

#[derive(Debug, Serialize)]
pub struct JsonRow {
    pub name: String,
    pub duration_secs: i64,
    pub percent: f64,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let total = data.total_secs();
    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: data.timezone.clone(),
        from: data.range.from.format("%Y-%m-%d").to_string(),
        to: data.range.to.format("%Y-%m-%d").to_string(),
        group: data.grouping,
        total_secs: total,
        rows: data
            .rows
            .iter()
            .map(|row| JsonRow {
                name: row_name(row).to_string(),
                duration_secs: row.duration_secs,
                percent: percent(row.duration_secs, total),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

pub fn run<W: Write>(writer: &mut W, args: &ReportArgs, config: &Config) -> Result<()> {
    let now = Utc::now();
    let range = DayRange::resolve(args, now)?;
    let db = open_database(config)?;
    let data = generate_report_data(&db, args, range, now)?;

    if let Some(path) = &args.output {
        std::fs::write(path, format_report_json(&data)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writeln!(writer, "Successfully written to {}", path.display())?;
    } else if args.json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        write_report(writer, &data)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ft_core::{Observation, TagName, Tracker};
    use insta::assert_snapshot;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn args() -> ReportArgs {
        ReportArgs {
            kind: ReportKind::Apps,
            from: None,
            to: None,
            day: false,
            week: false,
            month: false,
            year: false,
            number: 10,
            tags: false,
            json: false,
            output: None,
        }
    }

    // ========== Period Tests ==========

    #[test]
    fn test_period_starts_for_known_date() {
        // Jan 29, 2025 is a Wednesday
        let wednesday = date(2025, 1, 29);
        assert_eq!(Period::Day.start(wednesday), wednesday);
        assert_eq!(Period::Week.start(wednesday), date(2025, 1, 27));
        assert_eq!(Period::Month.start(wednesday), date(2025, 1, 1));
        assert_eq!(Period::Year.start(wednesday), date(2025, 1, 1));
    }

    #[test]
    fn test_week_starts_on_monday() {
        assert_eq!(Period::Week.start(date(2025, 1, 27)), date(2025, 1, 27));
        // Sunday belongs to the week that started six days earlier
        assert_eq!(Period::Week.start(date(2025, 2, 2)), date(2025, 1, 27));
    }

    #[test]
    fn test_range_defaults_to_today() {
        let now = Utc::now();
        let today = now.with_timezone(&Local).date_naive();
        let range = DayRange::resolve(&args(), now).unwrap();
        assert_eq!(range, DayRange { from: today, to: today });
    }

    #[test]
    fn test_range_from_explicit_dates() {
        let args = ReportArgs {
            from: Some("2025-01-01".to_string()),
            to: Some("2025-01-31".to_string()),
            ..args()
        };
        let range = DayRange::resolve(&args, Utc::now()).unwrap();
        assert_eq!(
            range,
            DayRange {
                from: date(2025, 1, 1),
                to: date(2025, 1, 31)
            }
        );
    }

    #[test]
    fn test_range_rejects_from_after_to() {
        let args = ReportArgs {
            from: Some("2025-02-01".to_string()),
            to: Some("2025-01-31".to_string()),
            ..args()
        };
        let err = DayRange::resolve(&args, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("must not be after"));
    }

    #[test]
    fn test_range_bounds_cover_whole_days() {
        let range = DayRange {
            from: date(2025, 1, 27),
            to: date(2025, 1, 29),
        };
        let (start, end) = range.bounds();

        assert_eq!(start.with_timezone(&Local).date_naive(), date(2025, 1, 27));
        assert_eq!(end.with_timezone(&Local).date_naive(), date(2025, 1, 30));
        assert!(end - start >= Duration::hours(71));
    }

    // ========== Formatting Tests ==========

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00s");
        assert_eq!(format_duration(9), "09s");
        assert_eq!(format_duration(69), "01m 09s");
        assert_eq!(format_duration(1929), "32m 09s");
        assert_eq!(format_duration(3600), "1h 00m 00s");
        assert_eq!(format_duration(3723), "1h 02m 03s");
        assert_eq!(format_duration(-5), "00s");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(100, 100), "██████████");
        assert_eq!(progress_bar(50, 100), "█████░░░░░");
        assert_eq!(progress_bar(1, 100), "█░░░░░░░░░");
        assert_eq!(progress_bar(0, 100), "░░░░░░░░░░");
        assert_eq!(progress_bar(0, 0), "░░░░░░░░░░");
    }

    #[test]
    fn test_percent_rounds_to_one_decimal() {
        assert!((percent(1, 3) - 33.3).abs() < f64::EPSILON);
        assert!(percent(0, 0).abs() < f64::EPSILON);
    }

    fn sample_data(rows: Vec<UsageRow>) -> ReportData {
        ReportData {
            generated_at: Utc.with_ymd_and_hms(2025, 1, 29, 16, 0, 0).unwrap(),
            timezone: "America/Los_Angeles".to_string(),
            range: DayRange {
                from: date(2025, 1, 27),
                to: date(2025, 1, 29),
            },
            grouping: Grouping::App,
            rows,
        }
    }

    fn render(data: &ReportData) -> String {
        let mut output = Vec::new();
        write_report(&mut output, data).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_report_table() {
        let data = sample_data(vec![
            UsageRow::new(Some("Terminal"), 3723),
            UsageRow::new(Some("Safari"), 1800),
            UsageRow::new(Some("Editor"), 60),
        ]);

        assert_snapshot!(render(&data), @r"
        2025 Jan 27 - 2025 Jan 29
        ─────────────────────────
        Terminal   1h 02m 03s  ███████░░░   66.7%
        Safari        30m 00s  ███░░░░░░░   32.2%
        Editor        01m 00s  █░░░░░░░░░    1.1%
        ─────────────────────────
        Total      1h 33m 03s
        ");
    }

    #[test]
    fn test_report_empty_period() {
        let data = sample_data(vec![]);

        assert_snapshot!(render(&data), @r"
        2025 Jan 27 - 2025 Jan 29
        ─────────────────────────
        No data collected in this period.

        Hint: Run 'ft status' to check tracking.
        ");
    }

    #[test]
    fn test_report_json_output() {
        let data = sample_data(vec![
            UsageRow::new(Some("Terminal"), 3723),
            UsageRow::new(Some("Safari"), 1800),
            UsageRow::new(Some("Editor"), 60),
        ]);

        let json: serde_json::Value =
            serde_json::from_str(&format_report_json(&data).unwrap()).unwrap();

        assert_eq!(json["from"], "2025-01-27");
        assert_eq!(json["to"], "2025-01-29");
        assert_eq!(json["group"], "app");
        assert_eq!(json["total_secs"], 5583);
        assert_eq!(json["rows"][0]["name"], "Terminal");
        assert_eq!(json["rows"][0]["duration_secs"], 3723);
        assert_eq!(json["rows"][0]["percent"], 66.7);
        assert_eq!(json["rows"].as_array().unwrap().len(), 3);
    }

    // ========== Integration Tests ==========

    fn seeded_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let tracker = Tracker::default();
        let base = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let script = [
            (0, Observation::focused("Terminal")),
            (1, Observation::focused("Terminal")),
            (2, Observation::focused("Terminal")),
            (3, Observation::focused("Music")),
            (4, Observation::focused("Music")),
            (5, Observation::tab("Safari", None, Some("https://docs.rs/a"))),
            (9, Observation::tab("Safari", None, Some("https://docs.rs/b"))),
            (12, Observation::tab("Safari", None, Some("https://docs.rs/b"))),
            (13, Observation::focused("Terminal")),
            (14, Observation::focused("Terminal")),
        ];
        for (secs, observation) in script {
            db.observe(&tracker, &observation, base + Duration::seconds(secs))
                .unwrap();
        }
        db
    }

    fn around_seed() -> DayRange {
        DayRange {
            from: date(2025, 1, 14),
            to: date(2025, 1, 16),
        }
    }

    #[test]
    fn test_app_report_merges_and_ranks() {
        let db = seeded_db();

        let data = generate_report_data(&db, &args(), around_seed(), Utc::now()).unwrap();

        assert_eq!(data.grouping, Grouping::App);
        assert_eq!(
            data.rows,
            vec![
                UsageRow::new(Some("Safari"), 7),
                UsageRow::new(Some("Terminal"), 4),
                UsageRow::new(Some("Music"), 1),
            ]
        );
    }

    #[test]
    fn test_tag_report_folds_untagged_into_others() {
        let mut db = seeded_db();
        let work = TagName::new("Work").unwrap();
        db.add_tag(&work, "Terminal").unwrap();
        db.add_tag(&work, "Safari").unwrap();

        let args = ReportArgs {
            tags: true,
            ..args()
        };
        let data = generate_report_data(&db, &args, around_seed(), Utc::now()).unwrap();

        assert_eq!(data.grouping, Grouping::Tag);
        assert_eq!(
            data.rows,
            vec![
                UsageRow::new(Some("Work"), 11),
                UsageRow::new(Some(OTHERS), 1),
            ]
        );
    }

    #[test]
    fn test_web_report_uses_domains() {
        let db = seeded_db();
        let args = ReportArgs {
            kind: ReportKind::Web,
            ..args()
        };

        let data = generate_report_data(&db, &args, around_seed(), Utc::now()).unwrap();

        assert_eq!(data.grouping, Grouping::Domain);
        assert_eq!(data.rows, vec![UsageRow::new(Some("https://docs.rs/"), 7)]);
    }

    #[test]
    fn test_top_n_limits_rows() {
        let db = seeded_db();
        let args = ReportArgs {
            number: 1,
            ..args()
        };

        let data = generate_report_data(&db, &args, around_seed(), Utc::now()).unwrap();

        assert_eq!(data.rows, vec![UsageRow::new(Some("Safari"), 7)]);
    }

    #[test]
    fn test_web_report_rejects_tags() {
        let db = seeded_db();
        let args = ReportArgs {
            kind: ReportKind::Web,
            tags: true,
            ..args()
        };

        assert!(generate_report_data(&db, &args, around_seed(), Utc::now()).is_err());
    }

    #[test]
    fn test_range_outside_data_is_empty() {
        let db = seeded_db();
        let range = DayRange {
            from: date(2025, 2, 1),
            to: date(2025, 2, 2),
        };

        let data = generate_report_data(&db, &args(), range, Utc::now()).unwrap();

        assert!(data.rows.is_empty());
    }

    #[test]
    fn test_output_file_receives_json() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("ft.db"),
            ..Config::default()
        };
        let out_path = temp.path().join("report.json");
        let args = ReportArgs {
            output: Some(out_path.clone()),
            ..args()
        };
        let mut output = Vec::new();

        run(&mut output, &args, &config).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(written["rows"].as_array().unwrap().len(), 0);
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Successfully written to"));
    }
}
