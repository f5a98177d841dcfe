//! Report row types and the folding steps callers apply to them.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Application attribute that usage is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    AppName,
    TagName,
}

impl GroupBy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AppName => "app_name",
            Self::TagName => "tag_name",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app_name" => Ok(Self::AppName),
            "tag_name" => Ok(Self::TagName),
            _ => Err(format!("invalid group: {s}")),
        }
    }
}

/// Summed duration for one value of the grouping attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRow {
    /// `None` when the attribute is unset, e.g. an untagged application.
    pub key: Option<String>,
    pub duration_secs: i64,
}

impl UsageRow {
    pub fn new(key: Option<&str>, duration_secs: i64) -> Self {
        Self {
            key: key.map(str::to_string),
            duration_secs,
        }
    }
}

/// Summed browsing duration for one web domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRow {
    pub domain: String,
    pub duration_secs: i64,
}

impl From<DomainRow> for UsageRow {
    fn from(row: DomainRow) -> Self {
        Self {
            key: Some(row.domain),
            duration_secs: row.duration_secs,
        }
    }
}

/// A tag and the applications carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    pub tag_name: String,
    pub app_names: Vec<String>,
}

/// Merges every row without a key into a single row labelled `label`.
///
/// The merged row is appended last; nothing is appended if there were no
/// keyless rows or they summed to zero.
pub fn fold_untagged(rows: Vec<UsageRow>, label: &str) -> Vec<UsageRow> {
    let (keyed, keyless): (Vec<_>, Vec<_>) = rows.into_iter().partition(|r| r.key.is_some());
    let others: i64 = keyless.iter().map(|r| r.duration_secs).sum();
    let mut folded = keyed;
    if others > 0 {
        folded.push(UsageRow::new(Some(label), others));
    }
    folded
}

/// Sums rows sharing a key, keeping first-seen order.
pub fn merge_by_key(rows: Vec<UsageRow>) -> Vec<UsageRow> {
    let mut merged: Vec<UsageRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match merged.iter_mut().find(|m| m.key == row.key) {
            Some(existing) => existing.duration_secs += row.duration_secs,
            None => merged.push(row),
        }
    }
    merged
}

/// Sorts by duration descending (ties by key) and keeps the first `n` rows.
pub fn top_n(mut rows: Vec<UsageRow>, n: usize) -> Vec<UsageRow> {
    rows.sort_by(|a, b| {
        Reverse(a.duration_secs)
            .cmp(&Reverse(b.duration_secs))
            .then_with(|| a.key.cmp(&b.key))
    });
    rows.truncate(n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_untagged_sums_keyless_rows_into_label() {
        let rows = vec![
            UsageRow::new(None, 30),
            UsageRow::new(Some("Dev"), 100),
            UsageRow::new(None, 12),
        ];

        let folded = fold_untagged(rows, "Others");

        assert_eq!(
            folded,
            vec![UsageRow::new(Some("Dev"), 100), UsageRow::new(Some("Others"), 42)]
        );
    }

    #[test]
    fn fold_untagged_skips_empty_others() {
        let rows = vec![UsageRow::new(Some("Dev"), 5), UsageRow::new(None, 0)];
        assert_eq!(fold_untagged(rows, "Others"), vec![UsageRow::new(Some("Dev"), 5)]);
    }

    #[test]
    fn merge_by_key_combines_focus_and_web_rows() {
        let rows = vec![
            UsageRow::new(Some("Work"), 10),
            UsageRow::new(Some("Play"), 3),
            UsageRow::new(Some("Work"), 7),
        ];

        assert_eq!(
            merge_by_key(rows),
            vec![UsageRow::new(Some("Work"), 17), UsageRow::new(Some("Play"), 3)]
        );
    }

    #[test]
    fn top_n_orders_by_duration_then_key() {
        let rows = vec![
            UsageRow::new(Some("b"), 5),
            UsageRow::new(Some("c"), 9),
            UsageRow::new(Some("a"), 5),
            UsageRow::new(Some("d"), 1),
        ];

        let ranked = top_n(rows, 3);

        let keys: Vec<_> = ranked.iter().filter_map(|r| r.key.as_deref()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[test]
    fn group_by_roundtrip() {
        for group in [GroupBy::AppName, GroupBy::TagName] {
            assert_eq!(group.to_string().parse::<GroupBy>().unwrap(), group);
        }
        assert!("domain".parse::<GroupBy>().is_err());
    }
}
