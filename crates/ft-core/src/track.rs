//! The two parallel session lineages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A session track.
///
/// Focus on a regular application and focus on a browser tab are mutually
/// exclusive at any instant, but each track persists its own sessions and
/// has at most one current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Non-browser application focus.
    Focus,
    /// Browser tab focus, keyed by URL.
    Web,
}

impl Track {
    /// Both tracks, in display order.
    pub const ALL: [Self; 2] = [Self::Focus, Self::Web];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Track {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(Self::Focus),
            "web" => Ok(Self::Web),
            _ => Err(format!("invalid track: {s}")),
        }
    }
}
