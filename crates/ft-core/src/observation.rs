//! Point-in-time samples of what currently has user focus.

use serde::{Deserialize, Serialize};

/// One sample of "what is focused right now", produced once per tick.
///
/// Serialized with a `kind` tag so external probes can emit it as JSON:
///
/// ```json
/// {"kind": "focused_tab", "app_name": "Safari", "title": null, "url": "https://example.com/"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Nothing is focused, or the probe could not tell.
    #[default]
    #[serde(rename = "none")]
    Unfocused,
    /// A regular application has focus.
    Focused { app_name: String },
    /// A browser has focus; the tab may not be resolved yet.
    FocusedTab {
        app_name: String,
        /// Page title. Often missing while the page is still loading.
        #[serde(default)]
        title: Option<String>,
        /// Page URL. A tab without one is not actionable.
        #[serde(default)]
        url: Option<String>,
    },
}

impl Observation {
    pub fn focused(app_name: impl Into<String>) -> Self {
        Self::Focused {
            app_name: app_name.into(),
        }
    }

    pub fn tab(
        app_name: impl Into<String>,
        title: Option<&str>,
        url: Option<&str>,
    ) -> Self {
        Self::FocusedTab {
            app_name: app_name.into(),
            title: title.map(str::to_string),
            url: url.map(str::to_string),
        }
    }

    /// Name of the focused application, if any.
    pub fn app_name(&self) -> Option<&str> {
        match self {
            Self::Unfocused => None,
            Self::Focused { app_name } | Self::FocusedTab { app_name, .. } => Some(app_name),
        }
    }
}

/// Produces observations on demand.
///
/// Implementations wrap whatever platform mechanism detects focus. Probing
/// never fails from the tracker's point of view: a probe that cannot tell
/// returns [`Observation::Unfocused`].
pub trait ObservationSource {
    fn probe(&mut self) -> Observation;
}
