use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WorkFormat {
    Remote,
    Hybrid,
    Office,
    Unknown,
}

impl WorkFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkFormat::Remote => "remote",
            WorkFormat::Hybrid => "hybrid",
            WorkFormat::Office => "office",
            WorkFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WorkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Schedule codes and text signals used to label a listing's arrangement.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatSignals {
    pub remote_schedules: Vec<String>,
    /// Leave empty to never derive `hybrid` from the schedule code alone.
    #[serde(default)]
    pub hybrid_schedules: Vec<String>,
    pub onsite_schedules: Vec<String>,
    pub remote_keywords: Vec<String>,
    #[serde(default)]
    pub hybrid_keywords: Vec<String>,
}

impl FormatSignals {
    /// First match wins: remote code, hybrid code, remote text, hybrid text,
    /// on-site code. Anything else is `Unknown`.
    pub fn resolve(&self, schedule: Option<&str>, text: &str) -> WorkFormat {
        let code_in = |codes: &[String]| schedule.is_some_and(|s| codes.iter().any(|c| c == s));
        let lowered = text.to_lowercase();
        let text_has = |words: &[String]| {
            words
                .iter()
                .any(|w| !w.is_empty() && lowered.contains(&w.to_lowercase()))
        };

        if code_in(&self.remote_schedules) {
            WorkFormat::Remote
        } else if code_in(&self.hybrid_schedules) {
            WorkFormat::Hybrid
        } else if text_has(&self.remote_keywords) {
            WorkFormat::Remote
        } else if text_has(&self.hybrid_keywords) {
            WorkFormat::Hybrid
        } else if code_in(&self.onsite_schedules) {
            WorkFormat::Office
        } else {
            WorkFormat::Unknown
        }
    }
}
