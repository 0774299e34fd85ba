//! Domain configuration: what to search for and how to classify it.
//!
//! A profile is read once at startup and handed by reference to every
//! component. The built-in one is compiled in from `profiles/default.json`.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::classify::{Categorizer, CurrencyRates, FormatSignals, LocationPolicy, Scoring};
use crate::error::AppError;
use crate::models::vacancy::ColumnLimits;
use crate::skills::SkillCatalog;

const BUILTIN_PROFILE: &str = include_str!("../profiles/default.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub search: SearchPlan,
    pub categories: Categorizer,
    pub work_format: FormatSignals,
    pub location: LocationPolicy,
    pub scoring: Scoring,
    pub skills: SkillCatalog,
    pub currency: CurrencyRates,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPlan {
    pub api_base: String,
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    pub keywords: Vec<String>,
    pub scopes: Vec<SearchScope>,
    /// Upper bound on pages fetched per keyword and scope.
    pub page_cap: u32,
    pub detail_delay_ms: u64,
    pub page_delay_ms: u64,
    pub allowed_experience: Vec<String>,
    #[serde(default)]
    pub detail_policy: DetailPolicy,
    #[serde(default)]
    pub exclusions: Exclusions,
}

/// One geographic pass over the keyword list.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchScope {
    pub label: String,
    /// Source area identifier.
    pub area: String,
    /// Listings older than this are dropped; also sent as the search period.
    pub max_age_days: i64,
    pub per_page: u32,
    /// Appended to every query of this scope, e.g. an exclusion operator.
    #[serde(default)]
    pub query_suffix: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailPolicy {
    Always,
    /// Only when the summary has no skill tags or its text alone falls
    /// through to the default category.
    #[default]
    WhenNeeded,
}

/// Terms that drop a listing outright: trades, sales and seniority levels
/// the search keywords cannot keep out on their own. All matching is
/// case-insensitive substring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub title_context: Vec<TitleContext>,
    /// Checked against the full description of fetched detail records.
    #[serde(default)]
    pub description: Vec<String>,
}

/// Extra title terms that only apply when the title contains `when`,
/// e.g. a sauna or car-wash "администратор".
#[derive(Debug, Clone, Deserialize)]
pub struct TitleContext {
    pub when: String,
    pub exclude: Vec<String>,
}

impl Exclusions {
    /// The term that rules out this title, if any.
    pub fn title_match(&self, title: &str) -> Option<&str> {
        let title = title.to_lowercase();
        if let Some(term) = first_hit(&self.title, &title) {
            return Some(term);
        }
        self.title_context
            .iter()
            .filter(|ctx| title.contains(&ctx.when.to_lowercase()))
            .find_map(|ctx| first_hit(&ctx.exclude, &title))
    }

    pub fn description_match(&self, description: &str) -> Option<&str> {
        first_hit(&self.description, &description.to_lowercase())
    }
}

fn first_hit<'a>(terms: &'a [String], lowered: &str) -> Option<&'a str> {
    terms
        .iter()
        .map(String::as_str)
        .find(|t| !t.is_empty() && lowered.contains(&t.to_lowercase()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Limits {
    /// Cap applied to the cleaned description during classification.
    pub description: usize,
    pub columns: ColumnLimits,
}

fn default_timeout() -> u64 {
    10
}

impl Profile {
    pub fn builtin() -> Result<Profile, AppError> {
        Self::from_json(BUILTIN_PROFILE)
    }

    pub fn load(path: &Path) -> Result<Profile, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Profile, AppError> {
        let profile: Profile = serde_json::from_str(raw)?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), AppError> {
        let rules = self.categories.rules();
        if rules.is_empty() {
            return Err(AppError::Config("no category rules".to_string()));
        }
        let mut labels = HashSet::new();
        for rule in rules {
            if !labels.insert(rule.label.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate category label '{}'",
                    rule.label
                )));
            }
        }
        if self.scoring.min > self.scoring.max {
            return Err(AppError::Config(format!(
                "score bounds inverted: {} > {}",
                self.scoring.min, self.scoring.max
            )));
        }
        if self.search.page_cap == 0 {
            return Err(AppError::Config("page_cap must be positive".to_string()));
        }
        if self.search.scopes.is_empty() {
            return Err(AppError::Config("no search scopes".to_string()));
        }
        Ok(())
    }
}
