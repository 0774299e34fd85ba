use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// `{ "id": ..., "name": ... }` pairs the source uses for areas, schedules
/// and experience buckets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Salary {
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeySkill {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub requirement: Option<String>,
    #[serde(default)]
    pub responsibility: Option<String>,
}

/// One entry of a search results page.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingSummary {
    #[serde(deserialize_with = "listing_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub employer: Option<Reference>,
    #[serde(default)]
    pub area: Option<Reference>,
    #[serde(default)]
    pub schedule: Option<Reference>,
    #[serde(default)]
    pub experience: Option<Reference>,
    #[serde(default)]
    pub salary: Option<Salary>,
    #[serde(default)]
    pub key_skills: Vec<KeySkill>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub alternate_url: Option<String>,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

/// Full record from the per-id endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingDetail {
    #[serde(flatten)]
    pub summary: ListingSummary,
    #[serde(default)]
    pub description: Option<String>,
}

impl ListingSummary {
    pub fn employer_name(&self) -> &str {
        self.employer
            .as_ref()
            .and_then(|e| e.name.as_deref())
            .unwrap_or("")
    }

    pub fn city(&self) -> Option<&str> {
        self.area.as_ref().and_then(|a| a.name.as_deref())
    }

    pub fn area_id(&self) -> Option<&str> {
        self.area.as_ref().and_then(|a| a.id.as_deref())
    }

    pub fn schedule_code(&self) -> Option<&str> {
        self.schedule.as_ref().and_then(|s| s.id.as_deref())
    }

    pub fn experience_code(&self) -> Option<&str> {
        self.experience.as_ref().and_then(|e| e.id.as_deref())
    }

    pub fn skill_tags(&self) -> Vec<&str> {
        self.key_skills
            .iter()
            .map(|s| s.name.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Requirement and responsibility snippets joined; stands in for the
    /// description when no detail record was fetched.
    pub fn snippet_text(&self) -> String {
        let Some(snippet) = &self.snippet else {
            return String::new();
        };
        [&snippet.requirement, &snippet.responsibility]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn url(&self) -> String {
        self.alternate_url
            .clone()
            .unwrap_or_else(|| format!("https://hh.ru/vacancy/{}", self.id))
    }

    /// Publication time; the source writes offsets without a colon
    /// (`+0300`), which RFC 3339 parsing rejects.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        let raw = self.published_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(i64),
    Text(String),
}

fn listing_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(n) => Ok(n),
        IdRepr::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}
