//! Turns one listing summary (plus an optional detail record) into a
//! [`ClassifiedListing`], or says why it was dropped.
//!
//! Everything here is synchronous and side-effect free apart from logging;
//! network and storage live in `collectors::runner` and `store`.

use chrono::{DateTime, Duration, Utc};

use crate::classify::{DEFAULT_CATEGORY, ScoreInput, WorkFormat, combined_text};
use crate::models::listing::{ListingDetail, ListingSummary};
use crate::models::vacancy::ClassifiedListing;
use crate::profile::{DetailPolicy, Profile, SearchPlan};
use crate::sanitize::{self, Sanitized};

/// Stored when the source gives no area name.
pub const UNKNOWN_CITY: &str = "Не указан";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Published before the scope's recency window, or with no usable date.
    Stale,
    /// Experience code missing or not in the allowed set.
    Experience,
    /// Title or fetched description hit an exclusion term.
    Excluded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(ClassifiedListing),
    RejectedByLocation { format: WorkFormat },
}

/// Recency, experience and title filters, applied before any detail fetch.
pub fn screen(
    summary: &ListingSummary,
    now: DateTime<Utc>,
    max_age_days: i64,
    plan: &SearchPlan,
) -> Result<(), SkipReason> {
    let Some(published) = summary.published() else {
        return Err(SkipReason::Stale);
    };
    if published < now - Duration::days(max_age_days) {
        return Err(SkipReason::Stale);
    }

    let allowed = summary
        .experience_code()
        .is_some_and(|code| plan.allowed_experience.iter().any(|a| a == code));
    if !allowed {
        return Err(SkipReason::Experience);
    }

    if let Some(term) = plan.exclusions.title_match(&summary.name) {
        tracing::debug!(hh_id = summary.id, term, "title excluded");
        return Err(SkipReason::Excluded);
    }
    Ok(())
}

/// Description exclusions, checked once a detail record is in hand.
pub fn screen_detail(plan: &SearchPlan, detail: &ListingDetail) -> Result<(), SkipReason> {
    let Some(description) = detail.description.as_deref() else {
        return Ok(());
    };
    let text = sanitize::strip_markup(description, usize::MAX).into_text();
    match plan.exclusions.description_match(&text) {
        Some(term) => {
            tracing::debug!(hh_id = detail.summary.id, term, "description excluded");
            Err(SkipReason::Excluded)
        }
        None => Ok(()),
    }
}

/// Whether the summary alone is too thin to classify.
pub fn needs_detail(profile: &Profile, summary: &ListingSummary) -> bool {
    match profile.search.detail_policy {
        DetailPolicy::Always => true,
        DetailPolicy::WhenNeeded => {
            let tags = summary.skill_tags();
            if tags.is_empty() {
                return true;
            }
            let text = combined_text(&summary.name, &summary.snippet_text(), &tags.join(", "));
            profile.categories.categorize(&text) == DEFAULT_CATEGORY
        }
    }
}

pub fn classify(
    profile: &Profile,
    summary: &ListingSummary,
    detail: Option<&ListingDetail>,
) -> Outcome {
    let raw_description = match detail.and_then(|d| d.description.as_deref()) {
        Some(description) => description.to_string(),
        None => summary.snippet_text(),
    };

    let format_text = format!("{} {}", summary.name, raw_description).to_lowercase();
    let format = profile
        .work_format
        .resolve(summary.schedule_code(), &format_text);
    if !profile
        .location
        .accepts(format, summary.city(), summary.area_id())
    {
        tracing::debug!(
            hh_id = summary.id,
            city = summary.city().unwrap_or(UNKNOWN_CITY),
            format = %format,
            "rejected by location policy"
        );
        return Outcome::RejectedByLocation { format };
    }

    let limits = &profile.limits;
    let columns = &limits.columns;
    let name = logged(summary.id, "name", sanitize::strip_markup(&summary.name, columns.name));
    let company = logged(
        summary.id,
        "company",
        sanitize::strip_markup(summary.employer_name(), columns.company),
    );
    let description = logged(
        summary.id,
        "description",
        sanitize::strip_markup(&raw_description, limits.description),
    );

    // The detail record carries the authoritative tag list.
    let tags = match detail {
        Some(d) if !d.summary.skill_tags().is_empty() => d.summary.skill_tags(),
        _ => summary.skill_tags(),
    };
    let skills = if tags.is_empty() {
        profile.skills.extract(&description)
    } else {
        tags.join(", ")
    };

    let text = combined_text(&name, &description, &skills);
    let category = profile.categories.categorize(&text).to_string();

    let (salary_from, salary_to) = profile.currency.normalize(summary.salary.as_ref());
    let relevance_score = profile.scoring.score(&ScoreInput {
        text: &text,
        format,
        salary_from,
        salary_to,
        experience: summary.experience_code(),
        category: &category,
    });

    Outcome::Accepted(ClassifiedListing {
        hh_id: summary.id,
        name,
        company,
        salary_from,
        salary_to,
        url: summary.url(),
        skills,
        description,
        work_format: format,
        city: summary.city().unwrap_or(UNKNOWN_CITY).to_string(),
        category,
        relevance_score,
    })
}

fn logged(hh_id: i64, field: &str, out: Sanitized) -> String {
    if out.is_lossy() {
        tracing::warn!(
            hh_id,
            field,
            kept_chars = out.text().chars().count(),
            "sanitizer dropped unstorable characters"
        );
    }
    out.into_text()
}
