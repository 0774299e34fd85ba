//! Classification of a single listing: work format, location acceptance,
//! category, relevance score and salary normalisation.

pub mod category;
pub mod location;
pub mod relevance;
pub mod salary;
pub mod work_format;

pub use category::{Categorizer, DEFAULT_CATEGORY};
pub use location::LocationPolicy;
pub use relevance::{ScoreInput, Scoring};
pub use salary::CurrencyRates;
pub use work_format::{FormatSignals, WorkFormat};

/// Title, description and skills joined and lower-cased; the text every
/// category rule and scoring tier is matched against.
pub fn combined_text(title: &str, description: &str, skills: &str) -> String {
    format!("{title} {description} {skills}").to_lowercase()
}
