use std::collections::HashMap;

use serde::Deserialize;

use super::work_format::WorkFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordTier {
    pub weight: i32,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatBonus {
    pub remote: i32,
    pub hybrid: i32,
    pub office: i32,
    #[serde(default)]
    pub unknown: i32,
}

impl FormatBonus {
    fn for_format(&self, format: WorkFormat) -> i32 {
        match format {
            WorkFormat::Remote => self.remote,
            WorkFormat::Hybrid => self.hybrid,
            WorkFormat::Office => self.office,
            WorkFormat::Unknown => self.unknown,
        }
    }
}

/// Adjustment for the lower salary bound: `inside` when it falls within
/// `[min, max]`, `above` when it exceeds `max`.
#[derive(Debug, Clone, Deserialize)]
pub struct SalaryBand {
    pub min: i64,
    pub max: i64,
    pub inside: i32,
    pub above: i32,
}

/// Flat bonus granted once when any of the phrases is present.
#[derive(Debug, Clone, Deserialize)]
pub struct PhraseBonus {
    pub weight: i32,
    pub phrases: Vec<String>,
}

/// Flat bonus granted once when the listing landed in one of `categories`
/// and mentions any of `keywords`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryBonus {
    pub weight: i32,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scoring {
    pub base: i32,
    pub high: KeywordTier,
    pub medium: KeywordTier,
    pub low: KeywordTier,
    pub salary_bonus: i32,
    pub format_bonus: FormatBonus,
    /// Keyed by the source's experience code.
    #[serde(default)]
    pub experience_bonus: HashMap<String, i32>,
    #[serde(default)]
    pub salary_band: Option<SalaryBand>,
    #[serde(default)]
    pub phrase_bonus: Option<PhraseBonus>,
    #[serde(default)]
    pub category_bonus: Option<CategoryBonus>,
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub text: &'a str,
    pub format: WorkFormat,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub experience: Option<&'a str>,
    pub category: &'a str,
}

impl Scoring {
    pub fn score(&self, input: &ScoreInput<'_>) -> i32 {
        let text = input.text.to_lowercase();
        let has = |word: &String| !word.is_empty() && text.contains(&word.to_lowercase());

        let mut score = i64::from(self.base);
        for tier in [&self.high, &self.medium, &self.low] {
            let hits = tier.keywords.iter().filter(|kw| has(kw)).count() as i64;
            score += hits * i64::from(tier.weight);
        }

        let positive = |v: Option<i64>| v.is_some_and(|v| v > 0);
        if positive(input.salary_from) || positive(input.salary_to) {
            score += i64::from(self.salary_bonus);
        }

        score += i64::from(self.format_bonus.for_format(input.format));

        if let Some(bonus) = input.experience.and_then(|e| self.experience_bonus.get(e)) {
            score += i64::from(*bonus);
        }

        if let (Some(band), Some(from)) = (&self.salary_band, input.salary_from) {
            if (band.min..=band.max).contains(&from) {
                score += i64::from(band.inside);
            } else if from > band.max {
                score += i64::from(band.above);
            }
        }

        if let Some(bonus) = &self.phrase_bonus
            && bonus.phrases.iter().any(has)
        {
            score += i64::from(bonus.weight);
        }

        if let Some(bonus) = &self.category_bonus
            && bonus.categories.iter().any(|c| c == input.category)
            && bonus.keywords.iter().any(has)
        {
            score += i64::from(bonus.weight);
        }

        score.max(i64::from(self.min)).min(i64::from(self.max)) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(weight: i32, keywords: &[&str]) -> KeywordTier {
        KeywordTier {
            weight,
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn scoring() -> Scoring {
        Scoring {
            base: 0,
            high: tier(3, &["n8n", "airflow", "etl", "power bi"]),
            medium: tier(2, &["python", "sql", "excel"]),
            low: tier(1, &["data", "анализ"]),
            salary_bonus: 2,
            format_bonus: FormatBonus {
                remote: 3,
                hybrid: 2,
                office: 1,
                unknown: 0,
            },
            experience_bonus: HashMap::new(),
            salary_band: None,
            phrase_bonus: None,
            category_bonus: None,
            min: 0,
            max: 10,
        }
    }

    fn input(text: &str, format: WorkFormat) -> ScoreInput<'_> {
        ScoreInput {
            text,
            format,
            salary_from: None,
            salary_to: None,
            experience: None,
            category: "other",
        }
    }

    #[test]
    fn each_keyword_counts_once() {
        let s = scoring();
        assert_eq!(s.score(&input("python python python", WorkFormat::Unknown)), 2);
        assert_eq!(s.score(&input("Python и SQL", WorkFormat::Unknown)), 4);
    }

    #[test]
    fn format_bonus_is_strictly_decreasing() {
        let s = scoring();
        let scores: Vec<i32> = [
            WorkFormat::Remote,
            WorkFormat::Hybrid,
            WorkFormat::Office,
            WorkFormat::Unknown,
        ]
        .into_iter()
        .map(|f| s.score(&input("", f)))
        .collect();
        assert_eq!(scores, [3, 2, 1, 0]);
    }

    #[test]
    fn everything_matching_clamps_to_max() {
        let s = scoring();
        let text = "n8n airflow etl power bi python sql excel data анализ";
        let mut i = input(text, WorkFormat::Remote);
        i.salary_from = Some(100_000);
        i.salary_to = Some(200_000);
        assert_eq!(s.score(&i), 10);
    }

    #[test]
    fn huge_weights_do_not_overflow() {
        let mut s = scoring();
        s.high.weight = i32::MAX;
        s.format_bonus.remote = i32::MAX;
        assert_eq!(s.score(&input("n8n airflow etl", WorkFormat::Remote)), 10);
    }

    #[test]
    fn salary_presence_adds_bonus() {
        let s = scoring();
        let mut i = input("", WorkFormat::Unknown);
        i.salary_to = Some(50_000);
        assert_eq!(s.score(&i), 2);
    }

    #[test]
    fn experience_and_band_variant() {
        let mut s = scoring();
        s.base = 5;
        s.min = 1;
        s.high = tier(3, &[]);
        s.medium = tier(2, &[]);
        s.low = tier(1, &[]);
        s.salary_bonus = 0;
        s.format_bonus = FormatBonus {
            remote: 2,
            hybrid: 1,
            office: 0,
            unknown: 0,
        };
        s.experience_bonus = HashMap::from([
            ("noExperience".to_string(), 3),
            ("between1And3".to_string(), 2),
        ]);
        s.salary_band = Some(SalaryBand {
            min: 30_000,
            max: 60_000,
            inside: 2,
            above: -1,
        });
        s.phrase_bonus = Some(PhraseBonus {
            weight: 2,
            phrases: vec!["без опыта".to_string(), "стажер".to_string()],
        });

        let mut i = input("Стажер, можно без опыта", WorkFormat::Office);
        i.experience = Some("noExperience");
        i.salary_from = Some(40_000);
        // 5 + 3 + 2 + 2 = 12, clamped.
        assert_eq!(s.score(&i), 10);

        let mut i = input("", WorkFormat::Office);
        i.experience = Some("between3And6");
        i.salary_from = Some(150_000);
        assert_eq!(s.score(&i), 4);

        s.base = -20;
        assert_eq!(s.score(&input("", WorkFormat::Office)), 1);
    }

    #[test]
    fn category_bonus_needs_category_and_keyword() {
        let mut s = scoring();
        s.high = tier(3, &[]);
        s.medium = tier(2, &[]);
        s.low = tier(1, &[]);
        s.category_bonus = Some(CategoryBonus {
            weight: 1,
            categories: vec!["it_analyst".to_string(), "it_developer".to_string()],
            keywords: vec!["python".to_string(), "1с".to_string()],
        });

        let mut i = input("Разработчик Python", WorkFormat::Unknown);
        assert_eq!(s.score(&i), 0);

        i.category = "it_developer";
        assert_eq!(s.score(&i), 1);

        let mut other = input("Разработчик Go", WorkFormat::Unknown);
        other.category = "it_developer";
        assert_eq!(s.score(&other), 0);
    }
}
