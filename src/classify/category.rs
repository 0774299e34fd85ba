use serde::Deserialize;

pub const DEFAULT_CATEGORY: &str = "other";

/// One row of the ordered category table. Lower `priority` wins.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    pub label: String,
    pub priority: u32,
    pub keywords: Vec<String>,
    /// A trigger match is void when any of these is also present.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keyword may appear anywhere, including inside a longer word.
    #[default]
    Substring,
    /// Keyword must start at a word boundary. Stems such as `автоматизац`
    /// still match longer words they begin.
    WordStart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTable {
    #[serde(default)]
    pub mode: MatchMode,
    pub rules: Vec<CategoryRule>,
}

/// Immutable, priority-sorted rule table.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "CategoryTable")]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
    mode: MatchMode,
}

impl From<CategoryTable> for Categorizer {
    fn from(table: CategoryTable) -> Self {
        Categorizer::new(table.rules, table.mode)
    }
}

impl Categorizer {
    /// Rules sharing a priority keep their declaration order.
    pub fn new(mut rules: Vec<CategoryRule>, mode: MatchMode) -> Self {
        for rule in &mut rules {
            lowercase_all(&mut rule.keywords);
            lowercase_all(&mut rule.exclude);
        }
        rules.sort_by_key(|r| r.priority);
        Self { rules, mode }
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Label of the first rule whose triggers match and whose exclusions
    /// don't, or [`DEFAULT_CATEGORY`].
    pub fn categorize(&self, text: &str) -> &str {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| self.rule_matches(rule, &text))
            .map_or(DEFAULT_CATEGORY, |rule| rule.label.as_str())
    }

    fn rule_matches(&self, rule: &CategoryRule, text: &str) -> bool {
        let hit = |words: &[String]| words.iter().any(|w| self.contains(text, w));
        hit(&rule.keywords[..]) && !hit(&rule.exclude[..])
    }

    fn contains(&self, text: &str, keyword: &str) -> bool {
        if keyword.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Substring => text.contains(keyword),
            MatchMode::WordStart => text.match_indices(keyword).any(|(idx, _)| {
                text[..idx]
                    .chars()
                    .next_back()
                    .is_none_or(|c| !c.is_alphanumeric())
            }),
        }
    }
}

fn lowercase_all(words: &mut [String]) {
    for w in words {
        *w = w.to_lowercase();
    }
}
