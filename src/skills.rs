use serde::Deserialize;

/// Known technology keywords searched for when the source gives no
/// structured skill tags.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillCatalog {
    pub keywords: Vec<String>,
    /// Stored instead of an empty list.
    pub not_specified: String,
}

impl SkillCatalog {
    /// Comma-joined catalog entries found in `text`, in catalog order.
    pub fn extract(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let found: Vec<&str> = self
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|kw| !kw.is_empty() && lowered.contains(&kw.to_lowercase()))
            .collect();

        if found.is_empty() {
            self.not_specified.clone()
        } else {
            found.join(", ")
        }
    }
}
