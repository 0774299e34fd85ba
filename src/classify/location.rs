use serde::Deserialize;

use super::work_format::WorkFormat;

/// The operator commutes only within one city and takes remote work anywhere.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationPolicy {
    pub preferred_city: String,
    #[serde(default)]
    pub preferred_area_id: Option<String>,
    /// Also accept `hybrid` outside the preferred city.
    #[serde(default)]
    pub accept_hybrid_elsewhere: bool,
}

impl LocationPolicy {
    pub fn is_preferred(&self, city: Option<&str>, area_id: Option<&str>) -> bool {
        let id_match = matches!(
            (self.preferred_area_id.as_deref(), area_id),
            (Some(want), Some(got)) if want == got
        );
        let name_match = city.is_some_and(|c| {
            c.trim().to_lowercase() == self.preferred_city.trim().to_lowercase()
        });
        id_match || name_match
    }

    pub fn accepts(&self, format: WorkFormat, city: Option<&str>, area_id: Option<&str>) -> bool {
        if self.is_preferred(city, area_id) {
            return true;
        }
        match format {
            WorkFormat::Remote => true,
            WorkFormat::Hybrid => self.accept_hybrid_elsewhere,
            WorkFormat::Office | WorkFormat::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LocationPolicy {
        LocationPolicy {
            preferred_city: "Тюмень".to_string(),
            preferred_area_id: Some("95".to_string()),
            accept_hybrid_elsewhere: false,
        }
    }

    #[test]
    fn preferred_city_accepts_office() {
        assert!(policy().accepts(WorkFormat::Office, Some("Тюмень"), None));
        assert!(policy().accepts(WorkFormat::Unknown, None, Some("95")));
    }

    #[test]
    fn other_city_rejects_office() {
        assert!(!policy().accepts(WorkFormat::Office, Some("Москва"), Some("1")));
    }

    #[test]
    fn other_city_accepts_remote() {
        assert!(policy().accepts(WorkFormat::Remote, Some("Москва"), Some("1")));
    }

    #[test]
    fn hybrid_elsewhere_depends_on_permissive_flag() {
        let mut p = policy();
        assert!(!p.accepts(WorkFormat::Hybrid, Some("Омск"), Some("68")));
        p.accept_hybrid_elsewhere = true;
        assert!(p.accepts(WorkFormat::Hybrid, Some("Омск"), Some("68")));
    }

    #[test]
    fn city_name_match_ignores_case() {
        assert!(policy().is_preferred(Some(" тюмень "), None));
    }
}
