use std::collections::HashMap;

use serde::Deserialize;

use crate::models::listing::Salary;

/// Conversion of listed salaries into the reference currency.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyRates {
    /// Amounts already in this currency pass through untouched.
    pub reference: String,
    /// Units of the reference currency per unit of the keyed currency.
    #[serde(default)]
    pub rates: HashMap<String, f64>,
    /// Used for any currency missing from `rates`. Without it such amounts
    /// pass through unconverted.
    #[serde(default)]
    pub fallback_rate: Option<f64>,
}

impl CurrencyRates {
    pub fn normalize(&self, salary: Option<&Salary>) -> (Option<i64>, Option<i64>) {
        let Some(salary) = salary else {
            return (None, None);
        };
        let rate = match salary.currency.as_deref() {
            None => 1.0,
            Some(code) if code == self.reference => 1.0,
            Some(code) => self
                .rates
                .get(code)
                .copied()
                .or(self.fallback_rate)
                .unwrap_or(1.0),
        };
        let convert = |amount: Option<f64>| amount.map(|a| (a * rate).round() as i64);
        (convert(salary.from), convert(salary.to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salary(from: Option<f64>, to: Option<f64>, currency: &str) -> Salary {
        Salary {
            from,
            to,
            currency: Some(currency.to_string()),
        }
    }

    fn rates() -> CurrencyRates {
        CurrencyRates {
            reference: "RUR".to_string(),
            rates: HashMap::from([("USD".to_string(), 70.0), ("EUR".to_string(), 100.0)]),
            fallback_rate: None,
        }
    }

    #[test]
    fn converts_foreign_currency() {
        let s = salary(Some(100.0), Some(200.0), "USD");
        assert_eq!(rates().normalize(Some(&s)), (Some(7000), Some(14000)));
    }

    #[test]
    fn reference_currency_passes_through() {
        let s = salary(Some(60_000.0), None, "RUR");
        assert_eq!(rates().normalize(Some(&s)), (Some(60_000), None));
    }

    #[test]
    fn unknown_currency_uses_fallback_rate() {
        let s = salary(None, Some(1000.0), "KZT");
        assert_eq!(rates().normalize(Some(&s)), (None, Some(1000)));

        let mut r = rates();
        r.fallback_rate = Some(0.2);
        assert_eq!(r.normalize(Some(&s)), (None, Some(200)));
    }

    #[test]
    fn missing_salary_is_empty() {
        assert_eq!(rates().normalize(None), (None, None));
    }
}
