//! Input validators: pure parsers from raw chat text into typed values.
//!
//! Every validator returns a [`ValidationResult`]: the parsed value, or a
//! [`ValidationError`] carrying the Spanish message shown verbatim to the
//! user (plus an optional example). Validators never panic and keep no state.

pub mod date;
pub mod phone;
pub mod price;
pub mod text;
pub mod time;

pub use date::{validate_date, YearRange};
pub use phone::{validate_phone, PhoneRules};
pub use price::{validate_price, Price};
pub use text::{validate_description, validate_name};
pub use time::validate_time;

use chrono::NaiveDate;

/// A rejected input, with the user-facing explanation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub example: Option<&'static str>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            example: None,
        }
    }

    pub fn with_example(mut self, example: &'static str) -> Self {
        self.example = Some(example);
        self
    }

    /// Message plus example, ready to send.
    pub fn to_user_text(&self) -> String {
        match self.example {
            Some(example) => format!("❌ {}\n\nEjemplo: {}", self.message, example),
            None => format!("❌ {}", self.message),
        }
    }
}

/// Uniform validator output: the value iff valid, the error iff not.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Thresholds shared by every validator. Loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub years: YearRange,
    pub phone: PhoneRules,
    pub name_min_len: usize,
    pub description_min_len: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            years: YearRange::default(),
            phone: PhoneRules::default(),
            name_min_len: 2,
            description_min_len: 10,
        }
    }
}

impl ValidationRules {
    /// Validate a date relative to `today`.
    pub fn date_at(&self, input: &str, today: NaiveDate) -> ValidationResult<String> {
        validate_date(input, today, &self.years)
    }

    pub fn phone(&self, input: &str) -> ValidationResult<String> {
        validate_phone(input, &self.phone)
    }

    pub fn name(&self, input: &str) -> ValidationResult<String> {
        validate_name(input, self.name_min_len)
    }

    pub fn description(&self, input: &str) -> ValidationResult<String> {
        validate_description(input, self.description_min_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_text_includes_example_when_present() {
        let err = ValidationError::new("Formato inválido").with_example("20:30");
        assert_eq!(err.to_user_text(), "❌ Formato inválido\n\nEjemplo: 20:30");
        assert_eq!(ValidationError::new("Nope").to_user_text(), "❌ Nope");
    }

    #[test]
    fn default_rules_match_documented_thresholds() {
        let rules = ValidationRules::default();
        assert_eq!(rules.years, YearRange { min: 2024, max: 2030 });
        assert_eq!(rules.phone.min_digits, 8);
        assert_eq!(rules.phone.max_digits, 15);
        assert_eq!(rules.phone.required_prefix, "2");
        assert_eq!(rules.name_min_len, 2);
        assert_eq!(rules.description_min_len, 10);
    }
}
