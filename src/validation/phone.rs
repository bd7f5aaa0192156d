//! Local phone number validation.

use super::{ValidationError, ValidationResult};

/// Accepted shape of a local phone number, after stripping non-digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneRules {
    pub min_digits: usize,
    pub max_digits: usize,
    /// Leading digits every number must start with (local area code convention).
    pub required_prefix: String,
}

impl Default for PhoneRules {
    fn default() -> Self {
        Self {
            min_digits: 8,
            max_digits: 15,
            required_prefix: "2".to_string(),
        }
    }
}

/// Strip formatting and return the bare digit string.
pub fn validate_phone(input: &str, rules: &PhoneRules) -> ValidationResult<String> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < rules.min_digits || digits.len() > rules.max_digits {
        return Err(ValidationError::new(format!(
            "El número debe tener entre {} y {} dígitos.",
            rules.min_digits, rules.max_digits
        ))
        .with_example("221 555-1234"));
    }

    if !digits.starts_with(&rules.required_prefix) {
        return Err(ValidationError::new(format!(
            "El número debe empezar con {} (característica local, sin 0 ni 15).",
            rules.required_prefix
        ))
        .with_example("221 555-1234"));
    }

    Ok(digits)
}
