//! Price parsing. Free-entry words collapse to zero.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ValidationError, ValidationResult};

const FREE_WORDS: [&str; 4] = ["gratis", "gratuito", "free", "0"];

/// A non-negative price. Zero means free entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    pub const FREE: Price = Price(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative() || amount.is_zero()).then(|| Self(amount.normalize()))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_free(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Parse a price; free-entry words map to `0`.
pub fn validate_price(input: &str) -> ValidationResult<Price> {
    let normalized = input.trim().to_lowercase();

    if FREE_WORDS.contains(&normalized.as_str()) {
        return Ok(Price::FREE);
    }

    if normalized.contains('-') {
        return Err(ValidationError::new("El precio no puede ser negativo.").with_example("5000"));
    }

    let numeric: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let amount = Decimal::from_str(&numeric).map_err(|_| {
        ValidationError::new("No entendí el precio. Escribí solo el número, o \"gratis\".")
            .with_example("5000")
    })?;

    Price::new(amount)
        .ok_or_else(|| ValidationError::new("El precio no puede ser negativo.").with_example("5000"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn free_words_map_to_zero() {
        for word in ["gratis", "GRATUITO", " free ", "0"] {
            let price = validate_price(word).unwrap();
            assert!(price.is_free());
            assert_eq!(price.to_string(), "0");
        }
    }

    #[test]
    fn strips_currency_and_spaces() {
        assert_eq!(validate_price("$ 5000").unwrap().amount(), dec!(5000));
        assert_eq!(validate_price("2500.50 pesos").unwrap().amount(), dec!(2500.5));
        assert_eq!(validate_price("0.00").unwrap().to_string(), "0");
    }

    #[test]
    fn negative_and_unparseable_rejected() {
        assert!(validate_price("-100").is_err());
        assert!(validate_price("mucho").is_err());
        assert!(validate_price("").is_err());
        assert!(validate_price("1.2.3").is_err());
    }

    #[test]
    fn repeated_validation_is_stable() {
        assert_eq!(validate_price("gratis"), validate_price("gratis"));
        assert_eq!(validate_price("$3000"), validate_price("$3000"));
    }
}
