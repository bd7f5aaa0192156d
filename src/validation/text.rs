//! Free-text fields: names and descriptions.

use super::{ValidationError, ValidationResult};

/// Trim and require at least `min_len` characters.
pub fn validate_name(input: &str, min_len: usize) -> ValidationResult<String> {
    let trimmed = input.trim();
    if trimmed.chars().count() < min_len {
        return Err(ValidationError::new(format!(
            "El nombre debe tener al menos {min_len} caracteres."
        ))
        .with_example("Práctica La Yumba"));
    }
    Ok(trimmed.to_string())
}

/// Trim and require at least `min_len` characters.
pub fn validate_description(input: &str, min_len: usize) -> ValidationResult<String> {
    let trimmed = input.trim();
    if trimmed.chars().count() < min_len {
        return Err(ValidationError::new(format!(
            "La descripción debe tener al menos {min_len} caracteres."
        ))
        .with_example("Clase de giros para nivel intermedio, traer calzado cómodo"));
    }
    Ok(trimmed.to_string())
}
