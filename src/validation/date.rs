//! Date parsing: relative words, numeric dates, and "DD de <mes>".

use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

use super::{ValidationError, ValidationResult};

static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid regex"));

static SPOKEN_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s+de\s+([a-zñ]+)$").expect("valid regex"));

const MONTHS: [(&str, u32); 13] = [
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

/// Inclusive window of accepted years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            min: 2024,
            max: 2030,
        }
    }
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

/// Spanish month name to its number.
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

/// Spanish month name for a month number (1-12).
pub fn month_name(number: u32) -> Option<&'static str> {
    MONTHS
        .iter()
        .find(|(month, n)| *n == number && *month != "setiembre")
        .map(|(month, _)| *month)
}

/// Parse a date into canonical `YYYY-MM-DD`, resolving relative words
/// against `today`.
pub fn validate_date(input: &str, today: NaiveDate, years: &YearRange) -> ValidationResult<String> {
    let normalized = input.trim().to_lowercase();

    let date = match normalized.as_str() {
        "" => return Err(invalid_format()),
        "hoy" | "today" => today,
        "mañana" | "manana" | "tomorrow" => today
            .checked_add_days(Days::new(1))
            .ok_or_else(invalid_format)?,
        other => parse_explicit(other, today)?,
    };

    if !years.contains(date.year()) {
        return Err(ValidationError::new(format!(
            "El año debe estar entre {} y {}.",
            years.min, years.max
        ))
        .with_example("15/03/2025"));
    }

    Ok(date.format("%Y-%m-%d").to_string())
}

fn parse_explicit(input: &str, today: NaiveDate) -> ValidationResult<NaiveDate> {
    if let Some(caps) = NUMERIC_DATE.captures(input) {
        let day: u32 = caps[1].parse().map_err(|_| invalid_format())?;
        let month: u32 = caps[2].parse().map_err(|_| invalid_format())?;
        let year: i32 = caps[3].parse().map_err(|_| invalid_format())?;
        return calendar_date(year, month, day);
    }

    if let Some(caps) = SPOKEN_DATE.captures(input) {
        let day: u32 = caps[1].parse().map_err(|_| invalid_format())?;
        let month = month_number(&caps[2]).ok_or_else(|| {
            ValidationError::new(format!("No reconozco el mes \"{}\".", &caps[2]))
                .with_example("15 de marzo")
        })?;
        return calendar_date(today.year(), month, day);
    }

    Err(invalid_format())
}

fn calendar_date(year: i32, month: u32, day: u32) -> ValidationResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ValidationError::new(format!(
            "La fecha {day:02}/{month:02}/{year} no existe en el calendario."
        ))
        .with_example("15/03/2025")
    })
}

fn invalid_format() -> ValidationError {
    ValidationError::new(
        "No entendí la fecha. Usá DD/MM/AAAA, \"15 de marzo\", \"hoy\" o \"mañana\".",
    )
    .with_example("15/03/2025")
}
