//! Time-of-day parsing: 24h, dotted, 12h am/pm and colloquial Spanish.

use std::sync::LazyLock;

use regex::Regex;

use super::{ValidationError, ValidationResult};

static CLOCK_24H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[:.](\d{2})$").expect("valid regex"));

static CLOCK_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)$").expect("valid regex")
});

/// Colloquial evening times. Tango happens at night, so bare hours read as pm.
const COLLOQUIAL: &[(&str, &str)] = &[
    ("mediodia", "12:00"),
    ("mediodía", "12:00"),
    ("medianoche", "00:00"),
    ("6 y media", "18:30"),
    ("6 y cuarto", "18:15"),
    ("7 menos cuarto", "18:45"),
    ("7 y media", "19:30"),
    ("7 y cuarto", "19:15"),
    ("8 menos cuarto", "19:45"),
    ("8 y media", "20:30"),
    ("8 y cuarto", "20:15"),
    ("9 menos cuarto", "20:45"),
    ("9 y media", "21:30"),
    ("9 y cuarto", "21:15"),
    ("10 menos cuarto", "21:45"),
    ("10 y media", "22:30"),
    ("10 y cuarto", "22:15"),
    ("11 menos cuarto", "22:45"),
    ("11 y media", "23:30"),
    ("11 y cuarto", "23:15"),
    ("12 menos cuarto", "23:45"),
];

/// Parse a time into canonical zero-padded `HH:MM`.
pub fn validate_time(input: &str) -> ValidationResult<String> {
    let normalized = input
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if let Some((_, value)) = COLLOQUIAL.iter().find(|(phrase, _)| *phrase == normalized) {
        return Ok((*value).to_string());
    }

    let (hour, minute) = if let Some(caps) = CLOCK_24H.captures(&normalized) {
        let hour: u32 = caps[1].parse().map_err(|_| invalid_format())?;
        let minute: u32 = caps[2].parse().map_err(|_| invalid_format())?;
        (hour, minute)
    } else if let Some(caps) = CLOCK_12H.captures(&normalized) {
        let hour: u32 = caps[1].parse().map_err(|_| invalid_format())?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().map_err(|_| invalid_format())?,
            None => 0,
        };
        if !(1..=12).contains(&hour) {
            return Err(out_of_range());
        }
        let is_pm = caps[3].starts_with('p');
        let hour = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        (hour, minute)
    } else {
        return Err(invalid_format());
    };

    if hour > 23 || minute > 59 {
        return Err(out_of_range());
    }

    Ok(format!("{hour:02}:{minute:02}"))
}

fn invalid_format() -> ValidationError {
    ValidationError::new("No entendí el horario. Usá HH:MM (24 hs), \"8:30pm\" o \"8 y media\".")
        .with_example("20:30")
}

fn out_of_range() -> ValidationError {
    ValidationError::new("Ese horario no existe: la hora va de 0 a 23 y los minutos de 0 a 59.")
        .with_example("21:00")
}
