//! Free-text extraction: an alternate entry into the event wizard.
//!
//! An [`Extractor`] turns one descriptive message into a [`PartialEvent`].
//! Nothing it returns is trusted: [`merge_into_draft`] pushes every field
//! back through the same validators the step-by-step wizard uses.

pub mod openai;

pub use openai::OpenAiExtractor;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::ExtractionError;
use crate::flow::draft::{ClassEntry, DraftEvent, EventType, Organizer, PricingEntry};
use crate::validation::{validate_price, validate_time, ValidationRules};

/// Fields an extractor may recover, as raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PartialEvent {
    pub event_type: Option<EventType>,
    pub title: Option<String>,
    pub venue_name: Option<String>,
    pub address: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub organizer_name: Option<String>,
    pub price: Option<String>,
    pub has_weekly_recurrence: Option<bool>,
}

/// Extractor output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Extraction {
    #[serde(alias = "partial_event")]
    pub partial: PartialEvent,
    /// 0–100.
    #[serde(deserialize_with = "percent")]
    pub confidence: u8,
    pub missing_fields: Vec<String>,
    pub needs_human_input: bool,
    pub follow_up_questions: Vec<String>,
}

impl Extraction {
    /// Whether the user should be told the result is uncertain.
    pub fn needs_review(&self, min_confidence: u8) -> bool {
        self.needs_human_input || self.confidence < min_confidence
    }
}

/// Read any JSON number (or null) as a whole percentage, clamped to 0–100.
fn percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if !raw.is_finite() {
        return Ok(0);
    }
    Ok(raw.clamp(0.0, 100.0).round() as u8)
}

/// Facts the extractor needs to resolve relative expressions.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub today: NaiveDate,
    pub event_type: Option<EventType>,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extractor name for logging.
    fn name(&self) -> &str;

    async fn infer(
        &self,
        text: &str,
        context: &ExtractionContext,
    ) -> Result<Extraction, ExtractionError>;
}

/// Validate each extracted field and copy the valid ones into `draft`.
///
/// Fields already present in the draft are only overwritten by valid
/// values; a valid time or price replaces the whole class or price list.
/// Returns the names of the fields that were dropped.
pub fn merge_into_draft(
    partial: &PartialEvent,
    draft: &mut DraftEvent,
    rules: &ValidationRules,
    today: NaiveDate,
) -> Vec<&'static str> {
    let mut dropped = Vec::new();

    if let Some(event_type) = partial.event_type {
        draft.event_type = Some(event_type);
    }

    let mut text_field = |value: &Option<String>, slot: &mut Option<String>, name: &'static str| {
        if let Some(raw) = value {
            match rules.name(raw) {
                Ok(clean) => *slot = Some(clean),
                Err(_) => dropped.push(name),
            }
        }
    };
    text_field(&partial.title, &mut draft.title, "title");
    text_field(&partial.venue_name, &mut draft.venue_name, "venue_name");
    text_field(&partial.address, &mut draft.address, "address");

    if let Some(raw) = &partial.date {
        match rules.date_at(raw, today) {
            Ok(date) => draft.date = Some(date),
            Err(_) => dropped.push("date"),
        }
    }

    if let Some(raw) = &partial.description {
        match rules.description(raw) {
            Ok(text) => draft.description = Some(text),
            Err(_) => dropped.push("description"),
        }
    }

    if let Some(raw) = &partial.time {
        match validate_time(raw) {
            Ok(start) => {
                let end_time = partial.end_time.as_deref().and_then(|e| validate_time(e).ok());
                if draft.event_type.is_some_and(|t| t.uses_class_branch()) {
                    draft.pending_class = None;
                    draft.classes = vec![ClassEntry {
                        start_time: start,
                        end_time,
                        level: None,
                    }];
                } else {
                    draft.start_time = Some(start);
                }
            }
            Err(_) => dropped.push("time"),
        }
    }

    if let Some(raw) = &partial.organizer_name {
        match rules.name(raw) {
            Ok(name) => {
                let known = draft
                    .organizers
                    .iter()
                    .any(|entry| entry.organizer.name() == name);
                if !known {
                    draft.add_organizer(Organizer::OneTime { name });
                }
            }
            Err(_) => dropped.push("organizer_name"),
        }
    }

    if let Some(raw) = &partial.price {
        match validate_price(raw) {
            Ok(price) => {
                draft.pending_price_description = None;
                draft.pricing = vec![PricingEntry {
                    description: "Entrada".to_string(),
                    price,
                }];
            }
            Err(_) => dropped.push("price"),
        }
    }

    if let Some(weekly) = partial.has_weekly_recurrence {
        draft.has_weekly_recurrence = weekly;
    }

    if !dropped.is_empty() {
        debug!(?dropped, "Dropped invalid extracted fields");
    }
    dropped
}

/// Strip a Markdown code fence the model may wrap its JSON in.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn valid_fields_are_merged() {
        let partial = PartialEvent {
            event_type: Some(EventType::Milonga),
            title: Some("La Milonguita".into()),
            venue_name: Some("Club Atenas".into()),
            address: Some("Calle 13 1234".into()),
            date: Some("mañana".into()),
            time: Some("22:00".into()),
            organizer_name: Some("Ana".into()),
            price: Some("gratis".into()),
            ..Default::default()
        };
        let mut draft = DraftEvent::default();
        let dropped = merge_into_draft(&partial, &mut draft, &ValidationRules::default(), today());

        assert!(dropped.is_empty());
        assert_eq!(draft.date.as_deref(), Some("2026-10-18"));
        assert_eq!(draft.start_time.as_deref(), Some("22:00"));
        assert!(draft.pricing[0].price.is_free());
        assert!(draft.is_complete());
    }

    #[test]
    fn invalid_fields_are_dropped_not_stored() {
        let partial = PartialEvent {
            event_type: Some(EventType::Class),
            title: Some("x".into()),
            date: Some("31/02/2026".into()),
            time: Some("25:99".into()),
            price: Some("-5".into()),
            ..Default::default()
        };
        let mut draft = DraftEvent::default();
        let dropped = merge_into_draft(&partial, &mut draft, &ValidationRules::default(), today());

        assert_eq!(dropped, vec!["title", "date", "time", "price"]);
        assert!(draft.title.is_none());
        assert!(draft.date.is_none());
        assert!(draft.classes.is_empty());
        assert!(draft.pricing.is_empty());
    }

    #[test]
    fn class_times_become_class_entries() {
        let partial = PartialEvent {
            event_type: Some(EventType::Seminar),
            time: Some("19:00".into()),
            end_time: Some("20:30".into()),
            ..Default::default()
        };
        let mut draft = DraftEvent::default();
        merge_into_draft(&partial, &mut draft, &ValidationRules::default(), today());
        assert_eq!(draft.classes.len(), 1);
        assert_eq!(draft.classes[0].end_time.as_deref(), Some("20:30"));
        assert!(draft.start_time.is_none());
    }

    #[test]
    fn merging_twice_does_not_duplicate_lists() {
        let partial = PartialEvent {
            event_type: Some(EventType::Class),
            time: Some("19:00".into()),
            organizer_name: Some("Zoe Perez".into()),
            price: Some("5000".into()),
            ..Default::default()
        };
        let mut draft = DraftEvent::default();
        merge_into_draft(&partial, &mut draft, &ValidationRules::default(), today());

        let corrected = PartialEvent {
            time: Some("20:00".into()),
            ..partial
        };
        merge_into_draft(&corrected, &mut draft, &ValidationRules::default(), today());

        assert_eq!(draft.classes.len(), 1);
        assert_eq!(draft.classes[0].start_time, "20:00");
        assert_eq!(draft.organizers.len(), 1);
        assert_eq!(draft.pricing.len(), 1);
    }

    #[test]
    fn confidence_accepts_fractions_and_clamps() {
        let parse = |raw: &str| {
            serde_json::from_str::<Extraction>(&format!(r#"{{"confidence": {raw}}}"#))
                .unwrap()
                .confidence
        };
        assert_eq!(parse("85.5"), 86);
        assert_eq!(parse("300"), 100);
        assert_eq!(parse("-4"), 0);
        assert_eq!(parse("null"), 0);
        assert_eq!(
            serde_json::from_str::<Extraction>("{}").unwrap().confidence,
            0
        );
    }

    #[test]
    fn review_threshold() {
        let mut extraction = Extraction {
            confidence: 80,
            ..Default::default()
        };
        assert!(!extraction.needs_review(60));
        extraction.confidence = 40;
        assert!(extraction.needs_review(60));
        extraction.confidence = 90;
        extraction.needs_human_input = true;
        assert!(extraction.needs_review(60));
    }

    #[test]
    fn extraction_parses_from_json() {
        let json = r#"{
            "partial_event": {"event_type": "special_event", "title": "Festival"},
            "confidence": 72,
            "missing_fields": ["date"],
            "needs_human_input": false
        }"#;
        let extraction: Extraction = serde_json::from_str(json).unwrap();
        assert_eq!(extraction.partial.event_type, Some(EventType::SpecialEvent));
        assert_eq!(extraction.confidence, 72);
        assert!(extraction.follow_up_questions.is_empty());
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence(" {\"a\":1} "), "{\"a\":1}");
    }
}
