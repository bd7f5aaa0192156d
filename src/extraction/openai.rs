//! OpenAI chat-completions extractor.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{strip_code_fence, Extraction, ExtractionContext, Extractor};
use crate::error::ExtractionError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "Sos un asistente que extrae datos de eventos de tango \
(clases, milongas, seminarios, eventos especiales) de un mensaje en español. \
Respondé SOLO con JSON válido con esta forma: \
{\"partial_event\": {\"event_type\": \"class|milonga|seminar|special_event\", \
\"title\": str, \"venue_name\": str, \"address\": str, \"date\": \"DD/MM/AAAA\", \
\"time\": \"HH:MM\", \"end_time\": \"HH:MM\", \"description\": str, \
\"organizer_name\": str, \"price\": str, \"has_weekly_recurrence\": bool}, \
\"confidence\": entero 0-100, \"missing_fields\": [str], \
\"needs_human_input\": bool, \"follow_up_questions\": [str]}. \
Omití los campos que el mensaje no menciona. No inventes datos.";

/// Extractor backed by the OpenAI chat completions API.
pub struct OpenAiExtractor {
    api_key: SecretString,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiExtractor {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(&self, text: &str, context: &ExtractionContext) -> serde_json::Value {
        let mut user = format!("Fecha de hoy: {}.\n", context.today.format("%d/%m/%Y"));
        if let Some(event_type) = context.event_type {
            user.push_str(&format!("Tipo de evento ya elegido: {}.\n", event_type.label()));
        }
        user.push_str("Mensaje:\n");
        user.push_str(text);

        serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user},
            ],
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Parse the assistant message content into an [`Extraction`].
fn parse_content(content: &str) -> Result<Extraction, ExtractionError> {
    Ok(serde_json::from_str(strip_code_fence(content))?)
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    fn name(&self) -> &str {
        "openai"
    }

    async fn infer(
        &self,
        text: &str,
        context: &ExtractionContext,
    ) -> Result<Extraction, ExtractionError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(text, context))
            .send()
            .await
            .map_err(|e| ExtractionError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractionError::RequestFailed(format!(
                "status {status}: {body}"
            )));
        }

        let completion: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractionError::InvalidResponse("empty completion".into()))?;

        let extraction = parse_content(&content)?;
        tracing::debug!(
            model = %self.model,
            confidence = extraction.confidence,
            "Extraction completed"
        );
        Ok(extraction)
    }
}
