//! WhatsApp channel — Cloud API webhook in, Graph API messages out.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::channels::{Transport, split_message};
use crate::error::ChannelError;
use crate::flow::Dispatcher;

/// Maximum body length for a WhatsApp text message.
const WHATSAPP_MAX_MESSAGE_LENGTH: usize = 4096;

/// Cloud API credentials.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub access_token: SecretString,
    pub phone_number_id: String,
    /// Shared secret echoed back by Meta during webhook verification.
    pub verify_token: SecretString,
    pub api_version: String,
}

/// Sends replies through the Graph API `/messages` endpoint.
pub struct WhatsAppTransport {
    config: WhatsAppConfig,
    base_url: String,
    client: reqwest::Client,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            base_url: "https://graph.facebook.com".to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different Graph API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.config.api_version, self.config.phone_number_id
        )
    }

    async fn send_chunk(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": recipient,
            "type": "text",
            "text": { "preview_url": false, "body": text },
        });

        let resp = self
            .client
            .post(self.messages_url())
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: format!("messages returned {status}: {err}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, WHATSAPP_MAX_MESSAGE_LENGTH) {
            self.send_chunk(recipient, &chunk).await?;
        }
        Ok(())
    }
}

// ── Webhook payload ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookChange {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    from: String,
    #[serde(rename = "type", default)]
    kind: String,
    text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    body: String,
}

/// `(sender, text)` for every text message in a webhook body. Statuses,
/// media and reactions are skipped.
fn text_messages(payload: WebhookPayload) -> Vec<(String, String)> {
    payload
        .entry
        .into_iter()
        .flat_map(|e| e.changes)
        .flat_map(|c| c.value.messages)
        .filter(|m| m.kind == "text")
        .filter_map(|m| m.text.map(|t| (m.from, t.body)))
        .collect()
}

// ── Router ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct WebhookState {
    dispatcher: Arc<Dispatcher>,
    verify_token: Arc<SecretString>,
}

#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// `GET /webhook` (verification), `POST /webhook` (messages), `GET /health`.
pub fn webhook_router(dispatcher: Arc<Dispatcher>, verify_token: SecretString) -> Router {
    let state = WebhookState {
        dispatcher,
        verify_token: Arc::new(verify_token),
    };
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let token_ok = params
        .verify_token
        .as_deref()
        .is_some_and(|t| t == state.verify_token.expose_secret());
    match (params.mode.as_deref(), params.challenge) {
        (Some("subscribe"), Some(challenge)) if token_ok => {
            info!("WhatsApp webhook verified");
            (StatusCode::OK, challenge)
        }
        _ => {
            warn!("WhatsApp webhook verification rejected");
            (StatusCode::FORBIDDEN, String::new())
        }
    }
}

/// Always answers 200 so Meta does not redeliver; messages are handled
/// in the background, in arrival order.
async fn receive_webhook(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed webhook body");
            return StatusCode::OK;
        }
    };

    let messages = text_messages(payload);
    if messages.is_empty() {
        debug!("Webhook carried no text messages");
        return StatusCode::OK;
    }

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        for (from, text) in messages {
            dispatcher.handle_message(&from, &text).await;
        }
    });
    StatusCode::OK
}
