//! Dispatcher — entry point for every inbound message.
//!
//! Normalizes the sender into a session key, locks that session for the
//! whole handling, routes by current state through a table built once at
//! construction, and delivers the replies. Handler failures (errors and
//! panics alike) reset the session and end in a generic apology; nothing
//! propagates to the caller.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};

use super::commands::normalize;
use super::event::EventFlow;
use super::handler::{FlowContext, FlowDeps, FlowHandler};
use super::menu::MenuFlow;
use super::messages;
use super::session::{PhoneKeyFormat, Session, SessionStore};
use super::state::ChatState;
use super::teacher::TeacherFlow;
use crate::channels::Transport;
use crate::error::RoutingError;

pub struct Dispatcher {
    handlers: Vec<Arc<dyn FlowHandler>>,
    routes: HashMap<ChatState, usize>,
    sessions: SessionStore,
    transport: Arc<dyn Transport>,
    phone_format: PhoneKeyFormat,
    secret_access_code: Option<SecretString>,
}

impl Dispatcher {
    /// Build a dispatcher, checking that every state has exactly one handler.
    pub fn new(
        handlers: Vec<Arc<dyn FlowHandler>>,
        transport: Arc<dyn Transport>,
        phone_format: PhoneKeyFormat,
    ) -> Result<Self, RoutingError> {
        let routes = build_routes(&handlers)?;
        Ok(Self {
            handlers,
            routes,
            sessions: SessionStore::new(),
            transport,
            phone_format,
            secret_access_code: None,
        })
    }

    /// The menu, event and teacher flows over shared collaborators.
    pub fn standard(deps: FlowDeps, transport: Arc<dyn Transport>) -> Result<Self, RoutingError> {
        let phone_format = deps.phone_format.clone();
        let handlers: Vec<Arc<dyn FlowHandler>> = vec![
            Arc::new(MenuFlow::new(deps.clone())),
            Arc::new(EventFlow::new(deps.clone())),
            Arc::new(TeacherFlow::new(deps)),
        ];
        Self::new(handlers, transport, phone_format)
    }

    /// A code that, sent from any state, opens the organizer menu.
    pub fn with_secret_access_code(mut self, code: Option<SecretString>) -> Self {
        self.secret_access_code = code.filter(|c| !c.expose_secret().trim().is_empty());
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Current state for a raw sender id.
    pub async fn state_of(&self, phone: &str) -> ChatState {
        self.sessions.state(&self.phone_format.normalize(phone)).await
    }

    fn is_secret_code(&self, normalized: &str) -> bool {
        self.secret_access_code
            .as_ref()
            .is_some_and(|code| normalize(code.expose_secret()) == normalized)
    }

    /// Handle one inbound message and deliver the replies. Returns the
    /// session's state afterwards.
    pub async fn handle_message(&self, phone: &str, text: &str) -> ChatState {
        let key = self.phone_format.normalize(phone);
        let handle = self.sessions.entry(&key).await;
        let mut session = handle.lock().await;

        let normalized = normalize(text);
        let replies = if self.is_secret_code(&normalized) {
            info!(phone = %key, from = %session.state, "Secret access code used");
            session.discard_drafts();
            session.state = ChatState::MenuSpecial;
            vec![messages::special_menu()]
        } else {
            let ctx = FlowContext {
                phone_number: key.clone(),
                raw_message: text.to_string(),
                normalized,
                current_state: session.state,
            };
            self.run_handler(&ctx, &mut session).await
        };
        let state = session.state;

        for reply in &replies {
            if let Err(e) = self.transport.send_text(&key, reply).await {
                warn!(
                    phone = %key,
                    transport = self.transport.name(),
                    error = %e,
                    "Reply delivery failed"
                );
            }
        }
        state
    }

    async fn run_handler(&self, ctx: &FlowContext, session: &mut Session) -> Vec<String> {
        let Some(handler) = self.routes.get(&ctx.current_state).map(|i| &self.handlers[*i]) else {
            // Unreachable after build_routes succeeded.
            error!(state = %ctx.current_state, "No handler routed for state");
            session.reset();
            return vec![messages::generic_apology()];
        };

        let result = AssertUnwindSafe(handler.handle(ctx, session))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(outcome)) => {
                let completed = ctx.current_state.is_flow_complete()
                    && outcome.next_state.is_some_and(|s| s.is_menu_state());
                if completed {
                    info!(
                        phone = %ctx.phone_number,
                        handler = handler.name(),
                        "Flow completed"
                    );
                }
                if let Some(next) = outcome.next_state {
                    debug!(
                        phone = %ctx.phone_number,
                        handler = handler.name(),
                        from = %ctx.current_state,
                        to = %next,
                        "Transition"
                    );
                    session.state = next;
                }
                outcome.replies
            }
            Ok(Err(e)) => {
                error!(
                    phone = %ctx.phone_number,
                    handler = handler.name(),
                    state = %ctx.current_state,
                    error = %e,
                    "Flow handler failed"
                );
                session.reset();
                vec![messages::generic_apology()]
            }
            Err(_) => {
                error!(
                    phone = %ctx.phone_number,
                    handler = handler.name(),
                    state = %ctx.current_state,
                    "Flow handler panicked"
                );
                session.reset();
                vec![messages::generic_apology()]
            }
        }
    }
}

/// Map every state to the single handler claiming it.
fn build_routes(
    handlers: &[Arc<dyn FlowHandler>],
) -> Result<HashMap<ChatState, usize>, RoutingError> {
    let mut routes = HashMap::new();
    for state in ChatState::all() {
        let mut claimant: Option<usize> = None;
        for (index, handler) in handlers.iter().enumerate() {
            if !handler.can_handle(state) {
                continue;
            }
            if let Some(first) = claimant {
                return Err(RoutingError::Conflict {
                    state,
                    first: handlers[first].name(),
                    second: handler.name(),
                });
            }
            claimant = Some(index);
        }
        let index = claimant.ok_or(RoutingError::Unclaimed(state))?;
        routes.insert(state, index);
    }
    Ok(routes)
}
