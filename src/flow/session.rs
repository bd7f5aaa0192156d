//! Per-phone-number session memory.
//!
//! Each session sits behind its own `Mutex`, so the read → validate →
//! mutate → write sequence of one message is atomic for that number while
//! other numbers proceed concurrently. The outer map lock is only held for
//! the lookup/insert.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::draft::{DraftEvent, DraftTeacher};
use super::state::ChatState;
use crate::directory::{ListedEvent, TeacherMatch};

/// Country-code rewrite applied to every inbound sender id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneKeyFormat {
    pub country_code: String,
    /// Digit the messaging platform inserts after the country code for mobiles.
    pub mobile_prefix: String,
}

impl Default for PhoneKeyFormat {
    fn default() -> Self {
        Self {
            country_code: "54".to_string(),
            mobile_prefix: "9".to_string(),
        }
    }
}

impl PhoneKeyFormat {
    /// Canonical session key: digits only, `<cc><mobile><n>` → `<cc><n>`.
    pub fn normalize(&self, raw: &str) -> String {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let mobile = format!("{}{}", self.country_code, self.mobile_prefix);
        match digits.strip_prefix(&mobile) {
            Some(rest) if !rest.is_empty() => format!("{}{}", self.country_code, rest),
            _ => digits,
        }
    }

    /// Local number for a session key (country code removed).
    pub fn local_number<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.country_code.as_str())
            .filter(|rest| !rest.is_empty())
            .unwrap_or(key)
    }
}

/// Query results remembered between messages for index selection.
#[derive(Debug, Clone)]
pub enum CachedResults {
    Teachers(Vec<TeacherMatch>),
    Events(Vec<ListedEvent>),
}

/// Everything the bot remembers about one phone number.
#[derive(Debug)]
pub struct Session {
    pub key: String,
    pub state: ChatState,
    pub event: Option<DraftEvent>,
    pub teacher: Option<DraftTeacher>,
    pub cache: Option<CachedResults>,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: ChatState::Start,
            event: None,
            teacher: None,
            cache: None,
        }
    }

    /// Drop every draft and cached result.
    pub fn discard_drafts(&mut self) {
        self.event = None;
        self.teacher = None;
        self.cache = None;
    }

    /// Back to `START` with nothing remembered.
    pub fn reset(&mut self) {
        debug!(phone = %self.key, from = %self.state, "Session reset");
        self.discard_drafts();
        self.state = ChatState::Start;
    }

    /// The event draft, created empty if absent.
    pub fn event_mut(&mut self) -> &mut DraftEvent {
        self.event.get_or_insert_with(DraftEvent::default)
    }

    /// The teacher draft, created empty if absent.
    pub fn teacher_mut(&mut self) -> &mut DraftTeacher {
        self.teacher.get_or_insert_with(DraftTeacher::default)
    }

    pub fn cached_teachers(&self) -> &[TeacherMatch] {
        match &self.cache {
            Some(CachedResults::Teachers(teachers)) => teachers,
            _ => &[],
        }
    }

    pub fn cached_events(&self) -> &[ListedEvent] {
        match &self.cache {
            Some(CachedResults::Events(events)) => events,
            _ => &[],
        }
    }
}

/// Shared keyed session repository.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the session handle for `key`, creating it on first contact.
    pub async fn entry(&self, key: &str) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.read().await.get(key) {
            return Arc::clone(existing);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(key)))),
        )
    }

    /// Current state for `key`; absence means `START`.
    pub async fn state(&self, key: &str) -> ChatState {
        let handle = self.sessions.read().await.get(key).cloned();
        match handle {
            Some(session) => session.lock().await.state,
            None => ChatState::Start,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
