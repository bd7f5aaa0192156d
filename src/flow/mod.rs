//! Conversation state machine.
//!
//! - `state`: every dialogue state and the static back map
//! - `commands`: the yes/no/back/exit vocabulary
//! - `draft` / `session`: per-phone memory
//! - `menu`, `event`, `teacher`: the three flow handlers
//! - `dispatcher`: routes inbound messages to them
//! - `messages`: all user-facing text

pub mod commands;
pub mod dispatcher;
pub mod draft;
pub mod event;
pub mod handler;
pub mod menu;
pub mod messages;
pub mod session;
pub mod state;
pub mod teacher;

pub use dispatcher::Dispatcher;
pub use draft::{DraftEvent, DraftTeacher, EventType, NewTeacher, Organizer};
pub use event::EventFlow;
pub use handler::{
    Clock, FixedClock, FlowContext, FlowDeps, FlowHandler, FlowOutcome, RestartPolicy, SystemClock,
};
pub use menu::MenuFlow;
pub use session::{PhoneKeyFormat, Session, SessionStore};
pub use state::{ChatState, Flow};
pub use teacher::TeacherFlow;
