//! Tango bot — WhatsApp conversation engine for a tango event directory.

pub mod channels;
pub mod config;
pub mod directory;
pub mod error;
pub mod extraction;
pub mod flow;
pub mod validation;
