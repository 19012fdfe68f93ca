//! Gale - Gemini tool-calling agent
//!
//! This library provides a bounded tool-calling agent loop, a
//! planner/executor coordinator that records every hand-off in a mailbox,
//! and a router that picks between the two per prompt.

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod memory;
pub mod persist;
pub mod runtime;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
