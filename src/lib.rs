//! Conjur CLI - a command-line client for the Conjur secrets service
//!
//! Besides the commands themselves, the library exposes the in-process test
//! harness ([`testing`]) that drives interactive commands through scripted
//! prompt/response conversations.

pub mod cli;
pub mod client;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use cli::{CommandIo, Context};
pub use common::{Error, Result};
