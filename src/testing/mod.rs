//! Test harness for interactive commands
//!
//! Runs CLI commands in-process with captured streams and answers their
//! prompts from a script of expected prompt text and responses, so
//! multi-step interactive flows can be tested without a terminal.

mod conversation;
mod runner;
mod script;
mod tee;

pub use conversation::{
    Conversation, ConversationError, ConversationHandle, ConversationResult,
    ConversationSettings,
};
pub use runner::{CommandOutput, CommandRunner};
pub use script::{with_line_terminator, PromptResponse, Script};
pub use tee::{tee, OutputTap, TeeWriter};
