//! Common utilities shared by commands, the service client and the test harness

pub mod ansi;
pub mod config;
pub mod error;
pub mod logging;
pub mod netrc;
pub mod paths;
pub mod profile;

pub use error::{Error, Result};
