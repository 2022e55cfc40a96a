//! Conversation scripts
//!
//! A script is the ordered list of prompts a command is expected to show and
//! the answer to type for each one.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::common::{Error, Result};

/// An expected prompt and the response to write when it appears
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptResponse {
    /// Substring to look for in the command's output. Empty means write the
    /// response straight away without waiting for any output.
    #[serde(default)]
    pub prompt: String,

    /// Text written to the command's input. A trailing newline is added
    /// unless one is already present, so an empty response is a bare Enter.
    #[serde(default)]
    pub response: String,
}

impl PromptResponse {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
        }
    }

    /// Response written as soon as the conversation reaches this entry
    pub fn immediate(response: impl Into<String>) -> Self {
        Self::new("", response)
    }

    /// Whether this entry waits for output before writing
    pub fn waits_for_output(&self) -> bool {
        !self.prompt.is_empty()
    }

    /// The bytes written to the command's input
    pub fn input_line(&self) -> String {
        with_line_terminator(&self.response)
    }
}

impl fmt::Display for PromptResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{prompt: {:?}, response: {:?}}}", self.prompt, self.response)
    }
}

impl<P: Into<String>, R: Into<String>> From<(P, R)> for PromptResponse {
    fn from((prompt, response): (P, R)) -> Self {
        Self::new(prompt, response)
    }
}

/// Append a newline unless the text already ends with one
pub fn with_line_terminator(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// An ordered, immutable list of prompt/response pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Script {
    entries: Vec<PromptResponse>,
}

impl Script {
    pub fn new(entries: impl IntoIterator<Item = impl Into<PromptResponse>>) -> Self {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a script from YAML: a list of `{prompt, response}` maps
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a YAML script from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_yaml(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PromptResponse> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PromptResponse] {
        &self.entries
    }

    /// Entries from `index` to the end
    pub fn remaining(&self, index: usize) -> Vec<PromptResponse> {
        self.entries.get(index..).unwrap_or_default().to_vec()
    }
}

impl<T: Into<PromptResponse>> FromIterator<T> for Script {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}
