//! In-process command runner
//!
//! Runs a CLI invocation against in-memory streams and, when given a script,
//! answers its prompts through a [`Conversation`] on a background task.

use tokio::io::BufReader;
use tokio::sync::oneshot;

use crate::cli::{self, CommandIo, Context};
use crate::common::ansi::strip_ansi;
use crate::common::config::Settings;
use crate::common::Result;

use super::conversation::{Conversation, ConversationResult, ConversationSettings};
use super::script::Script;
use super::tee::tee;

/// Buffer size of the pipe feeding the command's stdin
const STDIN_CAPACITY: usize = 64 * 1024;

/// Everything a finished command left behind
#[derive(Debug)]
pub struct CommandOutput {
    /// Captured stdout, control sequences removed
    pub stdout: String,
    /// Captured stderr, control sequences removed
    pub stderr: String,
    /// The command's own result
    pub result: Result<()>,
    /// The conversation's result; `Ok` when no script was given
    pub conversation: ConversationResult,
}

impl CommandOutput {
    fn new(
        stdout: &[u8],
        stderr: &[u8],
        result: Result<()>,
        conversation: ConversationResult,
    ) -> Self {
        Self {
            stdout: strip_ansi(&String::from_utf8_lossy(stdout)).into_owned(),
            stderr: strip_ansi(&String::from_utf8_lossy(stderr)).into_owned(),
            result,
            conversation,
        }
    }

    /// Both the command and its conversation succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && self.conversation.is_ok()
    }

    /// The command's error message, if it failed
    pub fn error_message(&self) -> Option<String> {
        self.result.as_ref().err().map(ToString::to_string)
    }
}

/// Runs commands in-process against a fixed [`Context`]
#[derive(Clone)]
pub struct CommandRunner {
    context: Context,
    settings: ConversationSettings,
}

impl CommandRunner {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            settings: ConversationSettings::default(),
        }
    }

    /// A runner timed by the `[conversation]` section of `settings`
    pub fn from_settings(context: Context, settings: &Settings) -> Self {
        Self::new(context).with_settings(settings.conversation.into())
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ConversationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run a command with no input
    ///
    /// `args` excludes the program name.
    pub async fn run(&self, args: &[&str]) -> CommandOutput {
        self.run_with_prompt_responses(Script::default(), args)
            .await
    }

    /// Run a command while a conversation answers its prompts
    pub async fn run_with_prompt_responses(&self, script: Script, args: &[&str]) -> CommandOutput {
        let argv: Vec<&str> = std::iter::once("conjur")
            .chain(args.iter().copied())
            .collect();
        tracing::debug!(?argv, entries = script.len(), "running command");

        let mut stderr = Vec::new();

        if script.is_empty() {
            let mut stdin = tokio::io::empty();
            let mut stdout = Vec::new();
            let result = {
                let mut io = CommandIo::new(&mut stdin, &mut stdout, &mut stderr);
                cli::execute(argv, &mut io, &self.context).await
            };
            return CommandOutput::new(&stdout, &stderr, result, Ok(()));
        }

        let (stdin_writer, stdin_reader) = tokio::io::duplex(STDIN_CAPACITY);
        let (mut stdout, tap) = tee(Vec::new());
        let (done_tx, done_rx) = oneshot::channel();

        let conversation = Conversation::new(script)
            .with_settings(self.settings)
            .spawn(tap, stdin_writer, done_rx);

        let mut stdin = BufReader::new(stdin_reader);
        let result = {
            let mut io = CommandIo::new(&mut stdin, &mut stdout, &mut stderr);
            cli::execute(argv, &mut io, &self.context).await
        };

        drop(stdin);
        if done_tx.send(()).is_err() {
            tracing::debug!("conversation already finished");
        }
        let conversation = conversation.wait().await;

        CommandOutput::new(stdout.get_ref(), &stderr, result, conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpConnector;
    use std::sync::Arc;
    use std::time::Duration;

    fn runner(settings: &Settings) -> CommandRunner {
        let dir = std::env::temp_dir();
        let context = Context::new(
            dir.join("conjurrc"),
            dir.join("conjur-server.pem"),
            dir.join("netrc"),
            Arc::new(HttpConnector::new(&settings.http)),
        );
        CommandRunner::from_settings(context, settings)
    }

    #[test]
    fn settings_file_sets_conversation_timing() {
        let settings = Settings::parse(
            "[conversation]\nprompt_timeout_ms = 250\npoll_interval_ms = 0\n",
        )
        .unwrap();
        let runner = runner(&settings);
        assert_eq!(runner.settings.prompt_timeout, Duration::from_millis(250));
        assert_eq!(runner.settings.poll_interval, Duration::from_millis(1));
    }

    #[tokio::test]
    async fn version_needs_no_conversation() {
        let output = runner(&Settings::default()).run(&["--version"]).await;
        assert!(output.is_success());
        assert!(output.stdout.starts_with("conjur "), "{}", output.stdout);
    }
}
