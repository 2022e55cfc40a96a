//! Prompt/response conversation engine
//!
//! Drives an interactive command without a terminal. A single background
//! task watches a read view of the command's output and, each time the next
//! expected prompt shows up, writes the scripted answer to the command's
//! input. The task and the command share nothing but the two streams, a
//! one-shot "done" signal (the command finished) and a one-shot result.
//!
//! Every wait is bounded: the per-prompt deadline, the done signal and the
//! poll tick are raced in one `select!`, so the task cannot outlive the
//! command by more than one prompt timeout.

use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::common::ansi::strip_ansi;
use crate::common::config::ConversationConfig;

use super::script::{PromptResponse, Script};

/// Size of a single read from the output view
const READ_CHUNK: usize = 4096;

/// Shortest poll period; a zero period would stall the timer
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Most unterminated output kept while waiting for a prompt to complete
const MAX_FRAGMENT: usize = 16 * 1024;

/// Outcome of a conversation, reported once through the result signal
pub type ConversationResult = std::result::Result<(), ConversationError>;

/// Why a conversation did not complete
#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("waited {waited:?} without the command issuing the expected prompt {prompt:?}")]
    PromptTimeout { prompt: String, waited: Duration },

    #[error("command finished before the conversation was exhausted, remaining: [{}]", format_remaining(.remaining))]
    ScriptUnsatisfied { remaining: Vec<PromptResponse> },

    #[error("conversation stream error: {0}")]
    Stream(#[from] io::Error),

    #[error("conversation task stopped without reporting a result")]
    EngineLost,
}

fn format_remaining(remaining: &[PromptResponse]) -> String {
    remaining
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Timing bounds for a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Longest wait for any single prompt, measured from when the engine
    /// starts waiting for that entry
    pub prompt_timeout: Duration,
    /// How often the output view is checked for new text
    pub poll_interval: Duration,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        ConversationConfig::default().into()
    }
}

impl From<ConversationConfig> for ConversationSettings {
    fn from(config: ConversationConfig) -> Self {
        Self {
            prompt_timeout: Duration::from_millis(config.prompt_timeout_ms),
            poll_interval: clamp_poll(Duration::from_millis(config.poll_interval_ms)),
        }
    }
}

impl ConversationSettings {
    #[must_use]
    pub const fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = clamp_poll(interval);
        self
    }
}

const fn clamp_poll(interval: Duration) -> Duration {
    if interval.is_zero() {
        MIN_POLL_INTERVAL
    } else {
        interval
    }
}

/// A script bound to its timing settings, ready to run against streams
#[derive(Debug, Clone)]
pub struct Conversation {
    script: Script,
    settings: ConversationSettings,
}

impl Conversation {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            settings: ConversationSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ConversationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Run the conversation on a background task
    ///
    /// `output` is a read view of the command's stdout, `input` the write end
    /// of its stdin. `input` is dropped when the conversation ends, which the
    /// command observes as end of input.
    pub fn spawn<R, W>(self, output: R, input: W, done: oneshot::Receiver<()>) -> ConversationHandle
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let task = tokio::spawn(self.respond_to_prompts(output, input, done, result_tx));
        ConversationHandle {
            result: result_rx,
            task,
        }
    }

    /// Run the conversation and send its outcome through `result`
    pub async fn respond_to_prompts<R, W>(
        self,
        output: R,
        input: W,
        done: oneshot::Receiver<()>,
        result: oneshot::Sender<ConversationResult>,
    ) where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let outcome = self.run(output, input, done).await;
        if result.send(outcome).is_err() {
            tracing::debug!("conversation result dropped: nobody is waiting");
        }
    }

    /// Run the conversation to completion on the current task
    pub async fn run<R, W>(
        self,
        mut output: R,
        mut input: W,
        mut done: oneshot::Receiver<()>,
    ) -> ConversationResult
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Conversation { script, settings } = self;
        let mut lines = OutputLines::default();
        let mut cursor = 0;

        // The fields are public, so the builder's clamp may have been bypassed
        let mut ticker = time::interval(clamp_poll(settings.poll_interval));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut failure = None;

        'script: while let Some(entry) = script.get(cursor) {
            if !entry.waits_for_output() {
                if let Err(e) = write_response(&mut input, entry, settings.prompt_timeout).await {
                    failure = Some(e);
                    break;
                }
                tracing::debug!(index = cursor, "wrote unprompted response");
                cursor += 1;
                continue;
            }

            let deadline = time::sleep(settings.prompt_timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    // Done wins ties: a finished command is never reported
                    // as a timeout.
                    biased;

                    _ = &mut done => {
                        tracing::debug!(index = cursor, "command finished, ending conversation");
                        break 'script;
                    }

                    _ = ticker.tick() => {
                        if let Err(e) = lines.fill(&mut output).await {
                            failure = Some(ConversationError::Stream(e));
                            break 'script;
                        }
                        if lines.scan(&entry.prompt) {
                            tracing::debug!(index = cursor, prompt = %entry.prompt, "prompt matched");
                            if let Err(e) =
                                write_response(&mut input, entry, settings.prompt_timeout).await
                            {
                                failure = Some(e);
                                break 'script;
                            }
                            cursor += 1;
                            continue 'script;
                        }
                    }

                    _ = &mut deadline => {
                        tracing::debug!(index = cursor, prompt = %entry.prompt, "prompt timed out");
                        failure = Some(ConversationError::PromptTimeout {
                            prompt: entry.prompt.clone(),
                            waited: settings.prompt_timeout,
                        });
                        break 'script;
                    }
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None if cursor < script.len() => Err(ConversationError::ScriptUnsatisfied {
                remaining: script.remaining(cursor),
            }),
            None => Ok(()),
        }
    }
}

/// Handle to a conversation running on a background task
#[derive(Debug)]
pub struct ConversationHandle {
    result: oneshot::Receiver<ConversationResult>,
    task: JoinHandle<()>,
}

impl ConversationHandle {
    /// Wait for the conversation's outcome and for its task to exit
    pub async fn wait(self) -> ConversationResult {
        let outcome = self.result.await.unwrap_or(Err(ConversationError::EngineLost));
        if let Err(e) = self.task.await {
            tracing::warn!("conversation task failed: {}", e);
        }
        outcome
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    input: &mut W,
    entry: &PromptResponse,
    bound: Duration,
) -> ConversationResult {
    let line = entry.input_line();
    let write = async {
        input.write_all(line.as_bytes()).await?;
        input.flush().await
    };
    match time::timeout(bound, write).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConversationError::Stream(e)),
        Err(_) => Err(ConversationError::Stream(io::Error::new(
            io::ErrorKind::TimedOut,
            "command did not accept input",
        ))),
    }
}

/// Output seen so far that has not been matched against a prompt
#[derive(Debug, Default)]
struct OutputLines {
    buffer: Vec<u8>,
}

impl OutputLines {
    /// Pull whatever output is available right now without waiting for more.
    ///
    /// An empty or ended stream is not an error: more output may follow and
    /// the next tick will look again.
    async fn fill<R: AsyncRead + Unpin>(&mut self, output: &mut R) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match try_read(output, &mut chunk).await {
                Ok(Some(0)) | Ok(None) => return Ok(()),
                Ok(Some(n)) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                    return Ok(())
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Consume output in order until `prompt` is found.
    ///
    /// Complete lines that don't contain the prompt are discarded. A trailing
    /// unterminated fragment (a prompt waiting on the same line for input)
    /// is consumed only when it matches; otherwise it is kept for later
    /// output to complete.
    fn scan(&mut self, prompt: &str) -> bool {
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if line_contains(&line, prompt) {
                return true;
            }
        }

        if !self.buffer.is_empty() && line_contains(&self.buffer, prompt) {
            self.buffer.clear();
            return true;
        }

        if self.buffer.len() > MAX_FRAGMENT {
            let excess = self.buffer.len() - MAX_FRAGMENT;
            self.buffer.drain(..excess);
        }

        false
    }
}

fn line_contains(line: &[u8], prompt: &str) -> bool {
    let text = String::from_utf8_lossy(line);
    strip_ansi(&text).contains(prompt)
}

/// Read without waiting: `Ok(None)` when nothing is buffered yet
async fn try_read<R: AsyncRead + Unpin>(reader: &mut R, chunk: &mut [u8]) -> io::Result<Option<usize>> {
    poll_fn(|cx| {
        let mut buf = ReadBuf::new(&mut chunk[..]);
        match Pin::new(&mut *reader).poll_read(cx, &mut buf) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(Some(buf.filled().len()))),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Ready(Ok(None)),
        }
    })
    .await
}
