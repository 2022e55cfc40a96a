//! Conversation engine tests
//!
//! Each test plays the part of an interactive command by hand: it writes
//! prompts into a tee'd stdout and reads answers from a piped stdin, while
//! the engine runs on a background task exactly as the command runner
//! drives it.

use std::time::{Duration, Instant};

use conjur::testing::{
    tee, Conversation, ConversationError, ConversationHandle, ConversationResult,
    ConversationSettings, PromptResponse, Script, TeeWriter,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::oneshot;

/// A fake command wired to a running conversation
struct FakeCommand {
    stdin: BufReader<DuplexStream>,
    stdout: TeeWriter<Vec<u8>>,
    done: oneshot::Sender<()>,
    conversation: ConversationHandle,
}

impl FakeCommand {
    fn start(script: Script, settings: ConversationSettings) -> Self {
        let (stdin_writer, stdin_reader) = tokio::io::duplex(1024);
        let (stdout, tap) = tee(Vec::new());
        let (done, done_rx) = oneshot::channel();

        let conversation = Conversation::new(script)
            .with_settings(settings)
            .spawn(tap, stdin_writer, done_rx);

        Self {
            stdin: BufReader::new(stdin_reader),
            stdout,
            done,
            conversation,
        }
    }

    fn with_timeout(script: Script, timeout: Duration) -> Self {
        Self::start(script, ConversationSettings::default().prompt_timeout(timeout))
    }

    async fn print(&mut self, text: &str) {
        self.stdout.write_all(text.as_bytes()).await.unwrap();
        self.stdout.flush().await.unwrap();
    }

    /// One line of input without its newline; `None` at end of input
    async fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = self.stdin.read_line(&mut line).await.unwrap();
        (n > 0).then(|| line.trim_end_matches('\n').to_string())
    }

    async fn read_rest(&mut self) -> String {
        let mut rest = String::new();
        self.stdin.read_to_string(&mut rest).await.unwrap();
        rest
    }

    /// Finish the command the way the runner does: close stdin, then
    /// signal done and wait for the engine
    async fn finish(self) -> (ConversationResult, String) {
        let FakeCommand {
            stdin,
            stdout,
            done,
            conversation,
        } = self;
        drop(stdin);
        let _ = done.send(());
        let result = conversation.wait().await;
        let output = String::from_utf8(stdout.into_inner()).unwrap();
        (result, output)
    }
}

#[tokio::test]
async fn answers_prompts_in_order() {
    let script = Script::new([
        ("Enter URL", "https://example.com"),
        ("Enter account", "myorg"),
    ]);
    let mut command = FakeCommand::with_timeout(script, Duration::from_secs(5));

    command.print("Enter URL: ").await;
    let url = command.read_line().await;
    command.print("\nEnter account: ").await;
    let account = command.read_line().await;
    let rest = command.read_rest().await;

    assert_eq!(url.as_deref(), Some("https://example.com"));
    assert_eq!(account.as_deref(), Some("myorg"));
    assert_eq!(rest, "", "engine wrote more than the scripted responses");

    let (result, output) = command.finish().await;
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(output, "Enter URL: \nEnter account: ");
}

#[tokio::test]
async fn input_is_exactly_the_scripted_responses() {
    let script = Script::new([("first", "one"), ("second", "two\n"), ("third", "")]);
    let mut command = FakeCommand::with_timeout(script, Duration::from_secs(5));

    let mut input = String::new();
    for prompt in ["first? ", "second? ", "third? "] {
        command.print(prompt).await;
        let line = command.read_line().await.unwrap();
        input.push_str(&line);
        input.push('\n');
    }
    input.push_str(&command.read_rest().await);

    assert_eq!(input, "one\ntwo\n\n");
    let (result, _) = command.finish().await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn prompts_are_never_matched_out_of_order() {
    let script = Script::new([("A", "1"), ("B", "2")]);
    let mut command = FakeCommand::with_timeout(script, Duration::from_millis(200));

    command.print("B\n").await;
    command.print("A\n").await;

    assert_eq!(command.read_line().await.as_deref(), Some("1"));
    // "B" went by before "A" was answered, so the second entry never matches
    // and the engine gives up, closing stdin.
    assert_eq!(command.read_line().await, None);

    let (result, _) = command.finish().await;
    match result {
        Err(ConversationError::PromptTimeout { prompt, .. }) => assert_eq!(prompt, "B"),
        other => panic!("expected a timeout on B, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_prompt_times_out_within_bound() {
    let timeout = Duration::from_millis(150);
    let script = Script::new([("Never shown", "x")]);
    let started = Instant::now();
    let mut command = FakeCommand::with_timeout(script, timeout);

    command.print("Something else entirely\n").await;
    assert_eq!(command.read_line().await, None);
    let elapsed = started.elapsed();

    let (result, _) = command.finish().await;
    match result {
        Err(ConversationError::PromptTimeout { prompt, waited }) => {
            assert_eq!(prompt, "Never shown");
            assert_eq!(waited, timeout);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(elapsed >= timeout, "timed out early: {elapsed:?}");
    assert!(
        elapsed < timeout + Duration::from_secs(1),
        "timed out late: {elapsed:?}"
    );
}

#[tokio::test]
async fn finished_command_reports_remaining_entries() {
    let script = Script::new([("First", "1"), ("Second", "2"), ("Third", "3")]);
    let mut command = FakeCommand::with_timeout(script, Duration::from_secs(30));

    command.print("First: ").await;
    assert_eq!(command.read_line().await.as_deref(), Some("1"));

    let started = Instant::now();
    let (result, _) = command.finish().await;
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "engine waited for a prompt after the command finished"
    );

    match result {
        Err(ConversationError::ScriptUnsatisfied { remaining }) => {
            assert_eq!(
                remaining,
                vec![
                    PromptResponse::new("Second", "2"),
                    PromptResponse::new("Third", "3"),
                ]
            );
        }
        other => panic!("expected an unsatisfied script, got {other:?}"),
    }
}

#[test]
fn unsatisfied_error_lists_entries() {
    let error = ConversationError::ScriptUnsatisfied {
        remaining: vec![PromptResponse::new("Second", "2")],
    };
    let message = error.to_string();
    assert!(message.contains("Second"), "{message}");
}

#[tokio::test]
async fn empty_prompt_is_written_immediately() {
    let script = Script::new([PromptResponse::immediate("policy-body\n")]);
    let mut command = FakeCommand::with_timeout(script, Duration::from_secs(5));

    // No output at all: the response must not wait for any
    let input = command.read_rest().await;
    assert_eq!(input, "policy-body\n");

    let (result, _) = command.finish().await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn coloured_prompt_is_matched() {
    let script = Script::new([("Enter URL", "http://conjur.test")]);
    let mut command = FakeCommand::with_timeout(script, Duration::from_secs(5));

    command
        .print("\x1b[1;32m?\x1b[0m \x1b[1mEnter URL\x1b[0m: ")
        .await;
    assert_eq!(command.read_line().await.as_deref(), Some("http://conjur.test"));

    let (result, _) = command.finish().await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn prompt_split_across_writes_is_matched() {
    let script = Script::new([("Enter account", "myorg")]);
    let mut command = FakeCommand::with_timeout(script, Duration::from_secs(5));

    command.print("Enter ").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    command.print("account: ").await;
    assert_eq!(command.read_line().await.as_deref(), Some("myorg"));

    let (result, _) = command.finish().await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn script_loads_from_yaml() {
    let script = Script::from_yaml(
        "- prompt: Enter URL\n  response: https://example.com\n\
         - prompt: ''\n  response: body\n",
    )
    .unwrap();
    let mut command = FakeCommand::with_timeout(script, Duration::from_secs(5));

    command.print("Enter URL: ").await;
    let input = command.read_rest().await;
    assert_eq!(input, "https://example.com\nbody\n");

    let (result, _) = command.finish().await;
    assert!(result.is_ok(), "{result:?}");
}

#[tokio::test]
async fn closed_input_is_a_stream_error() {
    let script = Script::new([("Enter URL", "https://example.com")]);
    let FakeCommand {
        stdin,
        mut stdout,
        done: _done,
        conversation,
    } = FakeCommand::with_timeout(script, Duration::from_secs(5));

    // The command stopped reading before its prompt was answered
    drop(stdin);
    stdout.write_all(b"Enter URL: ").await.unwrap();
    stdout.flush().await.unwrap();

    match conversation.wait().await {
        Err(ConversationError::Stream(_)) => {}
        other => panic!("expected a stream error, got {other:?}"),
    }
}

#[tokio::test]
async fn done_before_deadline_is_not_a_timeout() {
    let (stdin_writer, _stdin_reader) = tokio::io::duplex(1024);
    let (_stdout, tap) = tee(Vec::<u8>::new());
    let (done, done_rx) = oneshot::channel();
    done.send(()).unwrap();

    let settings = ConversationSettings::default().prompt_timeout(Duration::ZERO);
    let result = Conversation::new(Script::new([("Never shown", "x")]))
        .with_settings(settings)
        .spawn(tap, stdin_writer, done_rx)
        .wait()
        .await;

    match result {
        Err(ConversationError::ScriptUnsatisfied { remaining }) => {
            assert_eq!(remaining, vec![PromptResponse::new("Never shown", "x")]);
        }
        other => panic!("expected an unsatisfied script, got {other:?}"),
    }
}

#[tokio::test]
async fn zero_poll_interval_is_usable() {
    let settings = ConversationSettings::default()
        .prompt_timeout(Duration::from_secs(5))
        .poll_interval(Duration::ZERO);
    let mut command = FakeCommand::start(Script::new([("A", "1")]), settings);

    command.print("A\n").await;
    assert_eq!(command.read_line().await.as_deref(), Some("1"));

    let (result, _) = command.finish().await;
    assert!(result.is_ok(), "{result:?}");
}
