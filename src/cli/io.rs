//! Command streams
//!
//! Commands never touch the process's stdio directly. They read and write
//! through a [`CommandIo`], which the binary binds to the real terminal and
//! the test harness binds to in-memory pipes.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Result;

/// The three standard streams of a running command
pub struct CommandIo<'a> {
    pub stdin: &'a mut (dyn AsyncBufRead + Unpin + Send),
    pub stdout: &'a mut (dyn AsyncWrite + Unpin + Send),
    pub stderr: &'a mut (dyn AsyncWrite + Unpin + Send),
}

impl<'a> CommandIo<'a> {
    pub fn new(
        stdin: &'a mut (dyn AsyncBufRead + Unpin + Send),
        stdout: &'a mut (dyn AsyncWrite + Unpin + Send),
        stderr: &'a mut (dyn AsyncWrite + Unpin + Send),
    ) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }

    /// Write text to stdout and flush it
    pub async fn print(&mut self, text: &str) -> Result<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await?;
        Ok(())
    }

    /// Write a line to stdout
    pub async fn println(&mut self, text: &str) -> Result<()> {
        self.print(&format!("{text}\n")).await
    }

    /// Write text to stderr and flush it
    pub async fn eprint(&mut self, text: &str) -> Result<()> {
        self.stderr.write_all(text.as_bytes()).await?;
        self.stderr.flush().await?;
        Ok(())
    }

    /// Write a line to stderr
    pub async fn eprintln(&mut self, text: &str) -> Result<()> {
        self.eprint(&format!("{text}\n")).await
    }

    /// Read one line of input without its terminator; `None` at end of input
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.stdin.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Read all remaining input
    pub async fn read_to_string(&mut self) -> Result<String> {
        let mut content = String::new();
        self.stdin.read_to_string(&mut content).await?;
        Ok(content)
    }
}
