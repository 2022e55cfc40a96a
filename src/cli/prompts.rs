//! Interactive prompts
//!
//! Prompts are written to the command's stdout and answered on its stdin, so
//! they work the same against a terminal and against scripted input. Input is
//! not echoed back by a pipe, so each answer is followed by a newline on
//! stdout to keep one prompt per line.

use colored::Colorize;

use crate::common::{Error, Result};

use super::io::CommandIo;

/// Validation applied to a prompt answer; `Err` holds the message shown
/// before asking again
pub type Validator<'v> = &'v dyn Fn(&str) -> std::result::Result<(), String>;

fn prompt_line(label: &str, suffix: &str) -> String {
    format!("{} {}{}: ", "?".green().bold(), label.bold(), suffix)
}

/// Ask for a line of text, re-asking until `validate` accepts it
pub async fn ask(io: &mut CommandIo<'_>, label: &str, validate: Validator<'_>) -> Result<String> {
    loop {
        io.print(&prompt_line(label, "")).await?;
        let Some(answer) = io.read_line().await? else {
            io.print("\n").await?;
            return Err(Error::PromptAborted(label.to_string()));
        };
        io.print("\n").await?;

        let answer = answer.trim().to_string();
        match validate(&answer) {
            Ok(()) => return Ok(answer),
            Err(message) => {
                tracing::debug!(label, "rejected prompt answer: {}", message);
                io.println(&format!("{} {}", "✗".red(), message)).await?;
            }
        }
    }
}

/// Ask for a required value
pub async fn ask_required(io: &mut CommandIo<'_>, label: &str, name: &str) -> Result<String> {
    let message = format!("{name} is required");
    ask(io, label, &|answer: &str| {
        if answer.is_empty() {
            Err(message.clone())
        } else {
            Ok(())
        }
    })
    .await
}

/// Ask a yes/no question; anything other than `y`/`yes` is a no
pub async fn confirm(io: &mut CommandIo<'_>, label: &str) -> Result<bool> {
    io.print(&prompt_line(label, " [y/N]")).await?;
    let Some(answer) = io.read_line().await? else {
        io.print("\n").await?;
        return Err(Error::PromptAborted(label.to_string()));
    };
    io.print("\n").await?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
