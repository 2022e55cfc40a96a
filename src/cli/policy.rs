//! `conjur policy`

use std::path::Path;

use crate::client::PolicyMode;
use crate::commands::{PolicyArgs, PolicyCommands};
use crate::common::{Error, Result};

use super::{print_json, CommandIo, Context};

pub(super) async fn run(
    command: PolicyCommands,
    io: &mut CommandIo<'_>,
    ctx: &Context,
) -> Result<()> {
    let (mode, args) = match command {
        PolicyCommands::Load(args) => (PolicyMode::Load, args),
        PolicyCommands::Replace(args) => (PolicyMode::Replace, args),
        PolicyCommands::Update(args) => (PolicyMode::Update, args),
    };
    let PolicyArgs { branch, file } = args;

    let client = ctx.connect().await?;
    let policy = read_policy(&file, io).await?;
    tracing::debug!(?mode, branch = %branch, bytes = policy.len(), "applying policy");

    let response = client.load_policy(mode, &branch, policy).await?;
    print_json(io, &response).await
}

/// Read the policy document; `-` means stdin
async fn read_policy(file: &Path, io: &mut CommandIo<'_>) -> Result<String> {
    if file == Path::new("-") {
        return io.read_to_string().await;
    }
    tokio::fs::read_to_string(file)
        .await
        .map_err(|e| Error::file_read(file, e))
}
