//! `conjur variable`

use crate::commands::VariableCommands;
use crate::common::Result;

use super::{CommandIo, Context};

pub(super) async fn run(
    command: VariableCommands,
    io: &mut CommandIo<'_>,
    ctx: &Context,
) -> Result<()> {
    let client = ctx.connect().await?;

    match command {
        VariableCommands::Get { id } => {
            let value = client.retrieve_secret(&id).await?;
            io.println(&String::from_utf8_lossy(&value)).await
        }
        VariableCommands::Set { id, value } => {
            client.add_secret(&id, &value).await?;
            io.println("Value added").await
        }
    }
}
