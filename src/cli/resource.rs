//! `conjur check`

use crate::common::Result;

use super::{CommandIo, Context};

pub(super) async fn check(
    resource_id: &str,
    privilege: &str,
    role: Option<&str>,
    io: &mut CommandIo<'_>,
    ctx: &Context,
) -> Result<()> {
    let client = ctx.connect().await?;
    let allowed = client
        .check_permission(resource_id, privilege, role)
        .await?;
    io.println(if allowed { "true" } else { "false" }).await
}
