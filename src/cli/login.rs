//! `conjur login`, `logout` and `whoami`

use crate::common::netrc::{Credentials, Netrc};
use crate::common::{Error, Result};

use super::{print_json, prompts, CommandIo, Context};

pub(super) async fn login(
    id: Option<String>,
    password: Option<String>,
    io: &mut CommandIo<'_>,
    ctx: &Context,
) -> Result<()> {
    let (profile, client) = ctx.connect_anonymous().await?;

    let login = match id.filter(|v| !v.is_empty()) {
        Some(login) => login,
        None => {
            prompts::ask_required(io, "Enter your username to log into Conjur", "Username")
                .await?
        }
    };
    let password = match password.filter(|v| !v.is_empty()) {
        Some(password) => password,
        None => {
            prompts::ask_required(io, "Enter your password or API key", "Password").await?
        }
    };

    let api_key = client.login(&login, &password).await?;

    let mut netrc = Netrc::load(&ctx.netrc_path)?;
    netrc.set(
        &profile.authn_machine(),
        &Credentials::new(login.as_str(), api_key.trim()),
    );
    netrc.save(&ctx.netrc_path)?;
    tracing::debug!(login = %login, path = %ctx.netrc_path.display(), "stored credentials");

    io.println("Logged in").await
}

pub(super) async fn logout(io: &mut CommandIo<'_>, ctx: &Context) -> Result<()> {
    let profile = ctx.load_profile()?;
    let mut netrc = Netrc::load(&ctx.netrc_path)?;
    if !netrc.remove(&profile.authn_machine()) {
        return Err(Error::NotLoggedIn);
    }
    netrc.save(&ctx.netrc_path)?;
    io.println("Logged out").await
}

pub(super) async fn whoami(io: &mut CommandIo<'_>, ctx: &Context) -> Result<()> {
    let client = ctx.connect().await?;
    let identity = client.whoami().await?;
    print_json(io, &identity).await
}
