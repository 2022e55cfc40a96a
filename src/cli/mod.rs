//! CLI command handling
//!
//! Dispatches parsed commands to their handlers. Handlers write through a
//! [`CommandIo`] and reach the service through the [`Connector`] held in the
//! [`Context`], so the same code runs against a terminal and in the test
//! harness.

mod hostfactory;
mod init;
pub mod io;
mod login;
mod policy;
pub mod prompts;
mod resource;
mod variable;

pub use io::CommandIo;

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::client::{ConjurApi, Connector, HttpConnector};
use crate::commands::{Cli, Commands, HostCommands};
use crate::common::config::Settings;
use crate::common::netrc::{Credentials, Netrc};
use crate::common::profile::Profile;
use crate::common::{paths, Error, Result};

/// Everything a command needs besides its arguments and streams
#[derive(Clone)]
pub struct Context {
    /// Profile file read by service commands and written by `init`
    pub conjurrc_path: PathBuf,
    /// Where `init` writes a fetched server certificate
    pub cert_path: PathBuf,
    /// Credentials file
    pub netrc_path: PathBuf,
    pub connector: Arc<dyn Connector>,
    /// Whether `CONJUR_*` environment variables override files
    pub use_env: bool,
}

impl Context {
    /// A context with explicit paths that ignores the environment
    pub fn new(
        conjurrc_path: impl Into<PathBuf>,
        cert_path: impl Into<PathBuf>,
        netrc_path: impl Into<PathBuf>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            conjurrc_path: conjurrc_path.into(),
            cert_path: cert_path.into(),
            netrc_path: netrc_path.into(),
            connector,
            use_env: false,
        }
    }

    /// The context of a real invocation: default paths, environment
    /// overrides and the HTTP client
    pub fn from_environment(settings: &Settings) -> Self {
        Self {
            conjurrc_path: paths::default_conjurrc_path(),
            cert_path: paths::default_cert_path(),
            netrc_path: paths::netrc_path(),
            connector: Arc::new(HttpConnector::new(&settings.http)),
            use_env: true,
        }
    }

    fn env(&self, name: &str) -> Option<String> {
        if self.use_env {
            std::env::var(name).ok()
        } else {
            None
        }
    }

    /// Load and validate the profile
    pub fn load_profile(&self) -> Result<Profile> {
        let mut profile = Profile::read(&self.conjurrc_path)?;
        profile.apply_env(|name| self.env(name));
        profile.validate()?;
        Ok(profile)
    }

    /// Credentials for the profile, from the environment or the netrc file
    pub fn credentials(&self, profile: &Profile) -> Result<Credentials> {
        if let Some(credentials) = Credentials::from_env(|name| self.env(name)) {
            tracing::debug!("Using credentials from the environment");
            return Ok(credentials);
        }
        Netrc::load(&self.netrc_path)?
            .get(&profile.authn_machine())
            .ok_or(Error::NotLoggedIn)
    }

    /// Open an authenticated client
    pub async fn connect(&self) -> Result<Box<dyn ConjurApi>> {
        let profile = self.load_profile()?;
        let credentials = self.credentials(&profile)?;
        self.connector.connect(&profile, Some(credentials)).await
    }

    /// Open a client without credentials
    pub async fn connect_anonymous(&self) -> Result<(Profile, Box<dyn ConjurApi>)> {
        let profile = self.load_profile()?;
        let client = self.connector.connect(&profile, None).await?;
        Ok((profile, client))
    }
}

/// Parse `args` (including the program name) and run the command
///
/// Help and version output go to stdout and count as success; other parse
/// failures are written to stderr.
pub async fn execute<I, T>(args: I, io: &mut CommandIo<'_>, ctx: &Context) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let rendered = e.render().to_string();
            if !e.use_stderr() {
                io.print(&rendered).await?;
                return Ok(());
            }
            io.eprint(&rendered).await?;
            let summary = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            return Err(Error::InvalidArgument(summary));
        }
    };

    dispatch(cli.command, io, ctx).await
}

/// Run a parsed command
pub async fn dispatch(command: Commands, io: &mut CommandIo<'_>, ctx: &Context) -> Result<()> {
    match command {
        Commands::Init(args) => init::run(args, io, ctx).await,

        Commands::Login { id, password } => login::login(id, password, io, ctx).await,
        Commands::Logout => login::logout(io, ctx).await,
        Commands::Whoami => login::whoami(io, ctx).await,

        Commands::Variable(command) => variable::run(command, io, ctx).await,

        Commands::Host(HostCommands::RotateApiKey { host }) => {
            let client = ctx.connect().await?;
            let api_key = client.rotate_host_api_key(&host).await?;
            io.println(api_key.trim_end()).await
        }

        Commands::HostFactory(command) => hostfactory::run(command, io, ctx).await,

        Commands::Policy(command) => policy::run(command, io, ctx).await,

        Commands::Check {
            resource_id,
            privilege,
            role,
        } => resource::check(&resource_id, &privilege, role.as_deref(), io, ctx).await,
    }
}

/// Print a value as indented JSON
async fn print_json<T: serde::Serialize>(io: &mut CommandIo<'_>, value: &T) -> Result<()> {
    io.println(&serde_json::to_string_pretty(value)?).await
}
