//! CLI command definitions
//!
//! Defines the clap command tree for the Conjur CLI. The tree is a plain
//! value built by the parser; collaborators are supplied separately when a
//! command is dispatched.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "conjur", about = "Command-line client for Conjur")]
#[command(version, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the CLI with a Conjur endpoint
    ///
    /// Writes a profile (.conjurrc) with the details for connecting to
    /// Conjur and, for HTTPS endpoints, the server's certificate.
    Init(InitArgs),

    /// Log in and store an API key
    Login {
        /// Login name (user or host/<id>)
        #[arg(long, short = 'i')]
        id: Option<String>,

        /// Password or API key
        #[arg(long, short = 'p')]
        password: Option<String>,
    },

    /// Remove stored credentials
    Logout,

    /// Show the authenticated identity
    Whoami,

    /// Variable operations
    #[command(subcommand)]
    Variable(VariableCommands),

    /// Host operations
    #[command(subcommand)]
    Host(HostCommands),

    /// Manage host factories
    #[command(subcommand, name = "hostfactory")]
    HostFactory(HostFactoryCommands),

    /// Policy operations
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Check whether a role holds a privilege on a resource
    Check {
        /// Resource id ([account:]kind:identifier)
        resource_id: String,

        /// Privilege to check (e.g. read, execute, update)
        privilege: String,

        /// Role to check for (default: the logged in identity)
        #[arg(long, short = 'r')]
        role: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Conjur organization account name
    #[arg(long, short = 'a')]
    pub account: Option<String>,

    /// URL of the Conjur service
    #[arg(long, short = 'u')]
    pub url: Option<String>,

    /// Conjur SSL certificate (obtained from the server unless provided)
    #[arg(long, short = 'c')]
    pub certificate: Option<PathBuf>,

    /// File to write the configuration to [default: ~/.conjurrc]
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// File to write the server's certificate to [default: ~/conjur-server.pem]
    #[arg(long)]
    pub cert_file: Option<PathBuf>,

    /// Authentication type to use
    #[arg(long, short = 't')]
    pub authn_type: Option<String>,

    /// Service ID if using an alternative authentication type
    #[arg(long)]
    pub service_id: Option<String>,

    /// Allow self-signed certificates (insecure)
    #[arg(long, short = 's')]
    pub self_signed: bool,

    /// Overwrite existing files without asking
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum VariableCommands {
    /// Print a secret value
    Get {
        /// Variable identifier
        #[arg(long, short = 'i')]
        id: String,
    },

    /// Store a secret value
    Set {
        /// Variable identifier
        #[arg(long, short = 'i')]
        id: String,

        /// New value
        #[arg(long, short = 'v')]
        value: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HostCommands {
    /// Rotate a host's API key
    RotateApiKey {
        /// Host identifier
        #[arg(long)]
        host: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HostFactoryCommands {
    /// Operations on tokens
    #[command(subcommand)]
    Tokens(TokenCommands),

    /// Commands for managing host factory hosts
    #[command(subcommand)]
    Hosts(HostsCommands),
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Create one or more tokens
    ///
    /// Each token can be used to create hosts with 'hostfactory hosts
    /// create'. Valid time units are "ns", "us" (or "µs"), "ms", "s", "m", "h".
    Create {
        /// Duration in which the token will expire
        #[arg(long, default_value = "10m")]
        duration: String,

        /// Fully qualified host factory id
        #[arg(long)]
        host_factory_id: String,

        /// Comma-delimited list of CIDR addresses to restrict the token to
        #[arg(long, short = 'c', value_delimiter = ',', default_value = "0.0.0.0/0")]
        cidr: Vec<String>,

        /// Number of tokens to create
        #[arg(long, short = 'n', default_value = "1")]
        count: u32,
    },

    /// Revoke (delete) a token
    Revoke {
        /// The token to revoke
        #[arg(long, short = 't')]
        token: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HostsCommands {
    /// Use a token to create a host
    Create {
        /// Host factory token
        #[arg(long, short = 't')]
        token: String,

        /// Host identifier
        #[arg(long, short = 'i')]
        id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PolicyArgs {
    /// Policy branch to apply the document to
    #[arg(long, short = 'b')]
    pub branch: String,

    /// Policy file, or '-' to read from stdin
    #[arg(long, short = 'f')]
    pub file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommands {
    /// Add the records in a policy document to a branch
    Load(PolicyArgs),

    /// Replace a branch with a policy document
    Replace(PolicyArgs),

    /// Apply additions and deletions from a policy document
    Update(PolicyArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cidr_list_is_split() {
        let cli = Cli::try_parse_from([
            "conjur",
            "hostfactory",
            "tokens",
            "create",
            "--host-factory-id",
            "hf",
            "--cidr",
            "10.0.0.0/8,192.168.1.1",
        ])
        .unwrap();

        match cli.command {
            Commands::HostFactory(HostFactoryCommands::Tokens(TokenCommands::Create {
                cidr,
                duration,
                count,
                ..
            })) => {
                assert_eq!(cidr, vec!["10.0.0.0/8", "192.168.1.1"]);
                assert_eq!(duration, "10m");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn debug_flag_is_global() {
        let cli = Cli::try_parse_from(["conjur", "whoami", "--debug"]).unwrap();
        assert!(cli.debug);
    }
}
