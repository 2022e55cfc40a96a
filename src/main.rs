//! Conjur CLI - a command-line client for the Conjur secrets service

use clap::Parser;
use conjur::cli::{self, CommandIo, Context};
use conjur::commands::Cli;
use conjur::common::{config::Settings, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> conjur::Result<()> {
    let settings = Settings::load()?;
    let ctx = Context::from_environment(&settings);

    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    let mut io = CommandIo::new(&mut stdin, &mut stdout, &mut stderr);

    cli::dispatch(cli.command, &mut io, &ctx).await
}
