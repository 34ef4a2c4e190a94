use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;

fn cli() -> Command {
    Command::new("sitegen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Static site generator for markdown content")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log progress at info level"),
        )
        .subcommand(cmd::generate::make_subcommand())
        .subcommand(cmd::watch::make_subcommand())
}

/// `--verbose` forces info, otherwise `RUST_LOG` decides and defaults to warn.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("generate", args)) => cmd::generate::execute(args),
        Some(("watch", args)) => cmd::watch::execute(args).await,
        _ => unreachable!("subcommand is required"),
    }
}
