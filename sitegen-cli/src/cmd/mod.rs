use clap::{Arg, ArgAction, Command};

pub mod generate;
pub mod watch;

/// Arguments shared by every command that generates the site. No defaults
/// here, so unset flags fall through to env vars and the config file.
pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("content")
                .short('i')
                .long("content")
                .value_name("DIR")
                .help("Directory containing markdown content [default: ./content]"),
        )
        .arg(
            Arg::new("templates")
                .short('t')
                .long("templates")
                .value_name("DIR")
                .help("Template directory [default: ./templates]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for the generated site [default: ./public]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./site.toml]"),
        )
        .arg(
            Arg::new("on_error")
                .long("on-error")
                .value_name("POLICY")
                .value_parser(["abort", "continue"])
                .help("Stop at the first page that fails to render, or render the rest and report"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .action(ArgAction::SetTrue)
                .help("Render documents in parallel"),
        )
}
