use anyhow::Result;
use clap::{ArgMatches, Command};
use sitegen_core::{RenderReport, generate_site};
use tracing::info;

use super::add_build_args;
use crate::config::SitegenConfig;

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("generate")).about("Generate the static site from markdown content")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = SitegenConfig::load(args)?;
    let report = run(&config)?;

    info!(pages = report.written.len(), "done");
    println!(
        "Site generated in {} ({} files)",
        config.build_config().output,
        report.written.len()
    );

    Ok(())
}

/// One generation run with the given configuration.
pub fn run(config: &SitegenConfig) -> Result<RenderReport> {
    let build = config.build_config();
    let report = generate_site(
        config.site_config(),
        &build.content_dir(),
        &build.templates_dir(),
        &build.output_dir(),
        build.render_policy(),
    )?;

    Ok(report)
}
