use anyhow::Result;
use clap::{Arg, ArgMatches, Command, value_parser};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use sitegen_dev_server::{StaticServer, StaticServerConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use super::{add_build_args, generate};
use crate::config::SitegenConfig;

const DEBOUNCE: Duration = Duration::from_millis(500);
const LOCK_FILE_PREFIX: &str = ".#";

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("watch"))
        .about("Generate the site, regenerate on changes and serve the output")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Port to serve on [default: 8000]"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to [default: 127.0.0.1]"),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = SitegenConfig::load(args)?;
    let build = config.build_config();

    regenerate(config.clone()).await;

    let output_dir = build.output_dir();
    std::fs::create_dir_all(&output_dir)?;
    let server = StaticServer::new(StaticServerConfig {
        host: build.host.clone(),
        port: build.port,
        root: output_dir,
    });
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(error = %e, "server error");
        }
    });

    let args = args.clone();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_sources(args, config).await {
            error!(error = %e, "source watcher error");
        }
    });

    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

/// Generate on the blocking pool and log the outcome. Failures never stop
/// the watcher.
async fn regenerate(config: SitegenConfig) {
    match tokio::task::spawn_blocking(move || generate::run(&config)).await {
        Ok(Ok(report)) => info!(pages = report.written.len(), "site regenerated"),
        Ok(Err(e)) => error!(error = %format!("{e:#}"), "generation failed"),
        Err(e) => error!(error = %e, "generation task panicked"),
    }
}

/// Emacs and friends create `.#name` lock files next to the file being edited.
fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with(LOCK_FILE_PREFIX))
}

async fn watch_sources(args: ArgMatches, mut config: SitegenConfig) -> Result<()> {
    let build = config.build_config();
    let content_dir = build.content_dir();
    let templates_dir = build.templates_dir();
    let config_file = build.config_file();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<PathBuf>>(16);

    let mut debouncer = new_debouncer(DEBOUNCE, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let paths: Vec<_> = events
                .into_iter()
                .map(|event| event.path)
                .filter(|path| !is_lock_file(path))
                .collect();
            if !paths.is_empty() {
                let _ = tx.blocking_send(paths);
            }
        }
        Err(e) => warn!(error = %e, "watch error"),
    })?;

    debouncer
        .watcher()
        .watch(&content_dir, notify::RecursiveMode::Recursive)?;
    info!(path = %content_dir.display(), "watching content");

    if templates_dir.exists() {
        debouncer
            .watcher()
            .watch(&templates_dir, notify::RecursiveMode::Recursive)?;
        info!(path = %templates_dir.display(), "watching templates");
    }

    if config_file.exists() {
        debouncer
            .watcher()
            .watch(&config_file, notify::RecursiveMode::NonRecursive)?;
        info!(path = %config_file.display(), "watching config file");
    }

    // One batch at a time: the next batch waits until this run has finished.
    while let Some(paths) = rx.recv().await {
        for path in &paths {
            info!(path = %path.display(), "source changed");
        }

        match SitegenConfig::load(&args) {
            Ok(reloaded) => config = reloaded,
            Err(e) => warn!(error = %format!("{e:#}"), "keeping previous configuration"),
        }
        regenerate(config.clone()).await;
    }

    Ok(())
}
