use anyhow::{Context, Result};
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use sitegen_core::{FailurePolicy, RenderPolicy};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_CONFIG_FILE: &str = "./site.toml";

/// Complete configuration that merges CLI args, env vars, config file, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SitegenConfig {
    /// Paths and generation options
    pub build: BuildConfig,
    /// Site metadata (the `[site]` table of the config file)
    #[serde(flatten)]
    pub site: sitegen_core::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Directory containing the markdown content
    pub content: String,
    /// Template directory
    pub templates: String,
    /// Output directory for the generated site
    pub output: String,
    /// Configuration file path
    pub config: String,
    /// Host for the watch server
    pub host: String,
    /// Port for the watch server
    pub port: u16,
    /// What to do when a page fails to render
    pub on_error: FailurePolicy,
    /// Render documents in parallel
    pub parallel: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content: "./content".to_string(),
            templates: "./templates".to_string(),
            output: "./public".to_string(),
            config: DEFAULT_CONFIG_FILE.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            on_error: FailurePolicy::Abort,
            parallel: false,
        }
    }
}

impl BuildConfig {
    pub fn content_dir(&self) -> PathBuf {
        PathBuf::from(&self.content)
    }

    pub fn templates_dir(&self) -> PathBuf {
        PathBuf::from(&self.templates)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }

    pub fn config_file(&self) -> PathBuf {
        PathBuf::from(&self.config)
    }

    pub fn render_policy(&self) -> RenderPolicy {
        RenderPolicy {
            on_error: self.on_error,
            parallel: self.parallel,
        }
    }
}

impl SitegenConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (SITEGEN_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    ///
    /// The merged `[site]` table is validated before returning.
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .ok()
            .flatten()
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = ConfigBuilder::builder().add_source(ConfigBuilder::try_from(&Self::default())?);

        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::new(&config_file, FileFormat::Toml));
        } else {
            warn!(path = %config_file, "config file not found, relying on environment and defaults");
        }

        builder = builder.add_source(
            Environment::with_prefix("SITEGEN")
                .prefix_separator("_")
                .separator("__"),
        );

        let overrides = cli_overrides(args);
        if !overrides.is_empty() {
            builder = builder.add_source(ConfigBuilder::try_from(&overrides)?);
        }

        let config: SitegenConfig = builder
            .build()?
            .try_deserialize()
            .context("Invalid configuration")?;
        config
            .site
            .site
            .validate()
            .with_context(|| format!("Invalid site configuration in `{config_file}`"))?;

        debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn site_config(&self) -> &sitegen_core::SiteConfig {
        &self.site.site
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}

/// Only arguments defined for the running subcommand and given on the
/// command line end up here.
fn cli_overrides(args: &ArgMatches) -> HashMap<String, String> {
    let mut overrides = HashMap::new();

    for key in ["content", "templates", "output", "config", "host", "on_error"] {
        if let Some(value) = args.try_get_one::<String>(key).ok().flatten() {
            overrides.insert(format!("build.{key}"), value.clone());
        }
    }
    if let Some(port) = args.try_get_one::<u16>("port").ok().flatten() {
        overrides.insert("build.port".to_string(), port.to_string());
    }
    if args.try_get_one::<bool>("parallel").ok().flatten() == Some(&true) {
        overrides.insert("build.parallel".to_string(), "true".to_string());
    }

    overrides
}
