//! Error types for every stage of site generation.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or interpret a content file.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error when reading `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing content file `{}`, invalid date format: {value}", path.display())]
    InvalidDate { path: PathBuf, value: String },
}

#[derive(Debug, Error)]
pub enum TemplateError {
    /// Every candidate in a fallback chain was missing.
    #[error("Template not found, tried: {}", tried.join(", "))]
    NotFound { tried: Vec<String> },

    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("IO error when writing `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file parsing error: {0}")]
    Parsing(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top level error of a generation run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Content directory `{}` does not exist", .0.display())]
    MissingContentDir(PathBuf),

    #[error("Scan error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} page(s) failed to render")]
    PageFailures(usize),
}
