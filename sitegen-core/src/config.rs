use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://").expect("static regex is valid")
});

/// Contents of `site.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: PathBuf::from(path),
            source,
        })?;

        Self::parse(&data)
    }

    /// Parse and validate a configuration document.
    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(data)?;
        config.site.validate()?;

        Ok(config)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Base url of the published site, e.g. `https://example.com`.
    pub url: String,
    pub title: String,
    /// Used as the author of every feed item.
    pub author: String,
    /// Feed language, e.g. `en-US`.
    pub locale: String,
}

impl SiteConfig {
    pub fn new(url: &str, title: &str, author: &str, locale: &str) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            locale: locale.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("site.url", &self.url),
            ("site.title", &self.title),
            ("site.author", &self.author),
            ("site.locale", &self.locale),
        ];
        for (key, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("`{key}` must not be empty")));
            }
        }

        if !URL_SCHEME.is_match(&self.url) {
            return Err(ConfigError::Validation(format!(
                "`site.url` must start with http:// or https://, got `{}`",
                self.url
            )));
        }

        Ok(())
    }

    /// The site url without a trailing slash, ready for appending web paths.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn url_for(&self, web_path: &str) -> String {
        format!("{}{}", self.base_url(), web_path)
    }
}
