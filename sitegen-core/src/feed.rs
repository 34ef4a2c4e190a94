//! RSS 2.0 feed of every published document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use tracing::debug;

use crate::config::SiteConfig;
use crate::document::ContentDocument;
use crate::error::{ContentError, RenderError};
use crate::section::sort_by_date;

pub const FEED_FILENAME: &str = "rss.xml";

/// Collects documents in discovery order and writes `rss.xml`.
#[derive(Debug, Default)]
pub struct FeedBuilder {
    documents: Vec<Arc<ContentDocument>>,
}

impl FeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, document: Arc<ContentDocument>) {
        self.documents.push(document);
    }

    pub fn documents(&self) -> &[Arc<ContentDocument>] {
        &self.documents
    }

    /// Feed items newest first. The site index page is never an item.
    pub fn items(&self, site: &SiteConfig) -> Result<Vec<Item>, ContentError> {
        sort_by_date(&self.documents)?
            .into_iter()
            .filter(|(_, document)| document.web_path() != "/")
            .map(|(date, document)| to_item(document, date, site))
            .collect()
    }

    pub fn generate_feed(&self, site: &SiteConfig) -> Result<String, RenderError> {
        let channel = ChannelBuilder::default()
            .title(format!("{} RSS Feed", site.title))
            .link(site.url_for(&format!("/{FEED_FILENAME}")))
            .description(format!("RSS Feed for {}", site.title))
            .language(site.locale.clone())
            .last_build_date(Utc::now().to_rfc2822())
            .items(self.items(site)?)
            .build();

        Ok(channel.to_string())
    }

    pub fn render(&self, site: &SiteConfig, root: &Path) -> Result<PathBuf, RenderError> {
        let xml = self.generate_feed(site)?;
        std::fs::create_dir_all(root).map_err(|source| RenderError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let path = root.join(FEED_FILENAME);
        std::fs::write(&path, xml).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "wrote feed");
        Ok(path)
    }
}

fn to_item(
    document: &ContentDocument,
    date: NaiveDateTime,
    site: &SiteConfig,
) -> Result<Item, ContentError> {
    let link = document.canonical_url(site);

    Ok(ItemBuilder::default()
        .title(document.title()?.to_string())
        .link(link.clone())
        .description(document.description()?.to_string())
        .author(site.author.clone())
        .guid(GuidBuilder::default().permalink(true).value(link).build())
        .pub_date(date.and_utc().to_rfc2822())
        .build())
}
