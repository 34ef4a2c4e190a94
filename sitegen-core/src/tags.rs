use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tera::Context;
use tracing::warn;

use crate::config::SiteConfig;
use crate::document::{ContentDocument, DocumentView};
use crate::error::{ContentError, RenderError, TemplateError};
use crate::render::{PageContent, Renderable, SiteInfo, listing_context, write_page};
use crate::section::{sort_by_date, views};
use crate::template::{TemplateResolver, resolve_first};

const TAG_SECTION: &str = "tag";

/// Every document carrying one tag, in insertion order.
#[derive(Debug)]
pub struct Tag {
    tag: String,
    documents: Vec<Arc<ContentDocument>>,
}

#[derive(Debug, Serialize)]
pub struct TagView<'a> {
    pub tag: &'a str,
    pub web_path: String,
    pub date: Option<NaiveDateTime>,
    pub count: usize,
    pub items: Vec<DocumentView<'a>>,
}

impl Tag {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        let tag = tag.into();
        assert!(!tag.is_empty(), "tag must not be empty");
        Self {
            tag,
            documents: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn documents(&self) -> &[Arc<ContentDocument>] {
        &self.documents
    }

    pub fn add(&mut self, document: Arc<ContentDocument>) {
        self.documents.push(document);
    }

    pub fn web_path(&self) -> String {
        format!("/{TAG_SECTION}/{}", self.tag)
    }

    /// Latest date among non-draft documents, or among all documents when
    /// every one of them is a draft.
    pub fn publish_date(&self) -> Result<Option<NaiveDateTime>, ContentError> {
        let mut published = None;
        let mut any = None;
        for document in &self.documents {
            let date = Some(document.publish_date()?);
            any = any.max(date);
            if !document.is_draft()? {
                published = published.max(date);
            }
        }
        Ok(published.or(any))
    }

    pub fn view(&self) -> Result<TagView<'_>, ContentError> {
        Ok(TagView {
            tag: &self.tag,
            web_path: self.web_path(),
            date: self.publish_date()?,
            count: self.documents.len(),
            items: views(&sort_by_date(&self.documents)?)?,
        })
    }
}

impl Renderable for Tag {
    fn build_context(&self, site: &SiteConfig) -> Result<Context, RenderError> {
        let sorted = sort_by_date(&self.documents)?;
        let page = PageContent {
            title: self.tag.clone(),
            description: String::new(),
            canonical_url: site.url_for(&self.web_path()),
            date: self.publish_date()?,
        };

        let mut context = listing_context(&views(&sorted)?, &page, &SiteInfo::new(site, TAG_SECTION));
        context.insert("tag", &self.tag);
        Ok(context)
    }

    fn resolve_template(&self, templates: &dyn TemplateResolver) -> Result<String, TemplateError> {
        resolve_first(templates, &["tag.html", "list.html"])
    }

    fn output_directory(&self, root: &Path) -> Result<PathBuf, RenderError> {
        Ok(root.join(TAG_SECTION).join(&self.tag))
    }
}

fn is_path_safe(tag: &str) -> bool {
    !tag.contains(['/', '\\']) && tag != "." && tag != ".."
}

/// All tags of the site, listed alphabetically.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: BTreeMap<String, Tag>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the document under each of its tags. Tags that cannot be a
    /// single directory below `tag/` are skipped.
    pub fn add(&mut self, document: &Arc<ContentDocument>) -> Result<(), ContentError> {
        for tag in document.tags()? {
            if !is_path_safe(&tag) {
                warn!(tag = %tag, path = %document.source_path().display(), "skipping tag that is not a plain path segment");
                continue;
            }
            self.tags
                .entry(tag.clone())
                .or_insert_with(|| Tag::new(tag))
                .add(Arc::clone(document));
        }
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&Tag> {
        self.tags.get(tag)
    }

    /// Tags sorted by tag string.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn publish_date(&self) -> Result<Option<NaiveDateTime>, ContentError> {
        let mut latest = None;
        for tag in self.tags() {
            latest = latest.max(tag.publish_date()?);
        }
        Ok(latest)
    }
}

impl Renderable for TagIndex {
    fn build_context(&self, site: &SiteConfig) -> Result<Context, RenderError> {
        let items = self.tags().map(Tag::view).collect::<Result<Vec<_>, _>>()?;
        let page = PageContent {
            title: "Tags".to_string(),
            description: String::new(),
            canonical_url: site.url_for(&format!("/{TAG_SECTION}/")),
            date: self.publish_date()?,
        };

        Ok(listing_context(&items, &page, &SiteInfo::new(site, TAG_SECTION)))
    }

    fn resolve_template(&self, templates: &dyn TemplateResolver) -> Result<String, TemplateError> {
        resolve_first(templates, &["tags.html", "list.html"])
    }

    fn output_directory(&self, root: &Path) -> Result<PathBuf, RenderError> {
        Ok(root.join(TAG_SECTION))
    }

    /// Writes every tag page, then the index. Nothing at all without tags.
    fn render(
        &self,
        site: &SiteConfig,
        templates: &dyn TemplateResolver,
        root: &Path,
    ) -> Result<Vec<PathBuf>, RenderError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let mut written = Vec::with_capacity(self.len() + 1);
        for tag in self.tags() {
            written.extend(tag.render(site, templates, root)?);
        }
        written.push(write_page(self, site, templates, root)?);
        Ok(written)
    }
}
