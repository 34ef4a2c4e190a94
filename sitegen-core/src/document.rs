//! A single markdown source file and everything derived from it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tera::Context;
use tracing::warn;

use crate::config::SiteConfig;
use crate::error::{ContentError, RenderError, TemplateError};
use crate::markdown::{Metadata, decode_source, parse_markdown};
use crate::render::{PageContent, Renderable, SiteInfo, write_page};
use crate::template::{TemplateResolver, resolve_first};

/// Format of the `date` metadata value.
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

const INDEX_NAME: &str = "index.md";
const DRAFT_DIRS: [&str; 2] = ["drafts", "draft"];

#[derive(Debug)]
struct ParsedContent {
    html: String,
    metadata: Metadata,
    date: Option<NaiveDateTime>,
}

#[derive(Debug)]
pub struct ContentDocument {
    section: String,
    name: String,
    source_path: PathBuf,
    fallback_date: NaiveDateTime,
    parsed: OnceLock<ParsedContent>,
}

impl ContentDocument {
    /// `section` is the top level folder (empty for files directly under the
    /// content root) and `name` the path below it, including `.md`.
    pub fn new<S: Into<String>, N: Into<String>, P: Into<PathBuf>>(section: S, name: N, source_path: P) -> Self {
        Self::with_fallback_date(section, name, source_path, Local::now().naive_local())
    }

    /// Like [`ContentDocument::new`] with an explicit publish date for
    /// documents that carry no `date` metadata.
    pub fn with_fallback_date<S: Into<String>, N: Into<String>, P: Into<PathBuf>>(
        section: S,
        name: N,
        source_path: P,
        fallback_date: NaiveDateTime,
    ) -> Self {
        Self {
            section: section.into(),
            name: name.into(),
            source_path: source_path.into(),
            fallback_date,
            parsed: OnceLock::new(),
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn slug(&self) -> &str {
        self.name.strip_suffix(".md").unwrap_or(&self.name)
    }

    fn is_root_index(&self) -> bool {
        self.section.is_empty() && self.name == INDEX_NAME
    }

    fn parsed(&self) -> Result<&ParsedContent, ContentError> {
        if let Some(parsed) = self.parsed.get() {
            return Ok(parsed);
        }
        let parsed = self.parse()?;
        Ok(self.parsed.get_or_init(|| parsed))
    }

    fn parse(&self) -> Result<ParsedContent, ContentError> {
        let bytes = std::fs::read(&self.source_path).map_err(|source| ContentError::Io {
            path: self.source_path.clone(),
            source,
        })?;
        let (text, lossy) = decode_source(&bytes);
        if lossy {
            warn!(path = %self.source_path.display(), "content is not valid UTF-8, invalid bytes replaced");
        }

        let parsed = parse_markdown(&text);
        let date = match parsed.metadata.get("date") {
            Some(value) => Some(NaiveDateTime::parse_from_str(value, DATE_FORMAT).map_err(|_| {
                ContentError::InvalidDate {
                    path: self.source_path.clone(),
                    value: value.to_string(),
                }
            })?),
            None => None,
        };

        Ok(ParsedContent {
            html: parsed.html,
            metadata: parsed.metadata,
            date,
        })
    }

    pub fn html_body(&self) -> Result<&str, ContentError> {
        Ok(&self.parsed()?.html)
    }

    pub fn metadata(&self) -> Result<&Metadata, ContentError> {
        Ok(&self.parsed()?.metadata)
    }

    pub fn title(&self) -> Result<&str, ContentError> {
        Ok(self.metadata()?.get("title").unwrap_or_default())
    }

    pub fn description(&self) -> Result<&str, ContentError> {
        Ok(self.metadata()?.get("description").unwrap_or_default())
    }

    /// The `date` metadata, or the fallback date fixed at construction.
    pub fn publish_date(&self) -> Result<NaiveDateTime, ContentError> {
        Ok(self.parsed()?.date.unwrap_or(self.fallback_date))
    }

    pub fn tags(&self) -> Result<Vec<String>, ContentError> {
        Ok(self
            .metadata()?
            .values("tags")
            .iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn is_draft(&self) -> Result<bool, ContentError> {
        let in_draft_dir = self
            .source_path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|dir| DRAFT_DIRS.iter().any(|d| dir == *d));
        if in_draft_dir {
            return Ok(true);
        }

        Ok(self.metadata()?.get("draft") == Some("true"))
    }

    pub fn is_flat_output(&self) -> Result<bool, ContentError> {
        Ok(self
            .metadata()?
            .get("flat")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1")))
    }

    /// Path segments below the site root. Both the web path and the output
    /// directory are built from these.
    fn route(&self) -> Vec<&str> {
        if self.is_root_index() {
            return Vec::new();
        }
        let mut segments = Vec::with_capacity(2);
        if !self.section.is_empty() {
            segments.push(self.section.as_str());
        }
        segments.push(self.slug());
        segments
    }

    pub fn web_path(&self) -> String {
        format!("/{}", self.route().join("/"))
    }

    pub fn canonical_url(&self, site: &SiteConfig) -> String {
        site.url_for(&self.web_path())
    }

    /// Serializable view used as `item` and in listing `items`.
    pub fn view(&self) -> Result<DocumentView<'_>, ContentError> {
        Ok(DocumentView {
            section: &self.section,
            name: &self.name,
            slug: self.slug(),
            title: self.title()?,
            description: self.description()?,
            web_path: self.web_path(),
            date: self.publish_date()?,
            tags: self.tags()?,
            content: self.html_body()?,
            metadata: self.metadata()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentView<'a> {
    pub section: &'a str,
    pub name: &'a str,
    pub slug: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub web_path: String,
    pub date: NaiveDateTime,
    pub tags: Vec<String>,
    pub content: &'a str,
    pub metadata: &'a Metadata,
}

impl Renderable for ContentDocument {
    fn build_context(&self, site: &SiteConfig) -> Result<Context, RenderError> {
        let page = PageContent {
            title: self.title()?.to_string(),
            description: self.description()?.to_string(),
            canonical_url: self.canonical_url(site),
            date: Some(self.publish_date()?),
        };

        let mut context = Context::new();
        context.insert("page_content", &page);
        context.insert("site_info", &SiteInfo::new(site, &self.section));
        context.insert("item", &self.view()?);
        Ok(context)
    }

    fn resolve_template(&self, templates: &dyn TemplateResolver) -> Result<String, TemplateError> {
        if self.section.is_empty() {
            let name = if self.name == INDEX_NAME { "index.html" } else { "single.html" };
            return resolve_first(templates, &[name]);
        }
        let section_single = format!("{}/single.html", self.section);
        resolve_first(templates, &[section_single.as_str(), "single.html"])
    }

    fn output_directory(&self, root: &Path) -> Result<PathBuf, RenderError> {
        let mut route = self.route();
        if self.is_flat_output()? {
            route.pop();
        }
        Ok(route.iter().fold(root.to_path_buf(), |dir, segment| dir.join(segment)))
    }

    fn output_filename(&self) -> Result<String, RenderError> {
        if self.is_flat_output()? {
            return Ok(format!("{}.html", self.slug()));
        }
        Ok("index.html".to_string())
    }

    /// Drafts are never written.
    fn render(
        &self,
        site: &SiteConfig,
        templates: &dyn TemplateResolver,
        root: &Path,
    ) -> Result<Vec<PathBuf>, RenderError> {
        if self.is_draft()? {
            return Ok(Vec::new());
        }
        write_page(self, site, templates, root).map(|path| vec![path])
    }
}
