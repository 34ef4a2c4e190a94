//! Discovery of content documents and the fixed render order of a site.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::SiteConfig;
use crate::document::ContentDocument;
use crate::error::{BuildError, ContentError, RenderError};
use crate::feed::FeedBuilder;
use crate::render::Renderable;
use crate::section::Section;
use crate::tags::TagIndex;
use crate::template::TemplateResolver;

/// What to do when a single page fails to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Log the failure, keep rendering, report at the end.
    Continue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderPolicy {
    pub on_error: FailurePolicy,
    /// Render documents on the rayon thread pool.
    pub parallel: bool,
}

#[derive(Debug)]
pub struct PageFailure {
    pub page: String,
    pub error: RenderError,
}

#[derive(Debug, Default)]
pub struct RenderReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
}

impl RenderReport {
    fn record(
        &mut self,
        policy: FailurePolicy,
        page: String,
        result: Result<Vec<PathBuf>, RenderError>,
    ) -> Result<(), RenderError> {
        match result {
            Ok(paths) => {
                self.written.extend(paths);
                Ok(())
            }
            Err(error) if policy == FailurePolicy::Continue => {
                warn!(page = %page, error = %error, "page failed to render, continuing");
                self.failures.push(PageFailure { page, error });
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

/// Every published document of a site and the aggregates built from them.
#[derive(Debug, Default)]
pub struct SiteTree {
    documents: Vec<Arc<ContentDocument>>,
    sections: BTreeMap<String, Section>,
    tag_index: TagIndex,
    feed: FeedBuilder,
}

impl SiteTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `content_root` and ingest every markdown file. Dotfiles are
    /// skipped. Documents without a date all share the time discovery started.
    pub fn discover<P: AsRef<Path>>(content_root: P) -> Result<Self, BuildError> {
        let content_root = std::path::absolute(content_root.as_ref()).map_err(|source| ContentError::Io {
            path: content_root.as_ref().to_path_buf(),
            source,
        })?;
        if !content_root.is_dir() {
            return Err(BuildError::MissingContentDir(content_root));
        }

        let discovered_at = Local::now().naive_local();
        let mut tree = Self::new();

        for entry in WalkDir::new(&content_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if !file_name.ends_with(".md") || file_name.starts_with('.') {
                continue;
            }

            let Some(document) = document_at(&content_root, entry.path(), discovered_at) else {
                continue;
            };
            debug!(section = document.section(), name = document.name(), "discovered document");
            tree.ingest(document)?;
        }

        Ok(tree)
    }

    /// Add a document to the site and all its aggregates. Drafts are
    /// discarded. Returns whether the document was kept.
    pub fn ingest(&mut self, document: ContentDocument) -> Result<bool, ContentError> {
        if document.is_draft()? {
            debug!(path = %document.source_path().display(), "skipping draft");
            return Ok(false);
        }

        let document = Arc::new(document);
        if !document.section().is_empty() {
            self.sections
                .entry(document.section().to_string())
                .or_insert_with(|| Section::new(document.section()))
                .add(Arc::clone(&document));
        }
        self.tag_index.add(&document)?;
        self.feed.add(Arc::clone(&document));
        self.documents.push(document);

        Ok(true)
    }

    pub fn documents(&self) -> &[Arc<ContentDocument>] {
        &self.documents
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.tag_index
    }

    pub fn feed(&self) -> &FeedBuilder {
        &self.feed
    }

    /// Render documents, then sections, then tags, then the feed.
    ///
    /// Sequential rendering with [`FailurePolicy::Abort`] stops before the
    /// document after the first failure. In parallel every document is
    /// attempted, and the first failure in discovery order is returned.
    pub fn render_all(
        &self,
        site: &SiteConfig,
        templates: &dyn TemplateResolver,
        root: &Path,
        policy: RenderPolicy,
    ) -> Result<RenderReport, RenderError> {
        let mut report = RenderReport::default();

        if policy.parallel {
            let rendered: Vec<_> = self
                .documents
                .par_iter()
                .map(|document| (document.web_path(), document.render(site, templates, root)))
                .collect();
            for (page, result) in rendered {
                report.record(policy.on_error, page, result)?;
            }
        } else {
            for document in &self.documents {
                report.record(
                    policy.on_error,
                    document.web_path(),
                    document.render(site, templates, root),
                )?;
            }
        }

        for section in self.sections() {
            report.record(policy.on_error, section.web_path(), section.render(site, templates, root))?;
        }

        report.record(
            policy.on_error,
            "/tag/".to_string(),
            self.tag_index.render(site, templates, root),
        )?;

        report.record(
            policy.on_error,
            "/rss.xml".to_string(),
            self.feed.render(site, root).map(|path| vec![path]),
        )?;

        Ok(report)
    }
}

/// Split the path below the content root on its first separator into
/// section and name. Files directly under the root have no section.
fn document_at(content_root: &Path, path: &Path, discovered_at: NaiveDateTime) -> Option<ContentDocument> {
    let relative = path.strip_prefix(content_root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();

    let (section, name) = match parts.as_slice() {
        [] => return None,
        [name] => (String::new(), name.to_string()),
        [section, rest @ ..] => (section.to_string(), rest.join("/")),
    };

    Some(ContentDocument::with_fallback_date(section, name, path, discovered_at))
}
