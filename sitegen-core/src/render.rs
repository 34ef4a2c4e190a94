//! The contract shared by everything that produces an output page.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tera::Context;
use tracing::debug;

use crate::config::SiteConfig;
use crate::error::{RenderError, TemplateError};
use crate::template::TemplateResolver;

/// Describes the page being rendered, exposed to templates as `page_content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageContent {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub date: Option<NaiveDateTime>,
}

/// Site wide values, exposed to templates as `site_info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteInfo {
    pub site_name: String,
    pub base_url: String,
    pub section: String,
}

impl SiteInfo {
    pub fn new(site: &SiteConfig, section: &str) -> Self {
        Self {
            site_name: site.title.clone(),
            base_url: site.url.clone(),
            section: section.to_string(),
        }
    }
}

pub trait Renderable {
    fn build_context(&self, site: &SiteConfig) -> Result<Context, RenderError>;

    /// Name of the template to render with, after walking any fallbacks.
    fn resolve_template(&self, templates: &dyn TemplateResolver) -> Result<String, TemplateError>;

    fn output_directory(&self, root: &Path) -> Result<PathBuf, RenderError>;

    fn output_filename(&self) -> Result<String, RenderError> {
        Ok("index.html".to_string())
    }

    /// Render to disk. Returns every file written.
    fn render(
        &self,
        site: &SiteConfig,
        templates: &dyn TemplateResolver,
        root: &Path,
    ) -> Result<Vec<PathBuf>, RenderError> {
        write_page(self, site, templates, root).map(|path| vec![path])
    }
}

/// Resolve, build context, render and write a single page.
pub fn write_page<R: Renderable + ?Sized>(
    page: &R,
    site: &SiteConfig,
    templates: &dyn TemplateResolver,
    root: &Path,
) -> Result<PathBuf, RenderError> {
    let template = page.resolve_template(templates)?;
    let context = page.build_context(site)?;
    let html = templates.render(&template, &context)?;

    let directory = page.output_directory(root)?;
    std::fs::create_dir_all(&directory).map_err(|source| RenderError::Io {
        path: directory.clone(),
        source,
    })?;

    let path = directory.join(page.output_filename()?);
    std::fs::write(&path, html).map_err(|source| RenderError::Io {
        path: path.clone(),
        source,
    })?;

    debug!(template = %template, path = %path.display(), "wrote page");
    Ok(path)
}

/// Context shared by listing pages: `items`, `page_content` and `site_info`.
pub fn listing_context<T: Serialize>(
    items: &T,
    page: &PageContent,
    info: &SiteInfo,
) -> Context {
    let mut context = Context::new();
    context.insert("items", items);
    context.insert("page_content", page);
    context.insert("site_info", info);
    context
}
