pub mod config;
pub mod document;
pub mod error;
pub mod feed;
pub mod markdown;
pub mod render;
pub mod section;
pub mod site;
pub mod tags;
pub mod template;

use std::path::Path;

use tracing::info;

// Re-export main types
pub use config::{Config, SiteConfig};
pub use document::ContentDocument;
pub use error::{BuildError, ConfigError, ContentError, RenderError, TemplateError};
pub use feed::FeedBuilder;
pub use render::Renderable;
pub use section::Section;
pub use site::{FailurePolicy, RenderPolicy, RenderReport, SiteTree};
pub use tags::{Tag, TagIndex};
pub use template::{TemplateResolver, TeraTemplates};

/// Generate the whole site: discover content, load templates, render into
/// `output_dir`.
///
/// With [`FailurePolicy::Continue`] every page is attempted and the run fails
/// afterwards with [`BuildError::PageFailures`] if any page did not render.
pub fn generate_site(
    site: &SiteConfig,
    content_dir: &Path,
    templates_dir: &Path,
    output_dir: &Path,
    policy: RenderPolicy,
) -> Result<RenderReport, BuildError> {
    let tree = SiteTree::discover(content_dir)?;
    let templates = TeraTemplates::load(templates_dir)?;

    std::fs::create_dir_all(output_dir).map_err(|source| RenderError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let report = tree.render_all(site, &templates, output_dir, policy)?;
    info!(
        documents = tree.documents().len(),
        written = report.written.len(),
        failed = report.failures.len(),
        output = %output_dir.display(),
        "site generated"
    );

    if !report.failures.is_empty() {
        return Err(BuildError::PageFailures(report.failures.len()));
    }

    Ok(report)
}
