use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use tera::Context;

use crate::config::SiteConfig;
use crate::document::{ContentDocument, DocumentView};
use crate::error::{ContentError, RenderError, TemplateError};
use crate::render::{PageContent, Renderable, SiteInfo, listing_context};
use crate::template::{TemplateResolver, resolve_first};

/// Non-draft documents ordered newest first. Equal dates keep their
/// insertion order.
pub fn sort_by_date(
    documents: &[Arc<ContentDocument>],
) -> Result<Vec<(NaiveDateTime, &ContentDocument)>, ContentError> {
    let mut dated = Vec::with_capacity(documents.len());
    for document in documents {
        if document.is_draft()? {
            continue;
        }
        dated.push((document.publish_date()?, document.as_ref()));
    }
    dated.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(dated)
}

pub fn views<'a>(
    sorted: &[(NaiveDateTime, &'a ContentDocument)],
) -> Result<Vec<DocumentView<'a>>, ContentError> {
    sorted.iter().map(|(_, document)| document.view()).collect()
}

/// The documents in one top level content folder.
#[derive(Debug)]
pub struct Section {
    name: String,
    documents: Vec<Arc<ContentDocument>>,
}

impl Section {
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "section name must not be empty");
        Self {
            name,
            documents: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn documents(&self) -> &[Arc<ContentDocument>] {
        &self.documents
    }

    /// Panics if the document belongs to another section.
    pub fn add(&mut self, document: Arc<ContentDocument>) {
        assert_eq!(
            document.section(),
            self.name,
            "document {} does not belong to section {}",
            document.name(),
            self.name
        );
        self.documents.push(document);
    }

    pub fn web_path(&self) -> String {
        format!("/{}/", self.name)
    }

    pub fn publish_date(&self) -> Result<Option<NaiveDateTime>, ContentError> {
        let mut latest = None;
        for document in &self.documents {
            latest = latest.max(Some(document.publish_date()?));
        }
        Ok(latest)
    }
}

impl Renderable for Section {
    fn build_context(&self, site: &SiteConfig) -> Result<Context, RenderError> {
        let sorted = sort_by_date(&self.documents)?;
        let page = PageContent {
            title: self.name.clone(),
            description: String::new(),
            canonical_url: site.url_for(&self.web_path()),
            date: sorted.iter().map(|(date, _)| *date).max(),
        };

        Ok(listing_context(&views(&sorted)?, &page, &SiteInfo::new(site, &self.name)))
    }

    fn resolve_template(&self, templates: &dyn TemplateResolver) -> Result<String, TemplateError> {
        let section_list = format!("{}/list.html", self.name);
        resolve_first(templates, &[section_list.as_str(), "list.html"])
    }

    fn output_directory(&self, root: &Path) -> Result<PathBuf, RenderError> {
        Ok(root.join(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TeraTemplates;

    fn site() -> SiteConfig {
        SiteConfig::new("http://bb.com", "HELLO", "U T", "en-US")
    }

    fn document(dir: &Path, section: &str, slug: &str, date: &str) -> Arc<ContentDocument> {
        let path = dir.join(format!("{section}-{slug}.md"));
        std::fs::write(&path, format!("title: {slug}\ndate: {date}\n\nbody")).unwrap();
        Arc::new(ContentDocument::new(section, format!("{slug}.md"), path))
    }

    #[test]
    #[should_panic(expected = "does not belong to section")]
    fn test_add_rejects_other_section() {
        let mut section = Section::new("blog");
        section.add(Arc::new(ContentDocument::new("reviews", "x.md", "/tmp/x.md")));
    }

    #[test]
    fn test_context_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut section = Section::new("blog");
        section.add(document(dir.path(), "blog", "old", "01.01.2020 10:00"));
        section.add(document(dir.path(), "blog", "new", "01.01.2022 10:00"));
        section.add(document(dir.path(), "blog", "mid", "01.01.2021 10:00"));

        let context = section.build_context(&site()).unwrap().into_json();
        let titles: Vec<_> = context["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, ["new", "mid", "old"]);
        assert_eq!(context["page_content"]["title"], "blog");
        assert_eq!(context["page_content"]["canonical_url"], "http://bb.com/blog/");
        assert_eq!(context["page_content"]["date"], "2022-01-01T10:00:00");
        assert_eq!(context["site_info"]["section"], "blog");
    }

    #[test]
    fn test_equal_dates_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut section = Section::new("blog");
        for slug in ["first", "second", "third"] {
            section.add(document(dir.path(), "blog", slug, "01.01.2020 10:00"));
        }
        let sorted = sort_by_date(section.documents()).unwrap();
        let slugs: Vec<_> = sorted.iter().map(|(_, d)| d.slug()).collect();
        assert_eq!(slugs, ["first", "second", "third"]);
    }

    #[test]
    fn test_template_fallback() {
        let section = Section::new("blog");
        let generic = TeraTemplates::from_raw(&[("list.html", "")]).unwrap();
        let specific = TeraTemplates::from_raw(&[("list.html", ""), ("blog/list.html", "")]).unwrap();
        assert_eq!(section.resolve_template(&generic).unwrap(), "list.html");
        assert_eq!(section.resolve_template(&specific).unwrap(), "blog/list.html");
    }

    #[test]
    fn test_render_writes_section_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut section = Section::new("blog");
        section.add(document(dir.path(), "blog", "post1", "01.01.2020 10:00"));
        let templates = TeraTemplates::from_raw(&[(
            "list.html",
            "{% for item in items %}<a href=\"{{ item.web_path }}\">{{ item.title }}</a>{% endfor %}",
        )])
        .unwrap();
        let public = dir.path().join("public");

        section.render(&site(), &templates, &public).unwrap();
        let html = std::fs::read_to_string(public.join("blog/index.html")).unwrap();
        assert_eq!(html, "<a href=\"/blog/post1\">post1</a>");
    }
}
