use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use tera::{Context, Tera, Value};
use walkdir::WalkDir;

use crate::error::TemplateError;

const TEMPLATE_EXTENSIONS: [&str; 2] = ["html", "xml"];

/// Looks up templates by logical name and renders them.
///
/// `lookup` answers whether a template exists so callers can walk a fallback
/// chain without treating a missing template as an error.
pub trait TemplateResolver: Sync {
    fn lookup(&self, name: &str) -> Option<&str>;

    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError>;
}

/// Return the first candidate the resolver knows about.
pub fn resolve_first(
    templates: &dyn TemplateResolver,
    candidates: &[&str],
) -> Result<String, TemplateError> {
    candidates
        .iter()
        .find_map(|name| templates.lookup(name))
        .map(str::to_string)
        .ok_or_else(|| TemplateError::NotFound {
            tried: candidates.iter().map(|c| c.to_string()).collect(),
        })
}

/// Tera backed templates loaded from a theme directory.
///
/// Template names are paths relative to that directory, so
/// `templates/blog/single.html` is looked up as `blog/single.html`.
pub struct TeraTemplates {
    tera: Tera,
}

impl TeraTemplates {
    /// Load every `.html` and `.xml` file below `dir`. Dotfiles, editor
    /// backups and other assets are left alone.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() || !is_template_file(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((entry.path().to_path_buf(), Some(name)));
        }

        let mut tera = Tera::default();
        tera.add_template_files(files)?;

        Ok(Self::with_filters(tera))
    }

    /// Build from in-memory `(name, source)` pairs.
    pub fn from_raw(templates: &[(&str, &str)]) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().copied())?;

        Ok(Self::with_filters(tera))
    }

    fn with_filters(mut tera: Tera) -> Self {
        tera.set_escape_fn(escape_markup);
        tera.register_filter("to_date", to_date);
        Self { tera }
    }
}

impl TemplateResolver for TeraTemplates {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.tera.get_template_names().find(|candidate| *candidate == name)
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        Ok(self.tera.render(name, context)?)
    }
}

fn is_template_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'));
    let extension = path.extension().and_then(|ext| ext.to_str());

    !hidden && extension.is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

/// Autoescape `& < > " '` and leave `/` alone so paths stay readable.
fn escape_markup(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}

/// Format a serialized timestamp as `DD.MM.YYYY`.
fn to_date(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("to_date expects a date string"))?;
    let date = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| tera::Error::msg(format!("to_date cannot parse `{raw}`: {e}")))?;

    Ok(Value::String(date.format("%d.%m.%Y").to_string()))
}
