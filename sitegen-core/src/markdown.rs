//! Markdown conversion and metadata header parsing.
//!
//! A content file starts with an optional header of `key: value` lines:
//!
//! ```text
//! title: Blog Post One
//! date: 09.02.2021 15:30
//! tags: programming,
//!     software development
//!
//! This is the content of the post.
//! ```
//!
//! The header ends at the first blank line. Lines indented by four or more
//! spaces add another value to the previous key.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;
use serde::Serialize;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const HIGHLIGHT_THEME: &str = "base16-ocean.dark";

static META_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-{3}(\s.*)?$").expect("static regex is valid"));
static META_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-{3}|\.{3})(\s.*)?$").expect("static regex is valid"));
static META_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ ]{0,3}(?P<key>[A-Za-z0-9_-]+):\s*(?P<value>.*)$").expect("static regex is valid")
});
static META_MORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ ]{4,}(?P<value>.*)$").expect("static regex is valid"));

/// A metadata value. Keys given once collapse to a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Single(String),
    List(Vec<String>),
}

impl MetaValue {
    fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            MetaValue::Single(values.remove(0))
        } else {
            MetaValue::List(values)
        }
    }

    /// Scalar view: the value itself, or the first entry of a list.
    pub fn as_str(&self) -> &str {
        match self {
            MetaValue::Single(value) => value,
            MetaValue::List(values) => values.first().map(String::as_str).unwrap_or_default(),
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            MetaValue::Single(value) => std::slice::from_ref(value),
            MetaValue::List(values) => values,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(MetaValue::as_str)
    }

    pub fn values(&self, key: &str) -> &[String] {
        self.0.get(key).map(MetaValue::values).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of the single parse pass over a content file.
#[derive(Debug, Clone, Default)]
pub struct ParsedMarkdown {
    pub html: String,
    pub metadata: Metadata,
}

pub fn parse_markdown(text: &str) -> ParsedMarkdown {
    let (metadata, body) = split_metadata(text);
    ParsedMarkdown {
        html: to_html(body),
        metadata,
    }
}

/// Decode raw file bytes, tolerating a BOM and invalid sequences.
pub fn decode_source(bytes: &[u8]) -> (String, bool) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), false),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
    }
}

/// Split the metadata header from the body. Returns the remaining body text.
fn split_metadata(text: &str) -> (Metadata, &str) {
    let mut collected: Vec<(String, Vec<String>)> = Vec::new();
    let mut rest = text;
    let mut first = true;

    while !rest.is_empty() {
        let (line, next) = match rest.find('\n') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };
        let line = line.strip_suffix('\r').unwrap_or(line);

        if first {
            first = false;
            if META_BEGIN.is_match(line) {
                rest = next;
                continue;
            }
        }

        if line.trim().is_empty() || META_END.is_match(line) {
            rest = next;
            break;
        }

        if let Some(caps) = META_LINE.captures(line) {
            let key = caps["key"].trim().to_lowercase();
            let value = caps["value"].trim().to_string();
            match collected.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value),
                None => collected.push((key, vec![value])),
            }
        } else if let (Some(caps), Some((_, values))) = (META_MORE.captures(line), collected.last_mut()) {
            values.push(caps["value"].trim().to_string());
        } else {
            break;
        }

        rest = next;
    }

    let metadata = collected
        .into_iter()
        .map(|(key, values)| (key, MetaValue::from_values(values)))
        .collect();

    (Metadata(metadata), rest)
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options
}

pub fn to_html(body: &str) -> String {
    let parser = Parser::new_ext(body, markdown_options());

    let mut events = Vec::new();
    let mut code: Option<(String, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                code = Some((lang.to_string(), String::new()));
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, content)) = code.as_mut() {
                    content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) if code.is_some() => {
                if let Some((lang, content)) = code.take() {
                    events.push(Event::Html(highlight(&lang, &content).into()));
                }
            }
            other => events.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn highlight(lang: &str, content: &str) -> String {
    let plain = || format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(content));

    let lang = lang.split_whitespace().next().unwrap_or_default();
    if lang.is_empty() {
        return plain();
    }

    let syntax = SYNTAX_SET.find_syntax_by_token(lang).or_else(|| match lang {
        "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
        _ => None,
    });

    match (syntax, THEME_SET.themes.get(HIGHLIGHT_THEME)) {
        (Some(syntax), Some(theme)) => {
            highlighted_html_for_string(content, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
        }
        _ => plain(),
    }
}
