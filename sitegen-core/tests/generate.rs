use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rss::Channel;
use sitegen_core::{BuildError, ContentError, FailurePolicy, RenderPolicy, SiteConfig, generate_site};
use walkdir::WalkDir;

const INDEX_TEMPLATE: &str = "<h1>{{ page_content.title }}</h1>{{ item.content | safe }}";
const SINGLE_TEMPLATE: &str = "<h1>{{ page_content.title }}</h1><p>{{ page_content.date | to_date }}</p>";
const LIST_TEMPLATE: &str = "{% for item in items %}<a href=\"{{ item.web_path }}\">{{ item.title }}</a>{% endfor %}";
const TAGS_TEMPLATE: &str = "{% for item in items %}<a href=\"{{ item.web_path }}\">{{ item.tag }}</a>{% endfor %}";
const TAG_TEMPLATE: &str = "<h1>{{ tag }}</h1>{% for item in items %}<a href=\"{{ item.web_path }}\">{{ item.title }}</a>{% endfor %}";

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn content(&self, name: &str, contents: &str) -> &Self {
        write(&self.dir.path().join("content").join(name), contents);
        self
    }

    fn template(&self, name: &str, contents: &str) -> &Self {
        write(&self.dir.path().join("templates").join(name), contents);
        self
    }

    fn public(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    fn generate(&self) -> Result<sitegen_core::RenderReport, BuildError> {
        self.generate_with(RenderPolicy::default())
    }

    fn generate_with(&self, policy: RenderPolicy) -> Result<sitegen_core::RenderReport, BuildError> {
        generate_site(
            &site(),
            &self.dir.path().join("content"),
            &self.dir.path().join("templates"),
            &self.public(),
            policy,
        )
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.public().join(name)).unwrap()
    }
}

fn site() -> SiteConfig {
    SiteConfig::new("https://bb.com", "Test Site", "U T", "en-US")
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let contents = std::fs::read_to_string(entry.path()).unwrap();
            (entry.path().strip_prefix(root).unwrap().to_path_buf(), contents)
        })
        .collect()
}

fn standard_templates(fixture: &Fixture) {
    fixture
        .template("index.html", INDEX_TEMPLATE)
        .template("single.html", SINGLE_TEMPLATE)
        .template("list.html", LIST_TEMPLATE)
        .template("tag.html", TAG_TEMPLATE)
        .template("tags.html", TAGS_TEMPLATE);
}

#[test]
fn test_generates_blog_site() {
    let fixture = Fixture::new();
    standard_templates(&fixture);
    fixture
        .content("index.md", "Hello")
        .content("blog/post1.md", "title: Post One\ndate: 09.02.2021 15:30\ntags: tech\n\nFirst post.");

    let report = fixture.generate().unwrap();
    assert!(report.failures.is_empty());

    assert_eq!(fixture.read("index.html").trim(), "<h1></h1><p>Hello</p>");
    assert_eq!(fixture.read("blog/index.html"), "<a href=\"/blog/post1\">Post One</a>");
    assert_eq!(fixture.read("blog/post1/index.html"), "<h1>Post One</h1><p>09.02.2021</p>");
    assert_eq!(fixture.read("tag/index.html"), "<a href=\"/tag/tech\">tech</a>");
    assert_eq!(fixture.read("tag/tech/index.html"), "<h1>tech</h1><a href=\"/blog/post1\">Post One</a>");

    let channel = Channel::read_from(fixture.read("rss.xml").as_bytes()).unwrap();
    assert_eq!(channel.items().len(), 1);
    assert_eq!(channel.items()[0].title(), Some("Post One"));
    assert_eq!(channel.items()[0].link(), Some("https://bb.com/blog/post1"));
}

#[test]
fn test_generation_is_idempotent() {
    let fixture = Fixture::new();
    standard_templates(&fixture);
    fixture
        .content("index.md", "date: 01.01.2021 00:00\n\nHello")
        .content("about.md", "title: About\ndate: 01.01.2021 00:00\nflat: true\n\nAbout us")
        .content("blog/a.md", "title: A\ndate: 02.01.2021 00:00\ntags: x, y\n\nA")
        .content("blog/b.md", "title: B\ndate: 03.01.2021 00:00\ntags: y\n\nB");

    fixture.generate().unwrap();
    let first = snapshot(&fixture.public());
    fixture.generate().unwrap();
    let second = snapshot(&fixture.public());

    let without_build_date = |files: &BTreeMap<PathBuf, String>| -> BTreeMap<PathBuf, String> {
        files
            .iter()
            .map(|(path, contents)| {
                let contents = match (contents.find("<lastBuildDate>"), contents.find("</lastBuildDate>")) {
                    (Some(start), Some(end)) => format!("{}{}", &contents[..start], &contents[end..]),
                    _ => contents.clone(),
                };
                (path.clone(), contents)
            })
            .collect()
    };
    assert_eq!(without_build_date(&first), without_build_date(&second));
    assert!(first.contains_key(Path::new("about.html")));
}

#[test]
fn test_drafts_are_excluded_everywhere() {
    let fixture = Fixture::new();
    standard_templates(&fixture);
    fixture
        .content("blog/live.md", "title: Live\ndate: 01.01.2021 00:00\ntags: shared\n\nLive")
        .content("blog/hidden.md", "title: Hidden\ndraft: true\ntags: shared, secret\n\nHidden")
        .content("blog/drafts/wip.md", "title: WIP\ntags: secret\n\nWIP");

    fixture.generate().unwrap();

    assert!(!fixture.public().join("blog/hidden").exists());
    assert!(!fixture.public().join("blog/drafts").exists());
    assert!(!fixture.public().join("tag/secret").exists());
    assert_eq!(fixture.read("blog/index.html"), "<a href=\"/blog/live\">Live</a>");
    assert_eq!(fixture.read("tag/shared/index.html"), "<h1>shared</h1><a href=\"/blog/live\">Live</a>");

    let channel = Channel::read_from(fixture.read("rss.xml").as_bytes()).unwrap();
    let titles: Vec<_> = channel.items().iter().filter_map(|item| item.title()).collect();
    assert_eq!(titles, ["Live"]);
}

#[test]
fn test_list_template_serves_every_listing() {
    let fixture = Fixture::new();
    fixture
        .template("single.html", "single")
        .template("list.html", "generic list");
    fixture.content("blog/post.md", "title: Post\ntags: rust\n\nbody");

    fixture.generate().unwrap();
    assert_eq!(fixture.read("blog/index.html"), "generic list");
    assert_eq!(fixture.read("tag/rust/index.html"), "generic list");
    assert_eq!(fixture.read("tag/index.html"), "generic list");

    fixture.template("tag.html", "tag page");
    fixture.generate().unwrap();
    assert_eq!(fixture.read("blog/index.html"), "generic list");
    assert_eq!(fixture.read("tag/rust/index.html"), "tag page");
    assert_eq!(fixture.read("tag/index.html"), "generic list");
}

#[test]
fn test_invalid_date_aborts_generation() {
    let fixture = Fixture::new();
    standard_templates(&fixture);
    fixture
        .content("blog/good.md", "title: Good\n\nbody")
        .content("blog/bad.md", "title: Bad\ndate: 2021-02-09\n\nbody");

    let err = fixture.generate().unwrap_err();
    assert!(matches!(err, BuildError::Content(ContentError::InvalidDate { .. })));
    assert!(!fixture.public().join("blog").exists());
}

#[test]
fn test_missing_final_template_with_continue_policy() {
    let fixture = Fixture::new();
    fixture.template("list.html", "list");
    fixture.content("blog/post.md", "title: Post\n\nbody");

    let policy = RenderPolicy {
        on_error: FailurePolicy::Continue,
        parallel: false,
    };
    let err = fixture.generate_with(policy).unwrap_err();
    assert!(matches!(err, BuildError::PageFailures(1)));
    assert!(fixture.public().join("blog/index.html").exists());
    assert!(fixture.public().join("rss.xml").exists());
}

#[test]
fn test_missing_final_template_with_abort_policy() {
    let fixture = Fixture::new();
    fixture.template("list.html", "list");
    fixture.content("blog/post.md", "title: Post\n\nbody");

    let err = fixture.generate().unwrap_err();
    assert!(matches!(err, BuildError::Render(_)));
    assert!(!fixture.public().join("rss.xml").exists());
}

#[test]
fn test_tag_cannot_escape_tag_directory() {
    let fixture = Fixture::new();
    fixture
        .template("index.html", "HOME")
        .template("single.html", "single")
        .template("list.html", "LIST");
    fixture
        .content("index.md", "Hello")
        .content("blog/p.md", "title: P\ntags: .., ../blog, safe\n\nbody");

    fixture.generate().unwrap();
    assert_eq!(fixture.read("index.html"), "HOME");
    assert_eq!(fixture.read("blog/index.html"), "LIST");
    assert_eq!(fixture.read("tag/safe/index.html"), "LIST");

    let mut entries: Vec<_> = std::fs::read_dir(fixture.public().join("tag"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, ["index.html", "safe"]);
}
