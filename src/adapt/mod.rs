//! Conversion of one archive page into a self-contained preview document.
//!
//! The page is parsed with error recovery, its references are classified,
//! resources are inlined as `data:` payloads, links to other pages become
//! synthetic [`ArchiveUrl`]s, and the tree is serialized back as UTF-8.
//!
//! # Example
//!
//! ```
//! use chmview::{DocumentAdapter, MemoryContainer};
//!
//! let archive = MemoryContainer::new()
//!     .with_entry("/index.htm", r#"<title>Start</title><img src="pic.gif"><a href="next.htm">next</a>"#)
//!     .with_entry("/pic.gif", b"GIF89a".to_vec())
//!     .with_entry("/next.htm", "<p>next</p>");
//!
//! let doc = DocumentAdapter::default().adapt("/index.htm", &archive).unwrap();
//! let html = String::from_utf8(doc.bytes).unwrap();
//! assert!(html.contains("src=\"data:image/gif;base64,R0lGODlh\""));
//! assert!(html.contains("href=\"chm:///next.htm\""));
//! assert_eq!(doc.metadata.title, "Start");
//! ```

pub mod archive_url;
pub mod css;
pub mod links;

pub use archive_url::ArchiveUrl;
pub use css::{CssReference, rewrite_css_references};
pub use links::{LinkClassifier, LinkKind, LinkTarget, ReferenceContext, ReferencePolicy};

use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, trace, warn};

use crate::container::{Container, EntryIndex};
use crate::dom::{Attribute, Dom, NodeId, parse_html, serialize_document_bytes};
use crate::error::{Diagnostic, Error, Result};
use crate::util::{MediaFormat, decode_text, detect_media_format, file_stem, url_scheme};

/// Stylesheets importing stylesheets are followed this many levels deep.
const MAX_STYLESHEET_DEPTH: usize = 4;

/// Content type of every adapted document.
pub const CONTENT_TYPE_HINT: &str = "text/html";

/// Options controlling adaptation.
#[derive(Debug, Clone)]
pub struct AdaptOptions {
    /// Scheme of synthetic page URLs.
    pub url_scheme: String,
    /// File name of the archive, embedded in synthetic URLs.
    pub archive_name: Option<String>,
    pub reference_policy: ReferencePolicy,
    /// Inline `link` stylesheets instead of rewriting them to archive URLs.
    pub inline_stylesheets: bool,
    /// Rewrite `url()` and `@import` targets inside stylesheets.
    pub rewrite_css_urls: bool,
    /// Remove `script` elements, event-handler attributes, and `javascript:` URLs.
    pub strip_scripts: bool,
    /// Resources larger than this are left as references.
    pub max_inline_bytes: u64,
}

impl Default for AdaptOptions {
    fn default() -> Self {
        Self {
            url_scheme: "chm".to_string(),
            archive_name: None,
            reference_policy: ReferencePolicy::default(),
            inline_stylesheets: true,
            rewrite_css_urls: true,
            strip_scripts: true,
            max_inline_bytes: 8 * 1024 * 1024,
        }
    }
}

impl AdaptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.url_scheme = scheme.into();
        self
    }

    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = Some(name.into());
        self
    }

    pub fn with_reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.reference_policy = policy;
        self
    }

    pub fn with_inline_stylesheets(mut self, inline: bool) -> Self {
        self.inline_stylesheets = inline;
        self
    }

    pub fn with_rewrite_css_urls(mut self, rewrite: bool) -> Self {
        self.rewrite_css_urls = rewrite;
        self
    }

    pub fn with_strip_scripts(mut self, strip: bool) -> Self {
        self.strip_scripts = strip;
        self
    }

    pub fn with_max_inline_bytes(mut self, max: u64) -> Self {
        self.max_inline_bytes = max;
        self
    }
}

/// Descriptive record that travels with an adapted document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(rename_all = "camelCase"))]
pub struct DocumentMetadata {
    /// The page's `<title>`, or the entry's file stem.
    pub title: String,
    /// File name a host may save the document under.
    pub suggested_name: String,
    pub content_type_hint: String,
    /// Stored name of the adapted entry.
    pub entry_name: String,
    /// Encoding the page was decoded from.
    pub source_encoding: String,
    pub inlined_resources: usize,
    pub rewritten_pages: usize,
}

impl DocumentMetadata {
    /// The string-keyed form a preview host consumes.
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("title", self.title.clone()),
            ("suggestedName", self.suggested_name.clone()),
            ("contentTypeHint", self.content_type_hint.clone()),
            ("entryName", self.entry_name.clone()),
            ("sourceEncoding", self.source_encoding.clone()),
        ])
    }
}

/// The result of adapting one entry.
#[derive(Debug, Clone)]
pub struct AdaptedDocument {
    /// UTF-8 HTML.
    pub bytes: Vec<u8>,
    pub metadata: DocumentMetadata,
    /// Recoverable anomalies, in document order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts archive pages into self-contained documents.
///
/// An adapter holds only its options, so one instance can serve concurrent
/// previews of the same archive.
#[derive(Debug, Clone, Default)]
pub struct DocumentAdapter {
    options: AdaptOptions,
}

impl DocumentAdapter {
    pub fn new(options: AdaptOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AdaptOptions {
        &self.options
    }

    /// Adapt the entry `entry_name` of `container`.
    ///
    /// Fails only if the entry does not exist or cannot be read. Malformed
    /// markup, dangling references, and unreadable resources are reported in
    /// [`AdaptedDocument::diagnostics`].
    pub fn adapt(&self, entry_name: &str, container: &dyn Container) -> Result<AdaptedDocument> {
        let index = EntryIndex::from_container(container)?;
        let page = index
            .resolve(entry_name)
            .ok_or_else(|| Error::EntryNotFound(entry_name.to_string()))?
            .to_string();
        let bytes = container.read_entry(&page)?;

        let parsed = parse_html(&bytes);
        let mut dom = parsed.dom;

        let mut session = Session {
            options: &self.options,
            container,
            index,
            page: page.clone(),
            diagnostics: Vec::new(),
            inline_cache: HashMap::new(),
            inlined_resources: 0,
            rewritten_pages: 0,
        };
        if parsed.parse_errors > 0 {
            session.diagnostics.push(Diagnostic::MalformedMarkup {
                count: parsed.parse_errors,
            });
        }

        session.rewrite_tree(&mut dom);

        let title = document_title(&dom).unwrap_or_else(|| file_stem(&page).to_string());
        let bytes = serialize_document_bytes(&dom)?;

        debug!(
            entry = %page,
            bytes = bytes.len(),
            inlined = session.inlined_resources,
            pages = session.rewritten_pages,
            diagnostics = session.diagnostics.len(),
            "adapted page"
        );

        Ok(AdaptedDocument {
            bytes,
            metadata: DocumentMetadata {
                title,
                suggested_name: format!("{}.html", file_stem(&page)),
                content_type_hint: CONTENT_TYPE_HINT.to_string(),
                entry_name: page,
                source_encoding: parsed.encoding.name().to_string(),
                inlined_resources: session.inlined_resources,
                rewritten_pages: session.rewritten_pages,
            },
            diagnostics: session.diagnostics,
        })
    }
}

/// Adapt an entry with default options.
pub fn adapt(entry_name: &str, container: &dyn Container) -> Result<AdaptedDocument> {
    DocumentAdapter::default().adapt(entry_name, container)
}

/// State of one adaptation call.
struct Session<'a> {
    options: &'a AdaptOptions,
    container: &'a dyn Container,
    index: EntryIndex,
    page: String,
    diagnostics: Vec<Diagnostic>,
    /// Data URIs by entry name. Stylesheets are only cached when reached from
    /// the page itself, where their imports are complete.
    inline_cache: HashMap<String, String>,
    inlined_resources: usize,
    rewritten_pages: usize,
}

impl Session<'_> {
    fn rewrite_tree(&mut self, dom: &mut Dom) {
        let page = self.page.clone();
        let mut scripts = Vec::new();

        for id in dom.descendants(dom.document()) {
            let Some(tag) = dom.element_name(id).map(|n| n.to_string()) else {
                continue;
            };

            if self.options.strip_scripts {
                if tag == "script" {
                    scripts.push(id);
                    continue;
                }
                let removed = dom.remove_attrs(id, is_script_attribute);
                if removed > 0 {
                    trace!(tag = tag.as_str(), removed, "removed script attributes");
                }
            }

            if let Some((attribute, context)) = reference_attribute(dom, id, &tag)
                && let Some(raw) = dom.get_attr(id, attribute).map(str::to_string)
            {
                let label = format!("{tag}[{attribute}]");
                if let Some(value) = self.rewrite_reference(&page, &raw, context, &label, 0) {
                    dom.set_attr(id, attribute, value);
                }
            }

            if self.options.rewrite_css_urls
                && let Some(style) = dom.get_attr(id, "style").map(str::to_string)
            {
                let rewritten = self.rewrite_stylesheet(&style, &page, 0);
                if rewritten != style {
                    dom.set_attr(id, "style", rewritten);
                }
            }

            match tag.as_str() {
                "style" if self.options.rewrite_css_urls => {
                    let texts: Vec<NodeId> = dom.children(id).collect();
                    for text in texts {
                        let Some(css) = dom.text_content(text).map(str::to_string) else {
                            continue;
                        };
                        let rewritten = self.rewrite_stylesheet(&css, &page, 0);
                        if rewritten != css {
                            dom.set_text(text, rewritten);
                        }
                    }
                }
                "meta" => {
                    self.rewrite_refresh(dom, id, &page);
                    declare_utf8(dom, id);
                }
                _ => {}
            }
        }

        if !scripts.is_empty() {
            trace!(count = scripts.len(), "removing scripts");
        }
        for id in scripts {
            dom.detach(id);
        }
    }

    /// Point a `<meta http-equiv="refresh">` redirect at its rewritten target.
    fn rewrite_refresh(&mut self, dom: &mut Dom, meta: NodeId, page: &str) {
        let is_refresh = dom
            .get_attr(meta, "http-equiv")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            return;
        }
        let Some(content) = dom.get_attr(meta, "content").map(str::to_string) else {
            return;
        };
        let Some((delay, target)) = split_refresh(&content) else {
            return;
        };
        if let Some(value) =
            self.rewrite_reference(page, target, ReferenceContext::Hyperlink, "meta[content]", 0)
        {
            dom.set_attr(meta, "content", format!("{delay}; url={value}"));
        }
    }

    /// New value for a reference, or `None` to leave it as written.
    fn rewrite_reference(
        &mut self,
        base: &str,
        raw: &str,
        context: ReferenceContext,
        attribute: &str,
        depth: usize,
    ) -> Option<String> {
        let target = LinkClassifier {
            container: self.container,
            entries: &self.index,
            policy: &self.options.reference_policy,
            page: &self.page,
            archive_name: self.options.archive_name.as_deref(),
        }
        .classify(base, raw, context);
        trace!(reference = raw, kind = ?target.kind, "classified reference");

        match target.kind {
            LinkKind::Anchor => {
                let fragment = target.fragment?;
                (!raw.trim_start().starts_with('#')).then(|| format!("#{fragment}"))
            }
            LinkKind::External => {
                if target.dangling {
                    debug!(attribute, reference = raw, "dangling reference");
                    self.diagnostics.push(Diagnostic::DanglingReference {
                        attribute: attribute.to_string(),
                        reference: raw.to_string(),
                    });
                }
                None
            }
            LinkKind::Page => {
                let entry = target.resolved_entry?;
                Some(self.page_url(&entry, target.fragment))
            }
            LinkKind::Resource => {
                let entry = target.resolved_entry?;
                if context == ReferenceContext::Stylesheet && !self.options.inline_stylesheets {
                    return Some(self.page_url(&entry, None));
                }
                self.inline_resource(&entry, depth)
            }
        }
    }

    fn page_url(&mut self, entry: &str, fragment: Option<String>) -> String {
        self.rewritten_pages += 1;
        let mut url = ArchiveUrl::new(
            self.options.url_scheme.as_str(),
            self.options.archive_name.as_deref().unwrap_or_default(),
            entry,
        );
        url.fragment = fragment;
        url.to_string()
    }

    fn inline_resource(&mut self, entry: &str, depth: usize) -> Option<String> {
        if let Some(uri) = self.inline_cache.get(entry) {
            self.inlined_resources += 1;
            return Some(uri.clone());
        }

        let size = match self.container.entry_size(entry) {
            Ok(size) => size,
            Err(e) => return self.unreadable(entry, e.to_string()),
        };
        if size > self.options.max_inline_bytes {
            return self.unreadable(
                entry,
                format!("{size} bytes exceeds the inline limit of {}", self.options.max_inline_bytes),
            );
        }
        let bytes = match self.container.read_entry(entry) {
            Ok(bytes) => bytes,
            Err(e) => return self.unreadable(entry, e.to_string()),
        };

        let format = detect_media_format(entry, &bytes);
        let uri = if format == MediaFormat::Css {
            if depth >= MAX_STYLESHEET_DEPTH {
                return self.unreadable(entry, "stylesheet imports nested too deeply".to_string());
            }
            let (text, _) = decode_text(&bytes, None);
            let css = if self.options.rewrite_css_urls {
                self.rewrite_stylesheet(&text, entry, depth + 1)
            } else {
                text.into_owned()
            };
            data_uri("text/css;charset=utf-8", css.as_bytes())
        } else {
            data_uri(format.mime_type(), &bytes)
        };

        debug!(entry, bytes = bytes.len(), mime = format.mime_type(), "inlined resource");
        self.inlined_resources += 1;
        if format != MediaFormat::Css || depth == 0 {
            self.inline_cache.insert(entry.to_string(), uri.clone());
        }
        Some(uri)
    }

    fn unreadable(&mut self, entry: &str, reason: String) -> Option<String> {
        warn!(entry, %reason, "resource left as reference");
        self.diagnostics.push(Diagnostic::UnreadableResource {
            entry: entry.to_string(),
            reason,
        });
        None
    }

    /// Rewrite stylesheet text whose references are relative to `base`.
    fn rewrite_stylesheet(&mut self, css: &str, base: &str, depth: usize) -> String {
        rewrite_css_references(css, |url, reference| {
            let context = match reference {
                CssReference::Import => ReferenceContext::Stylesheet,
                CssReference::Url => ReferenceContext::Embedded,
            };
            self.rewrite_reference(base, url, context, "css url()", depth)
        })
    }
}

/// The attribute of `tag` that carries a reference, with its context.
fn reference_attribute(dom: &Dom, id: NodeId, tag: &str) -> Option<(&'static str, ReferenceContext)> {
    let found = match tag {
        "a" | "area" => ("href", ReferenceContext::Hyperlink),
        "frame" | "iframe" => ("src", ReferenceContext::Hyperlink),
        "img" | "input" | "script" | "embed" => ("src", ReferenceContext::Embedded),
        "object" => ("data", ReferenceContext::Embedded),
        "link" => {
            let stylesheet = dom.get_attr(id, "rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|t| t.eq_ignore_ascii_case("stylesheet"))
            });
            let context = if stylesheet {
                ReferenceContext::Stylesheet
            } else {
                ReferenceContext::Embedded
            };
            ("href", context)
        }
        "body" | "table" | "td" | "th" => ("background", ReferenceContext::Embedded),
        _ => return None,
    };
    Some(found)
}

/// Attributes whose value is loaded or navigated to as a URL.
const URL_ATTRIBUTES: [&str; 8] = [
    "href", "src", "action", "formaction", "data", "background", "lowsrc", "dynsrc",
];

/// Event handlers, and URL attributes using a script scheme.
fn is_script_attribute(attr: &Attribute) -> bool {
    let name: &str = &attr.name.local;
    if name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on")) {
        return true;
    }
    if !URL_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name)) {
        return false;
    }
    // Browsers ignore whitespace and control characters inside the scheme.
    let compact: String = attr
        .value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    url_scheme(&compact)
        .is_some_and(|s| s.eq_ignore_ascii_case("javascript") || s.eq_ignore_ascii_case("vbscript"))
}

/// Split refresh content (`5; url=next.htm`) into its delay and target.
fn split_refresh(content: &str) -> Option<(&str, &str)> {
    let split = content.find([';', ','])?;
    let delay = content[..split].trim();
    let rest = content[split + 1..].trim_start();
    let target = rest
        .get(..3)
        .filter(|p| p.eq_ignore_ascii_case("url"))
        .and_then(|_| rest[3..].trim_start().strip_prefix('='))
        .unwrap_or(rest);
    let target = target.trim().trim_matches(['\'', '"']);
    (!target.is_empty()).then_some((delay, target))
}

/// Point charset declarations at the UTF-8 output.
fn declare_utf8(dom: &mut Dom, meta: NodeId) {
    if dom.get_attr(meta, "charset").is_some() {
        dom.set_attr(meta, "charset", "utf-8".to_string());
    }
    let is_content_type = dom
        .get_attr(meta, "http-equiv")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"));
    if is_content_type {
        dom.set_attr(meta, "content", format!("{CONTENT_TYPE_HINT}; charset=utf-8"));
    }
}

fn document_title(dom: &Dom) -> Option<String> {
    let title = dom.find_by_tag("title")?;
    let text = dom.text_of(title);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;
    use crate::dom::parse_html;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn archive() -> MemoryContainer {
        MemoryContainer::new()
            .with_entry(
                "/html/page.htm",
                r##"<html><head><title> Getting
                Started </title>
                <meta http-equiv="Content-Type" content="text/html; charset=windows-1252">
                <link rel="stylesheet" href="../css/main.css">
                <style>h1 { background: url(../images/pic.png) }</style>
                <script src="../js/app.js"></script>
                <script>alert(1)</script></head>
                <body background="../images/pic.png">
                <a href="#top">top</a>
                <a href="page.htm#usage">usage</a>
                <a href="other.htm">other</a>
                <a href="http://example.com/">web</a>
                <img src="../images/pic.png">
                <img src="ghost.png">
                <p style="background: url('../images/pic.png')">x</p>
                </body></html>"##,
            )
            .with_entry("/html/other.htm", "<html><body>other</body></html>")
            .with_entry("/images/pic.png", PNG)
            .with_entry("/css/main.css", "@import \"base.css\";\nbody { background: url(../images/pic.png) }")
            .with_entry("/css/base.css", "p { color: red }")
            .with_entry("/js/app.js", "console.log(1)")
    }

    fn adapt_page(options: AdaptOptions) -> (String, AdaptedDocument) {
        let doc = DocumentAdapter::new(options)
            .adapt("/html/page.htm", &archive())
            .unwrap();
        (String::from_utf8(doc.bytes.clone()).unwrap(), doc)
    }

    #[test]
    fn test_references_are_rewritten_by_kind() {
        let (html, doc) = adapt_page(AdaptOptions::default().with_archive_name("help.chm"));
        let png = format!("data:image/png;base64,{}", STANDARD.encode(PNG));

        assert!(html.contains("href=\"#top\""));
        assert!(html.contains("href=\"#usage\""));
        assert!(html.contains("href=\"chm://help.chm/html/other.htm\""));
        assert!(html.contains("href=\"http://example.com/\""));
        assert!(html.contains(&format!("<img src=\"{png}\">")));
        assert!(html.contains("src=\"ghost.png\""));
        assert!(html.contains(&format!("background=\"{png}\"")));
        assert!(!html.contains("../images/pic.png"));

        assert_eq!(doc.metadata.rewritten_pages, 1);
        assert_eq!(
            doc.diagnostics
                .iter()
                .filter(|d| matches!(d, Diagnostic::DanglingReference { .. }))
                .collect::<Vec<_>>(),
            [&Diagnostic::DanglingReference {
                attribute: "img[src]".to_string(),
                reference: "ghost.png".to_string(),
            }]
        );
    }

    #[test]
    fn test_stylesheets_are_inlined_recursively() {
        let (html, _) = adapt_page(AdaptOptions::default());
        let dom = parse_html(html.as_bytes()).dom;
        let link = dom.find_by_tag("link").unwrap();
        let href = dom.get_attr(link, "href").unwrap();
        let encoded = href.strip_prefix("data:text/css;charset=utf-8;base64,").unwrap();
        let css = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();

        assert!(css.starts_with("@import url(\"data:text/css;charset=utf-8;base64,"));
        assert!(css.contains("url(\"data:image/png;base64,"));

        let style = dom.find_by_tag("style").unwrap();
        assert!(dom.text_of(style).contains("url(\"data:image/png;base64,"));
        let p = dom.find_by_tag("p").unwrap();
        assert!(dom.get_attr(p, "style").unwrap().contains("data:image/png"));
    }

    #[test]
    fn test_stylesheet_links_without_inlining() {
        let (html, _) = adapt_page(AdaptOptions::default().with_inline_stylesheets(false));
        assert!(html.contains("href=\"chm:///css/main.css\""));
    }

    #[test]
    fn test_scripts_are_stripped_unless_kept() {
        let (html, _) = adapt_page(AdaptOptions::default());
        assert!(!html.contains("<script"));

        let (html, _) = adapt_page(AdaptOptions::default().with_strip_scripts(false));
        assert!(html.contains("alert(1)"));
        assert!(html.contains("src=\"data:text/javascript;base64,"));
    }

    #[test]
    fn test_metadata_and_charset_declaration() {
        let (html, doc) = adapt_page(AdaptOptions::default());
        assert!(html.contains("content=\"text/html; charset=utf-8\""));
        assert_eq!(doc.metadata.title, "Getting Started");
        assert_eq!(doc.metadata.suggested_name, "page.html");
        assert_eq!(doc.metadata.entry_name, "/html/page.htm");
        assert_eq!(doc.metadata.source_encoding, "UTF-8");

        let map = doc.metadata.to_map();
        assert_eq!(map["contentTypeHint"], "text/html");
        assert_eq!(map["suggestedName"], "page.html");
    }

    #[test]
    fn test_title_falls_back_to_file_stem() {
        let archive = MemoryContainer::new().with_entry("/Topics/Intro.htm", "<p>no title</p>");
        let doc = adapt("topics/intro.htm", &archive).unwrap();
        assert_eq!(doc.metadata.title, "Intro");
        assert_eq!(doc.metadata.entry_name, "/Topics/Intro.htm");
    }

    #[test]
    fn test_oversized_resource_is_left_as_reference() {
        let (html, doc) = adapt_page(AdaptOptions::default().with_max_inline_bytes(4));
        assert!(html.contains("<img src=\"../images/pic.png\">"));
        assert!(doc.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UnreadableResource { entry, .. } if entry == "/images/pic.png"
        )));
    }

    #[test]
    fn test_missing_entry_fails() {
        let err = adapt("missing.html", &archive()).unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(name) if name == "missing.html"));
    }

    #[test]
    fn test_self_importing_stylesheet_terminates() {
        let archive = MemoryContainer::new()
            .with_entry("/a.htm", "<link rel=stylesheet href=loop.css>")
            .with_entry("/loop.css", "@import \"loop.css\";");
        let doc = adapt("/a.htm", &archive).unwrap();
        assert!(doc.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UnreadableResource { entry, .. } if entry == "/loop.css"
        )));
    }

    #[test]
    fn test_event_handlers_and_script_urls_are_removed() {
        let archive = MemoryContainer::new()
            .with_entry(
                "/a.htm",
                r#"<body onload="alert(1)"><img src="pic.png" onerror="alert(2)" alt="javascript: tips">
                <a href="javascript:alert(3)">x</a><a href=" JaVa&#x09;script:alert(4)">y</a>
                <a href="b.htm" onclick="alert(5)">b</a></body>"#,
            )
            .with_entry("/pic.png", PNG)
            .with_entry("/b.htm", "<p>b</p>");

        let doc = adapt("/a.htm", &archive).unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();
        assert!(!html.contains("alert("), "{html}");
        assert!(html.contains("<a>x</a><a>y</a>"));
        assert!(html.contains("alt=\"javascript: tips\""));
        assert!(html.contains("href=\"chm:///b.htm\""));

        let kept = DocumentAdapter::new(AdaptOptions::default().with_strip_scripts(false))
            .adapt("/a.htm", &archive)
            .unwrap();
        let html = String::from_utf8(kept.bytes).unwrap();
        assert!(html.contains("onload=\"alert(1)\""));
        assert!(html.contains("href=\"javascript:alert(3)\""));
    }

    #[test]
    fn test_refresh_and_object_targets_are_rewritten() {
        let archive = MemoryContainer::new()
            .with_entry(
                "/html/a.htm",
                r#"<meta http-equiv="Refresh" content="0; URL='b.htm#top'">
                <object data="../media/clip.htm"></object>"#,
            )
            .with_entry("/html/b.htm", "<p>b</p>")
            .with_entry("/media/clip.htm", "<p>clip</p>");

        let doc = DocumentAdapter::new(AdaptOptions::default().with_archive_name("help.chm"))
            .adapt("/html/a.htm", &archive)
            .unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();
        assert!(html.contains("content=\"0; url=chm://help.chm/html/b.htm#top\""), "{html}");
        assert!(html.contains("data=\"chm://help.chm/media/clip.htm\""));
        assert_eq!(doc.metadata.rewritten_pages, 2);
    }

    #[test]
    fn test_split_refresh() {
        assert_eq!(split_refresh("0; url=next.htm"), Some(("0", "next.htm")));
        assert_eq!(split_refresh("5;URL = 'a b.htm'"), Some(("5", "a b.htm")));
        assert_eq!(split_refresh("3, urlpage.htm"), Some(("3", "urlpage.htm")));
        assert_eq!(split_refresh("10"), None);
        assert_eq!(split_refresh("1; url="), None);
    }

    #[test]
    fn test_stylesheet_cut_off_when_nested_is_complete_when_linked() {
        let archive = MemoryContainer::new()
            .with_entry(
                "/a.htm",
                "<link rel=stylesheet href=s0.css><link rel=stylesheet href=s3.css>",
            )
            .with_entry("/s0.css", "@import \"s1.css\";")
            .with_entry("/s1.css", "@import \"s2.css\";")
            .with_entry("/s2.css", "@import \"s3.css\";")
            .with_entry("/s3.css", "@import \"deep.css\";")
            .with_entry("/deep.css", "p { color: red }");

        let doc = adapt("/a.htm", &archive).unwrap();
        assert!(doc.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UnreadableResource { entry, .. } if entry == "/deep.css"
        )));

        let dom = parse_html(&doc.bytes).dom;
        let links: Vec<_> = dom
            .descendants(dom.document())
            .into_iter()
            .filter(|&id| dom.element_name(id).is_some_and(|n| n.as_ref() == "link"))
            .collect();
        let href = dom.get_attr(links[1], "href").unwrap();
        let encoded = href.strip_prefix("data:text/css;charset=utf-8;base64,").unwrap();
        let css = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(css.starts_with("@import url(\"data:text/css;charset=utf-8;base64,"), "{css}");
        assert!(!css.contains("deep.css"));
    }
}
