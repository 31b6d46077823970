//! Classification of references found in archive pages.
//!
//! Pages reference each other and their resources in several ways:
//! - **Anchors**: `#section-2`
//! - **Archive-relative**: `../images/logo.gif`, `topic.htm#usage`
//! - **InfoTech storage**: `ms-its:help.chm::/html/topic.htm`
//! - **External**: `http://...`, `mailto:...`, `javascript:...`
//!
//! Archive-relative references are resolved against the referring entry and
//! checked against the container. A reference that names no entry is
//! downgraded to [`LinkKind::External`] and left untouched.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use crate::container::{Container, EntryIndex};
use crate::util::{
    base_name, extension, looks_like_markup, resolve_path, split_its_reference, url_scheme,
};

/// What a reference points at, from the point of view of a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Another page of the archive; rewritten to a synthetic archive URL.
    Page,
    /// An image, stylesheet, or other resource; inlined as a data payload.
    Resource,
    /// A location within the page being adapted.
    Anchor,
    /// Anything outside the archive, or an archive path with no entry.
    External,
}

/// The element context a reference appears in.
///
/// Used only when neither the extension nor the content decides between
/// page and resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceContext {
    /// `a[href]`, `area[href]`, `frame[src]`, `iframe[src]`
    Hyperlink,
    /// `img[src]`, `background`, `url()` in CSS
    Embedded,
    /// `link[rel=stylesheet]` and CSS `@import`
    Stylesheet,
}

/// A classified reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub kind: LinkKind,
    /// The literal attribute value.
    pub raw: String,
    /// Container entry name; set for [`LinkKind::Page`] and [`LinkKind::Resource`].
    pub resolved_entry: Option<String>,
    pub fragment: Option<String>,
    /// True when the reference looked archive-relative but named no entry.
    pub dangling: bool,
}

impl LinkTarget {
    fn outside(kind: LinkKind, raw: &str) -> Self {
        Self {
            kind,
            raw: raw.to_string(),
            resolved_entry: None,
            fragment: None,
            dangling: false,
        }
    }
}

/// How to decide between page and resource for an archive entry.
///
/// The extension lists are consulted first. An entry with an unlisted
/// extension is sniffed for a markup prefix when `sniff_content` is set,
/// and otherwise classified by the element context it is referenced from.
#[derive(Debug, Clone)]
pub struct ReferencePolicy {
    page_extensions: Vec<String>,
    resource_extensions: Vec<String>,
    sniff_content: bool,
}

const PAGE_EXTENSIONS: &[&str] = &["htm", "html", "xhtml", "shtml", "hhc", "hhk"];

const RESOURCE_EXTENSIONS: &[&str] = &[
    "gif", "jpg", "jpeg", "png", "bmp", "ico", "svg", "webp", "css", "js", "ttf", "otf", "woff",
    "woff2",
];

impl Default for ReferencePolicy {
    fn default() -> Self {
        Self {
            page_extensions: PAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            resource_extensions: RESOURCE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            sniff_content: true,
        }
    }
}

impl ReferencePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat entries with this extension as pages.
    pub fn with_page_extension(mut self, ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.resource_extensions.retain(|e| *e != ext);
        if !self.page_extensions.contains(&ext) {
            self.page_extensions.push(ext);
        }
        self
    }

    /// Treat entries with this extension as resources.
    pub fn with_resource_extension(mut self, ext: &str) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.page_extensions.retain(|e| *e != ext);
        if !self.resource_extensions.contains(&ext) {
            self.resource_extensions.push(ext);
        }
        self
    }

    pub fn with_sniff_content(mut self, sniff: bool) -> Self {
        self.sniff_content = sniff;
        self
    }

    fn kind_by_extension(&self, entry: &str) -> Option<LinkKind> {
        let ext = extension(entry)?.to_ascii_lowercase();
        if self.page_extensions.contains(&ext) {
            Some(LinkKind::Page)
        } else if self.resource_extensions.contains(&ext) {
            Some(LinkKind::Resource)
        } else {
            None
        }
    }

    fn kind_for(
        &self,
        entry: &str,
        context: ReferenceContext,
        container: &dyn Container,
    ) -> LinkKind {
        if let Some(kind) = self.kind_by_extension(entry) {
            return kind;
        }

        if self.sniff_content
            && let Ok(bytes) = container.read_entry(entry)
        {
            return if looks_like_markup(&bytes) {
                LinkKind::Page
            } else {
                LinkKind::Resource
            };
        }

        match context {
            ReferenceContext::Hyperlink => LinkKind::Page,
            ReferenceContext::Embedded | ReferenceContext::Stylesheet => LinkKind::Resource,
        }
    }
}

/// Classifies references relative to one page of one archive.
pub struct LinkClassifier<'a> {
    pub container: &'a dyn Container,
    pub entries: &'a EntryIndex,
    pub policy: &'a ReferencePolicy,
    /// Stored entry name of the page being adapted.
    pub page: &'a str,
    /// File name of the archive, used to recognise `ms-its:` self-references.
    /// When unknown, every `ms-its:` reference is assumed to be a self-reference.
    pub archive_name: Option<&'a str>,
}

impl LinkClassifier<'_> {
    /// Classify `raw` as it appears in the entry `base`.
    ///
    /// `base` is the page itself for markup references and the stylesheet's
    /// own entry for references inside an inlined stylesheet.
    pub fn classify(&self, base: &str, raw: &str, context: ReferenceContext) -> LinkTarget {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return LinkTarget::outside(LinkKind::Anchor, raw);
        }
        if let Some(fragment) = trimmed.strip_prefix('#') {
            return LinkTarget {
                fragment: (!fragment.is_empty()).then(|| fragment.to_string()),
                ..LinkTarget::outside(LinkKind::Anchor, raw)
            };
        }

        let (base, reference) = match split_its_reference(trimmed) {
            Some((archive, path)) if !path.is_empty() && self.is_same_archive(archive) => ("", path),
            Some(_) => return LinkTarget::outside(LinkKind::External, raw),
            None if url_scheme(trimmed).is_some() || trimmed.starts_with("//") => {
                return LinkTarget::outside(LinkKind::External, raw);
            }
            None => (base, trimmed),
        };

        let reference = reference.replace('\\', "/");
        let (path, fragment) = match reference.split_once('#') {
            Some((p, f)) => (p, (!f.is_empty()).then(|| f.to_string())),
            None => (reference.as_str(), None),
        };
        let path = path.split('?').next().unwrap_or(path);

        if path.is_empty() {
            return LinkTarget {
                fragment,
                ..LinkTarget::outside(LinkKind::Anchor, raw)
            };
        }

        let decoded = percent_decode_str(path)
            .decode_utf8()
            .unwrap_or(Cow::Borrowed(path));
        let candidate = resolve_path(base, &decoded);

        let Some(entry) = self.entries.resolve(&candidate) else {
            return LinkTarget {
                fragment,
                dangling: true,
                ..LinkTarget::outside(LinkKind::External, raw)
            };
        };

        let kind = if entry == self.page && fragment.is_some() {
            LinkKind::Anchor
        } else {
            self.policy.kind_for(entry, context, self.container)
        };

        LinkTarget {
            kind,
            raw: raw.to_string(),
            resolved_entry: Some(entry.to_string()),
            fragment,
            dangling: false,
        }
    }

    fn is_same_archive(&self, archive: &str) -> bool {
        let Some(ours) = self.archive_name else {
            return true;
        };
        let theirs = archive.replace('\\', "/");
        base_name(&theirs).eq_ignore_ascii_case(base_name(&ours.replace('\\', "/")))
    }
}
