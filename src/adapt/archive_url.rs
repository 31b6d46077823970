//! Synthetic URLs for pages of an archive.
//!
//! A preview cannot navigate to another page on its own, so page references
//! are rewritten to `<scheme>://<archive>/<entry>[#fragment]`. The host
//! intercepts this scheme and adapts the named entry on demand.

use std::fmt;

use percent_encoding::{
    AsciiSet, CONTROLS, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode,
};

/// Everything except unreserved characters.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'%');

/// A parsed or constructed synthetic page URL.
///
/// `entry` is the archive path without its leading `/`. Path separators are
/// kept and every segment is percent-encoded on display.
///
/// ```
/// use chmview::ArchiveUrl;
///
/// let url = ArchiveUrl::new("chm", "help.chm", "/html/first steps.htm").with_fragment("usage");
/// assert_eq!(url.to_string(), "chm://help.chm/html/first%20steps.htm#usage");
/// assert_eq!(ArchiveUrl::parse(&url.to_string()), Some(url));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveUrl {
    pub scheme: String,
    pub archive: String,
    pub entry: String,
    pub fragment: Option<String>,
}

impl ArchiveUrl {
    pub fn new(scheme: impl Into<String>, archive: impl Into<String>, entry: &str) -> Self {
        Self {
            scheme: scheme.into(),
            archive: archive.into(),
            entry: entry.trim_start_matches('/').to_string(),
            fragment: None,
        }
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Parse a URL produced by [`Display`](fmt::Display).
    ///
    /// Returns `None` if the text is not of the form `scheme://archive/entry`
    /// or an escape does not decode to UTF-8.
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        let valid_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return None;
        }

        let (rest, fragment) = match rest.split_once('#') {
            Some((r, f)) => (r, Some(decode(f)?)),
            None => (rest, None),
        };
        let (archive, entry) = rest.split_once('/')?;
        if entry.is_empty() {
            return None;
        }

        Some(Self {
            scheme: scheme.to_string(),
            archive: decode(archive)?,
            entry: decode(entry)?,
            fragment,
        })
    }
}

fn decode(s: &str) -> Option<String> {
    percent_decode_str(s)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

impl fmt::Display for ArchiveUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, utf8_percent_encode(&self.archive, COMPONENT))?;
        for segment in self.entry.split('/') {
            write!(f, "/{}", utf8_percent_encode(segment, COMPONENT))?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", utf8_percent_encode(fragment, FRAGMENT))?;
        }
        Ok(())
    }
}
