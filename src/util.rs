//! Text decoding and media-type helpers.

use std::borrow::Cow;

use encoding_rs::Encoding;
use memchr::{memchr, memmem};
use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<meta charset>` or `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (the usual code page of help files built on Windows)
///
/// Returns the decoded text together with the encoding that produced it.
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(
    bytes: &'a [u8],
    hint_encoding: Option<&str>,
) -> (Cow<'a, str>, &'static Encoding) {
    let (result, encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return (result, encoding);
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = Encoding::for_label(name.as_bytes())
    {
        let (result, used, _) = encoding.decode(bytes);
        return (result, used);
    }

    let (result, used, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    (result, used)
}

/// Extract encoding from XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` to extract the encoding name.
/// Only the first 100 bytes are checked.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..value_end]).ok()
}

/// Extract the charset named by an HTML `<meta>` declaration.
///
/// Handles both `<meta charset="gbk">` and
/// `<meta http-equiv="Content-Type" content="text/html; charset=gbk">`.
/// Only the first 1024 bytes are scanned, matching browser prescan limits.
pub fn extract_html_charset(bytes: &[u8]) -> Option<String> {
    let check_len = bytes.len().min(1024);
    let prefix = bytes[..check_len].to_ascii_lowercase();

    let pos = memmem::find(&prefix, b"charset=")?;
    let rest = &prefix[pos + b"charset=".len()..];
    let rest = rest
        .strip_prefix(b"\"")
        .or_else(|| rest.strip_prefix(b"'"))
        .unwrap_or(rest);

    let end = rest
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(rest.len());

    let label = std::str::from_utf8(&rest[..end]).ok()?;
    (!label.is_empty()).then(|| label.to_string())
}

/// Detected resource format.
///
/// Media formats commonly found in compiled-help archives.
/// Detection is done via file extension or magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Ico,
    Svg,
    WebP,
    Css,
    JavaScript,
    Html,
    /// Unknown/binary format
    Binary,
}

impl MediaFormat {
    /// Get the MIME type string for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::Bmp => "image/bmp",
            MediaFormat::Ico => "image/x-icon",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Css => "text/css",
            MediaFormat::JavaScript => "text/javascript",
            MediaFormat::Html => "text/html",
            MediaFormat::Binary => "application/octet-stream",
        }
    }
}

/// Detect resource format from an entry name and/or raw bytes.
///
/// Tries extension-based detection first, then falls back to magic bytes.
pub fn detect_media_format(path: &str, data: &[u8]) -> MediaFormat {
    let ext = extension(path).map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg" | "jpeg") => return MediaFormat::Jpeg,
        Some("png") => return MediaFormat::Png,
        Some("gif") => return MediaFormat::Gif,
        Some("bmp") => return MediaFormat::Bmp,
        Some("ico") => return MediaFormat::Ico,
        Some("svg") => return MediaFormat::Svg,
        Some("webp") => return MediaFormat::WebP,
        Some("css") => return MediaFormat::Css,
        Some("js") => return MediaFormat::JavaScript,
        Some("htm" | "html" | "xhtml") => return MediaFormat::Html,
        _ => {}
    }

    if data.starts_with(&[0xFF, 0xD8]) {
        return MediaFormat::Jpeg;
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return MediaFormat::Png;
    }
    if data.starts_with(b"GIF8") {
        return MediaFormat::Gif;
    }
    if data.starts_with(b"BM") && data.len() >= 14 {
        return MediaFormat::Bmp;
    }
    if data.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return MediaFormat::Ico;
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return MediaFormat::WebP;
    }
    if looks_like_markup(data) {
        return MediaFormat::Html;
    }

    MediaFormat::Binary
}

/// Check whether bytes begin (after a BOM and whitespace) with an HTML construct.
pub fn looks_like_markup(data: &[u8]) -> bool {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let head = data[start..].iter().take(16).copied().collect::<Vec<u8>>();
    let head = head.to_ascii_lowercase();

    [&b"<!doctype"[..], b"<html", b"<head", b"<body", b"<!--", b"<title", b"<?xml"]
        .iter()
        .any(|p| head.starts_with(p))
}

/// Extension of the last path segment, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let name = base_name(path);
    let dot = name.rfind('.')?;
    (dot > 0 && dot + 1 < name.len()).then(|| &name[dot + 1..])
}

/// Last path segment of an entry name.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Last path segment without its extension.
pub fn file_stem(path: &str) -> &str {
    let name = base_name(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Resolve an archive-relative reference against the entry it appears in.
///
/// Works purely on `/`-separated names, never on the host file system.
/// A leading `/` anchors the reference at the archive root; `..` above the
/// root is dropped.
pub fn resolve_path(base: &str, rel: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    if !rel.starts_with('/') {
        stack.extend(base.split('/').filter(|s| !s.is_empty()));
        stack.pop();
    }

    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }

    stack.join("/")
}

/// The URL scheme of a reference (`http` in `http://...`), if it has one.
///
/// Single-letter schemes are rejected so `C:\help\page.htm` is not
/// mistaken for a URL.
pub fn url_scheme(s: &str) -> Option<&str> {
    let colon = s.find(':')?;
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && scheme.len() > 1
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

const ITS_PREFIXES: [&str; 3] = ["ms-its:", "mk:@msitstore:", "its:"];

/// Split an InfoTech storage reference into `(archive, path)`.
///
/// `ms-its:help.chm::/html/page.htm` yields `("help.chm", "/html/page.htm")`.
/// A reference naming only the archive yields an empty path.
pub fn split_its_reference(s: &str) -> Option<(&str, &str)> {
    let prefix = ITS_PREFIXES
        .iter()
        .find(|p| s.get(..p.len()).is_some_and(|h| h.eq_ignore_ascii_case(p)))?;
    let rest = &s[prefix.len()..];
    match rest.find("::") {
        Some(pos) => Some((&rest[..pos], &rest[pos + 2..])),
        None => Some((rest, "")),
    }
}

/// Decode HTML character references.
///
/// Each reference is resolved on its own, so an unknown or unterminated one
/// is kept as written without affecting its neighbours.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if memchr(b'&', raw.as_bytes()).is_none() {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let reference = tail[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .filter(|&i| tail.as_bytes()[i + 1] == b';')
            .map(|i| &tail[..i + 2]);
        match reference {
            Some(reference) => {
                match unescape_with(reference, resolve_html5_entity) {
                    Ok(decoded) => out.push_str(&decoded),
                    Err(_) => out.push_str(reference),
                }
                rest = &tail[reference.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_media_format_by_extension() {
        assert_eq!(detect_media_format("image.jpg", &[]), MediaFormat::Jpeg);
        assert_eq!(detect_media_format("image.JPEG", &[]), MediaFormat::Jpeg);
        assert_eq!(detect_media_format("images/logo.png", &[]), MediaFormat::Png);
        assert_eq!(detect_media_format("icon.BMP", &[]), MediaFormat::Bmp);
        assert_eq!(detect_media_format("style.css", &[]), MediaFormat::Css);
        assert_eq!(detect_media_format("page.htm", &[]), MediaFormat::Html);
        assert_eq!(detect_media_format("unknown", &[]), MediaFormat::Binary);
    }

    #[test]
    fn test_detect_media_format_by_magic_bytes() {
        let jpeg_data = [0xFF, 0xD8, 0xFF, 0xE0];
        assert_eq!(detect_media_format("blob", &jpeg_data), MediaFormat::Jpeg);

        let png_data = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_media_format("blob", &png_data), MediaFormat::Png);

        assert_eq!(detect_media_format("blob", b"GIF89a"), MediaFormat::Gif);
        assert_eq!(
            detect_media_format("topic", b"\n  <HTML><BODY></BODY></HTML>"),
            MediaFormat::Html
        );
    }

    #[test]
    fn test_decode_utf8_passthrough() {
        let (text, encoding) = decode_text("Grüße".as_bytes(), Some("windows-1252"));
        assert_eq!(text, "Grüße");
        assert_eq!(encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn test_decode_uses_hint_then_fallback() {
        // "é" in Windows-1252 / Latin-1
        let bytes = b"caf\xE9";
        let (text, encoding) = decode_text(bytes, Some("iso-8859-1"));
        assert_eq!(text, "café");
        assert_eq!(encoding, encoding_rs::WINDOWS_1252);

        let (text, _) = decode_text(bytes, Some("no-such-charset"));
        assert_eq!(text, "café");
    }

    #[test]
    fn test_extract_html_charset() {
        assert_eq!(
            extract_html_charset(b"<html><head><meta charset=\"GB2312\">").as_deref(),
            Some("gb2312")
        );
        assert_eq!(
            extract_html_charset(
                b"<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=windows-1251\">"
            )
            .as_deref(),
            Some("windows-1251")
        );
        assert_eq!(extract_html_charset(b"<html><body>plain</body></html>"), None);
    }

    #[test]
    fn test_extract_xml_encoding() {
        assert_eq!(
            extract_xml_encoding(b"<?xml version=\"1.0\" encoding='Shift_JIS'?><html/>"),
            Some("Shift_JIS")
        );
        assert_eq!(extract_xml_encoding(b"<html/>"), None);
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(extension("html/intro.htm"), Some("htm"));
        assert_eq!(extension("README"), None);
        assert_eq!(extension(".hidden"), None);
        assert_eq!(base_name("a/b/c.png"), "c.png");
        assert_eq!(file_stem("a/b/c.tar.gz"), "c.tar");
        assert_eq!(file_stem("noext"), "noext");
    }

    #[test]
    fn test_resolve_path_parent_dir() {
        assert_eq!(resolve_path("html/topics/a.htm", "../images/logo.png"), "html/images/logo.png");
        assert_eq!(resolve_path("html/a.htm", "./b.htm"), "html/b.htm");
        assert_eq!(resolve_path("a.htm", "../../x.png"), "x.png");
    }

    #[test]
    fn test_resolve_path_absolute() {
        assert_eq!(resolve_path("html/a.htm", "/images/b.gif"), "images/b.gif");
        assert_eq!(resolve_path("/html/a.htm", "b.htm"), "html/b.htm");
    }

    #[test]
    fn test_url_scheme() {
        assert_eq!(url_scheme("http://example.com"), Some("http"));
        assert_eq!(url_scheme("mailto:a@b.c"), Some("mailto"));
        assert_eq!(url_scheme("ms-its:x.chm::/a.htm"), Some("ms-its"));
        assert_eq!(url_scheme("C:\\help\\a.htm"), None);
        assert_eq!(url_scheme("page.htm"), None);
        assert_eq!(url_scheme("page.htm#a:b"), None);
    }

    #[test]
    fn test_split_its_reference() {
        assert_eq!(
            split_its_reference("ms-its:help.chm::/html/page.htm"),
            Some(("help.chm", "/html/page.htm"))
        );
        assert_eq!(
            split_its_reference("mk:@MSITStore:C:\\docs\\help.chm::/a.htm"),
            Some(("C:\\docs\\help.chm", "/a.htm"))
        );
        assert_eq!(split_its_reference("MS-ITS:help.chm"), Some(("help.chm", "")));
        assert_eq!(split_its_reference("http://x/y"), None);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Caf&eacute; &amp; Bar"), "Café & Bar");
        assert_eq!(decode_entities("A&nbsp;B"), "A\u{a0}B");
        assert_eq!(decode_entities("&#8212;&#x41;"), "\u{2014}A");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_decode_entities_keeps_unknown_references() {
        assert_eq!(decode_entities("&bogus; &lt;b&gt;"), "&bogus; <b>");
        assert_eq!(decode_entities("Q & A &amp"), "Q & A &amp");
        assert_eq!(decode_entities("a&&amp;b;"), "a&&b;");
        assert_eq!(decode_entities("&#xZZ;&;"), "&#xZZ;&;");
    }
}
