//! Stylesheet reference rewriting using cssparser.
//!
//! Finds every `url()` and `@import` target in a stylesheet, a `<style>`
//! element, or a `style` attribute and splices in replacements. Everything
//! between the rewritten tokens is copied byte-for-byte.

use cssparser::{ParseError, Parser, ParserInput, Token};

type CssParseError<'i> = ParseError<'i, ()>;

/// What kind of reference a stylesheet target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssReference {
    /// `url(...)` in a declaration.
    Url,
    /// The target of an `@import` rule.
    Import,
}

struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

/// Rewrite stylesheet references.
///
/// `rewrite` receives each target and returns its replacement URL, or `None`
/// to leave the reference untouched. Replacements are written as
/// `url("...")`.
pub fn rewrite_css_references<F>(css: &str, mut rewrite: F) -> String
where
    F: FnMut(&str, CssReference) -> Option<String>,
{
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut edits = Vec::new();
    collect_edits(&mut parser, &mut rewrite, &mut edits);

    if edits.is_empty() {
        return css.to_string();
    }

    let mut out = String::with_capacity(css.len());
    let mut last = 0;
    for edit in edits {
        if edit.start < last || edit.end > css.len() {
            continue;
        }
        out.push_str(&css[last..edit.start]);
        out.push_str(&edit.replacement);
        last = edit.end;
    }
    out.push_str(&css[last..]);
    out
}

fn collect_edits<F>(parser: &mut Parser, rewrite: &mut F, edits: &mut Vec<Edit>)
where
    F: FnMut(&str, CssReference) -> Option<String>,
{
    let mut in_import = false;

    loop {
        let start = parser.position().byte_index();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let kind = if in_import {
            CssReference::Import
        } else {
            CssReference::Url
        };

        match token {
            Token::AtKeyword(ref name) => in_import = name.eq_ignore_ascii_case("import"),
            Token::Semicolon => in_import = false,
            Token::UnquotedUrl(ref url) => {
                let end = parser.position().byte_index();
                push_edit(edits, rewrite, url, kind, start, end);
            }
            Token::QuotedString(ref url) if in_import => {
                let end = parser.position().byte_index();
                push_edit(edits, rewrite, url, kind, start, end);
            }
            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                let url = parser.parse_nested_block(url_argument);
                let end = parser.position().byte_index();
                if let Ok(url) = url {
                    push_edit(edits, rewrite, &url, kind, start, end);
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|p| {
                    collect_edits(p, rewrite, edits);
                    Ok::<_, CssParseError>(())
                });
                if matches!(token, Token::CurlyBracketBlock) {
                    in_import = false;
                }
            }
            _ => {}
        }
    }
}

fn url_argument<'i>(parser: &mut Parser<'i, '_>) -> Result<String, CssParseError<'i>> {
    Ok(parser.expect_string()?.as_ref().to_string())
}

fn push_edit<F>(
    edits: &mut Vec<Edit>,
    rewrite: &mut F,
    url: &str,
    kind: CssReference,
    start: usize,
    end: usize,
) where
    F: FnMut(&str, CssReference) -> Option<String>,
{
    if let Some(new_url) = rewrite(url, kind) {
        edits.push(Edit {
            start,
            end,
            replacement: format!("url(\"{}\")", escape_css_string(&new_url)),
        });
    }
}

fn escape_css_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(css: &str) -> String {
        rewrite_css_references(css, |url, _| Some(url.to_uppercase()))
    }

    #[test]
    fn test_rewrites_all_url_forms() {
        let css = "a { background: url(a.png) } b { background: url('b.png') } \
                   c { background: url( \"c.png\" ) }";
        assert_eq!(
            upper(css),
            "a { background: url(\"A.PNG\") } b { background: url(\"B.PNG\") } \
             c { background: url(\"C.PNG\") }"
        );
    }

    #[test]
    fn test_import_forms_are_reported_as_imports() {
        let mut seen = Vec::new();
        let out = rewrite_css_references(
            "@import \"base.css\";\n@import url(print.css) print;\nbody { background: url(bg.gif) }",
            |url, kind| {
                seen.push((url.to_string(), kind));
                Some(format!("x-{url}"))
            },
        );
        assert_eq!(
            seen,
            [
                ("base.css".to_string(), CssReference::Import),
                ("print.css".to_string(), CssReference::Import),
                ("bg.gif".to_string(), CssReference::Url),
            ]
        );
        assert!(out.starts_with("@import url(\"x-base.css\");"));
        assert!(out.contains("@import url(\"x-print.css\") print;"));
        assert!(out.contains("background: url(\"x-bg.gif\")"));
    }

    #[test]
    fn test_quoted_strings_outside_imports_are_untouched() {
        let css = "p::before { content: \"url(no.png)\" }";
        assert_eq!(upper(css), css);
    }

    #[test]
    fn test_nested_blocks_and_functions() {
        let css = "@media screen { div { background-image: image-set(url(hi.png) 2x) } }";
        assert_eq!(
            upper(css),
            "@media screen { div { background-image: image-set(url(\"HI.PNG\") 2x) } }"
        );
    }

    #[test]
    fn test_declining_leaves_input_unchanged() {
        let css = "/* keep */ a { background: url(a.png) ; color: red }";
        assert_eq!(rewrite_css_references(css, |_, _| None), css);
    }

    #[test]
    fn test_replacement_is_escaped() {
        let out = rewrite_css_references("a{b:url(x)}", |_, _| Some("q\"uote".to_string()));
        assert_eq!(out, "a{b:url(\"q\\\"uote\")}");
    }
}
