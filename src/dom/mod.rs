//! Tolerant HTML parsing into an index arena, and serialization back to bytes.
//!
//! Help-archive pages predate strict markup and routinely leave tags
//! unclosed or use undeclared entities. Parsing uses the HTML5 tree builder,
//! which recovers from every such error the way a browser would.
//!
//! # Example
//!
//! ```
//! use chmview::dom::{parse_html, serialize_document};
//!
//! let parsed = parse_html(b"<P>Unclosed<P>paragraphs");
//! let html = serialize_document(&parsed.dom).unwrap();
//! assert!(html.contains("<p>Unclosed</p><p>paragraphs</p>"));
//! ```

mod arena;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, ChildrenIter, Dom, Node, NodeData, NodeId};
pub use serialize::SerializableNode;
pub use tree_sink::DomSink;

use encoding_rs::Encoding;
use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use tracing::debug;

use crate::util::{decode_text, extract_html_charset, extract_xml_encoding};

/// A parsed page together with what the parser learned about it.
pub struct ParsedHtml {
    pub dom: Dom,
    /// Number of markup errors the tree builder recovered from.
    pub parse_errors: usize,
    /// Encoding the source bytes were decoded with.
    pub encoding: &'static Encoding,
}

/// Parse HTML bytes with encoding detection and error recovery.
///
/// The page's own charset declaration is used as a hint only when the bytes
/// are not valid UTF-8.
pub fn parse_html(bytes: &[u8]) -> ParsedHtml {
    let hint = extract_html_charset(bytes)
        .or_else(|| extract_xml_encoding(bytes).map(str::to_string));
    let (text, encoding) = decode_text(bytes, hint.as_deref());

    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let sink = parse_document(DomSink::new(), opts)
        .from_utf8()
        .one(text.as_bytes());
    let (dom, parse_errors) = sink.into_parts();

    if parse_errors > 0 {
        debug!(parse_errors, encoding = encoding.name(), "recovered from malformed markup");
    }

    ParsedHtml {
        dom,
        parse_errors,
        encoding,
    }
}

/// Serialize a whole document as UTF-8 HTML.
pub fn serialize_document(dom: &Dom) -> std::io::Result<String> {
    let bytes = serialize_document_bytes(dom)?;
    String::from_utf8(bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Serialize a whole document as UTF-8 HTML bytes.
pub fn serialize_document_bytes(dom: &Dom) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let root = SerializableNode {
        dom,
        node: dom.document(),
    };
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut bytes, &root, opts)?;
    Ok(bytes)
}
