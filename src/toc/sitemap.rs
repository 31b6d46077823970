//! HTML sitemap (`.hhc`) reader.
//!
//! Besides the binary navigation index, most archives carry their contents
//! as an HTML sitemap: nested lists whose items hold
//! `<object type="text/sitemap">` elements with `Name` and `Local` params.
//! Item depth is the number of enclosing lists minus one.

use crate::dom::{Dom, NodeId, parse_html};

use super::TocRecord;

/// Parse a sitemap document into flat, depth-annotated records.
///
/// Objects of any other type (such as the leading `text/site properties`
/// block) are skipped. Malformed markup is tolerated. Titles are returned
/// escaped, like those of the binary index, so [`TocBuilder`](super::TocBuilder)
/// decodes them exactly once.
pub fn parse_sitemap(bytes: &[u8]) -> Vec<TocRecord> {
    let parsed = parse_html(bytes);
    let dom = &parsed.dom;

    let mut records = Vec::new();
    let mut stack: Vec<(NodeId, u32)> = vec![(dom.document(), 0)];

    while let Some((id, lists)) = stack.pop() {
        let name = dom.element_name(id).map(|n| n.to_ascii_lowercase());
        let lists = match name.as_deref() {
            Some("ul" | "ol") => lists + 1,
            Some("object") => {
                if let Some(record) = sitemap_record(dom, id, lists.saturating_sub(1)) {
                    records.push(record);
                }
                continue;
            }
            _ => lists,
        };

        let mark = stack.len();
        stack.extend(dom.children(id).map(|c| (c, lists)));
        stack[mark..].reverse();
    }

    records
}

fn sitemap_record(dom: &Dom, object: NodeId, depth: u32) -> Option<TocRecord> {
    let is_sitemap = dom
        .get_attr(object, "type")
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("text/sitemap"));
    if !is_sitemap {
        return None;
    }

    let mut title = None;
    let mut local = None;
    for param in dom.descendants(object) {
        if !dom.element_name(param).is_some_and(|n| n.as_ref().eq_ignore_ascii_case("param")) {
            continue;
        }
        let (Some(name), Some(value)) = (dom.get_attr(param, "name"), dom.get_attr(param, "value"))
        else {
            continue;
        };
        if name.eq_ignore_ascii_case("name") && title.is_none() {
            // The parser already resolved references; records carry escaped titles.
            title = Some(value.replace('&', "&amp;"));
        } else if name.eq_ignore_ascii_case("local") && local.is_none() {
            local = Some(value.to_string());
        }
    }

    let mut record = TocRecord::new(title.unwrap_or_default(), depth);
    record.entry_ref = local;
    Some(record)
}
