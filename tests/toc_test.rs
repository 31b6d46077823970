//! Table of contents reconstruction from flat navigation records.

use chmview::{EntryRef, TableOfContents, TocBuilder, TocRecord, TopicId, build_toc, parse_sitemap};
use proptest::prelude::*;

fn rec(title: &str, depth: u32) -> TocRecord {
    TocRecord::new(title, depth)
}

fn titles_in_order(toc: &TableOfContents) -> Vec<String> {
    toc.iter_dfs()
        .map(|(id, _)| toc.node(id).title.clone())
        .collect()
}

#[test]
fn test_two_level_tree() {
    let toc = build_toc(&[rec("A", 0), rec("B", 1), rec("C", 1), rec("D", 0)]);

    let top = toc.children(toc.root());
    assert_eq!(top.len(), 2);
    let (a, d) = (top[0], top[1]);
    assert_eq!(toc.node(a).title, "A");
    assert_eq!(toc.node(d).title, "D");

    let under_a: Vec<_> = toc.children(a).iter().map(|&id| toc.node(id).title.as_str()).collect();
    assert_eq!(under_a, ["B", "C"]);
    for &leaf in toc.children(a) {
        assert!(toc.children(leaf).is_empty());
    }
    assert!(toc.children(d).is_empty());
}

#[test]
fn test_depth_jump_attaches_to_open_node() {
    let toc = build_toc(&[rec("A", 0), rec("B", 2)]);

    assert_eq!(toc.len(), 2);
    let a = toc.children(toc.root())[0];
    let b = toc.children(a)[0];
    assert_eq!(toc.node(b).title, "B");
    assert_eq!(toc.node(b).depth, 2);
    assert_eq!(toc.max_depth(), Some(1));
}

#[test]
fn test_decrease_closes_several_levels() {
    let toc = build_toc(&[rec("A", 0), rec("B", 1), rec("C", 2), rec("D", 3), rec("E", 1)]);
    let a = toc.children(toc.root())[0];
    let under_a: Vec<_> = toc.children(a).iter().map(|&id| toc.node(id).title.as_str()).collect();
    assert_eq!(under_a, ["B", "E"]);
}

#[test]
fn test_first_record_sets_top_level() {
    let toc = build_toc(&[rec("A", 3), rec("B", 4), rec("C", 3)]);
    assert_eq!(toc.node(toc.root()).depth, 2);
    assert_eq!(toc.children(toc.root()).len(), 2);
}

#[test]
fn test_empty_titles_and_bad_references_are_kept() {
    let toc = TocBuilder::new().with_placeholder_title("(no title)").build(&[
        rec("  ", 0).with_entry("intro.htm"),
        rec("Web", 0).with_entry("http://example.com/"),
        rec("Blank", 0).with_entry(""),
    ]);

    let top = toc.children(toc.root());
    assert_eq!(top.len(), 3);
    assert_eq!(toc.node(top[0]).title, "(no title)");
    assert_eq!(
        toc.node(top[0]).entry,
        Some(EntryRef {
            name: "intro.htm".to_string(),
            fragment: None
        })
    );
    assert!(toc.node(top[1]).is_folder());
    assert!(toc.node(top[2]).is_folder());
}

#[test]
fn test_titles_are_entity_decoded() {
    let toc = build_toc(&[rec("Q&amp;A &#8212; &lt;tips&gt;", 0)]);
    let top = toc.children(toc.root())[0];
    assert_eq!(toc.node(top).title, "Q&A \u{2014} <tips>");
}

#[test]
fn test_entry_references_are_normalized() {
    let toc = build_toc(&[
        rec("Its", 0).with_entry("ms-its:help.chm::/html/First%20Steps.htm#install"),
        rec("Slash", 0).with_entry("\\html\\other.htm"),
    ]);
    let top = toc.children(toc.root());
    let its = toc.node(top[0]).entry.as_ref().unwrap();
    assert_eq!(its.name, "html/First Steps.htm");
    assert_eq!(its.fragment.as_deref(), Some("install"));
    assert_eq!(toc.node(top[1]).entry.as_ref().unwrap().name, "html/other.htm");
}

#[test]
fn test_queries() {
    let toc = build_toc(&[
        rec("Guide", 0),
        rec("Install", 1).with_entry("install.htm"),
        rec("Linux", 2).with_entry("install/linux.htm"),
        rec("Reference", 0).with_entry("ref.htm"),
    ]);

    let linux = toc.find_by_entry("/INSTALL/Linux.htm").unwrap();
    let path: Vec<_> = toc
        .path_to(linux)
        .unwrap()
        .into_iter()
        .map(|id| toc.node(id).title.as_str())
        .collect();
    assert_eq!(path, ["Guide", "Install", "Linux"]);

    assert_eq!(toc.find_by_entry("missing.htm"), None);
    assert_eq!(toc.path_to(TopicId::ROOT), None);
    assert_eq!(toc.max_depth(), Some(2));
}

#[test]
fn test_empty_input_yields_bare_root() {
    let toc = build_toc(&[]);
    assert!(toc.is_empty());
    assert_eq!(toc.max_depth(), None);
    assert_eq!(toc.node(toc.root()).title, "Contents");
}

#[test]
fn test_sitemap_to_tree() {
    let hhc = br#"<HTML><BODY><UL>
        <LI><OBJECT type="text/sitemap"><param name="Name" value="Overview"><param name="Local" value="overview.htm"></OBJECT>
        <UL>
            <LI><OBJECT type="text/sitemap"><param name="Name" value="Details"><param name="Local" value="details.htm#top"></OBJECT>
        </UL>
        <LI><OBJECT type="text/sitemap"><param name="Name" value="Appendix"></OBJECT>
    </UL></BODY></HTML>"#;

    let toc = build_toc(&parse_sitemap(hhc));
    assert_eq!(titles_in_order(&toc), ["Overview", "Details", "Appendix"]);

    let details = toc.find_by_entry("details.htm").unwrap();
    assert_eq!(toc.node(details).entry.as_ref().unwrap().fragment.as_deref(), Some("top"));
    assert_eq!(toc.path_to(details).unwrap().len(), 2);
}

/// Depth sequences that start at 0 and never grow by more than one level.
fn well_formed_depths() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec((any::<bool>(), 0u32..4), 1..64)
        .prop_map(|steps| {
            let mut depths = Vec::with_capacity(steps.len());
            let mut current = 0u32;
            for (i, (down, amount)) in steps.into_iter().enumerate() {
                if i > 0 {
                    current = if down {
                        current.saturating_sub(amount)
                    } else {
                        current + 1
                    };
                }
                depths.push(current);
            }
            depths
        })
}

proptest! {
    #[test]
    fn prop_preorder_matches_input_order(depths in well_formed_depths()) {
        let records: Vec<_> = depths
            .iter()
            .enumerate()
            .map(|(i, &d)| rec(&format!("t{i}"), d))
            .collect();
        let toc = build_toc(&records);

        let expected: Vec<_> = records.iter().map(|r| r.title.clone()).collect();
        prop_assert_eq!(titles_in_order(&toc), expected);
    }

    #[test]
    fn prop_max_depth_matches_input(depths in well_formed_depths()) {
        let records: Vec<_> = depths.iter().map(|&d| rec("t", d)).collect();
        let toc = build_toc(&records);

        let max = depths.iter().copied().max().map(|d| d as usize);
        prop_assert_eq!(toc.max_depth(), max);
        for (id, level) in toc.iter_dfs() {
            prop_assert_eq!(toc.node(id).depth, level as i64);
        }
    }

    #[test]
    fn prop_children_are_deeper_than_parents(depths in prop::collection::vec(0u32..6, 1..48)) {
        let records: Vec<_> = depths.iter().map(|&d| rec("t", d)).collect();
        let toc = build_toc(&records);

        prop_assert_eq!(toc.len(), records.len());
        for (id, _) in toc.iter_dfs() {
            for &child in toc.children(id) {
                prop_assert!(toc.node(child).depth > toc.node(id).depth);
            }
        }
    }
}
