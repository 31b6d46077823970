//! Table of contents reconstruction.
//!
//! The navigation index of a help archive is a flat stream of records, each
//! annotated with its nesting depth. [`TocBuilder`] restores the hierarchy in
//! one linear pass with an explicit stack of open nodes, storing the result
//! in an arena ([`TableOfContents`]) addressed by [`TopicId`].
//!
//! ```
//! use chmview::{TocBuilder, TocRecord};
//!
//! let toc = TocBuilder::new().build(&[
//!     TocRecord::new("Getting Started", 0).with_entry("start.htm"),
//!     TocRecord::new("Install", 1).with_entry("install.htm"),
//!     TocRecord::new("Reference", 0),
//! ]);
//!
//! let top: Vec<_> = toc.children(toc.root()).iter().map(|&id| toc.node(id).title.as_str()).collect();
//! assert_eq!(top, ["Getting Started", "Reference"]);
//! ```

pub mod sitemap;

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::util::{decode_entities, resolve_path, split_its_reference, url_scheme};

/// Title given to records whose title is empty.
pub const DEFAULT_PLACEHOLDER_TITLE: &str = "Untitled";

/// Title of the synthetic root node.
pub const DEFAULT_ROOT_TITLE: &str = "Contents";

/// One record of a flat, depth-annotated navigation index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocRecord {
    /// Title with HTML character references still escaped.
    pub title: String,
    /// Raw entry reference as stored in the index, if any.
    pub entry_ref: Option<String>,
    pub depth: u32,
}

impl TocRecord {
    pub fn new(title: impl Into<String>, depth: u32) -> Self {
        Self {
            title: title.into(),
            entry_ref: None,
            depth,
        }
    }

    pub fn with_entry(mut self, entry_ref: impl Into<String>) -> Self {
        self.entry_ref = Some(entry_ref.into());
        self
    }
}

/// Index of a node in a [`TableOfContents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId(pub u32);

impl TopicId {
    /// The synthetic root of every tree.
    pub const ROOT: TopicId = TopicId(0);
}

/// A normalized reference to a container entry, with an optional fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct EntryRef {
    /// Archive path without leading slash, percent-decoded.
    pub name: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub fragment: Option<String>,
}

impl EntryRef {
    /// Normalize a raw navigation reference.
    ///
    /// Accepts plain archive paths and `ms-its:`/`mk:@MSITStore:` references,
    /// which are reduced to the path after `::`. Returns `None` for anything
    /// that cannot name an entry: empty or fragment-only references, other
    /// URL schemes, control characters, and undecodable percent escapes.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().any(char::is_control) {
            return None;
        }

        let path = match split_its_reference(raw) {
            Some((_, path)) => path,
            None if url_scheme(raw).is_some() => return None,
            None => raw,
        };

        let path = path.replace('\\', "/");
        let (path, fragment) = match path.split_once('#') {
            Some((p, f)) => (p.to_string(), (!f.is_empty()).then(|| f.to_string())),
            None => (path, None),
        };

        let decoded = percent_decode_str(&path).decode_utf8().ok()?;
        let name = resolve_path("", &format!("/{decoded}"));
        if name.is_empty() {
            return None;
        }

        Some(Self { name, fragment })
    }
}

/// A node of the table of contents.
#[derive(Debug, Clone)]
pub struct TopicNode {
    pub title: String,
    /// Page this topic navigates to; `None` for folder-only topics.
    pub entry: Option<EntryRef>,
    /// Depth in the source index. The root sits one above the shallowest record.
    pub depth: i64,
    children: Vec<TopicId>,
}

impl TopicNode {
    pub fn children(&self) -> &[TopicId] {
        &self.children
    }

    pub fn is_folder(&self) -> bool {
        self.entry.is_none()
    }
}

/// An immutable table of contents tree stored as an arena.
#[derive(Debug, Clone)]
pub struct TableOfContents {
    nodes: Vec<TopicNode>,
}

impl TableOfContents {
    pub fn root(&self) -> TopicId {
        TopicId::ROOT
    }

    /// Get a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this tree.
    pub fn node(&self, id: TopicId) -> &TopicNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get(&self, id: TopicId) -> Option<&TopicNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn children(&self, id: TopicId) -> &[TopicId] {
        self.get(id).map(TopicNode::children).unwrap_or(&[])
    }

    /// Number of topics, excluding the synthetic root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pre-order traversal of all topics (root excluded), paired with their
    /// nesting level below the root (top level = 0).
    pub fn iter_dfs(&self) -> impl Iterator<Item = (TopicId, usize)> + '_ {
        let mut stack: Vec<(TopicId, usize)> = self
            .children(TopicId::ROOT)
            .iter()
            .rev()
            .map(|&id| (id, 0))
            .collect();

        std::iter::from_fn(move || {
            let (id, level) = stack.pop()?;
            stack.extend(self.children(id).iter().rev().map(|&c| (c, level + 1)));
            Some((id, level))
        })
    }

    /// Deepest nesting level below the root, or `None` for an empty tree.
    pub fn max_depth(&self) -> Option<usize> {
        self.iter_dfs().map(|(_, level)| level).max()
    }

    /// First topic (in document order) that navigates to `name`.
    pub fn find_by_entry(&self, name: &str) -> Option<TopicId> {
        let name = name.trim_start_matches('/');
        self.iter_dfs().map(|(id, _)| id).find(|&id| {
            self.node(id)
                .entry
                .as_ref()
                .is_some_and(|e| e.name.eq_ignore_ascii_case(name))
        })
    }

    /// Topics from the top level down to `target`, inclusive.
    pub fn path_to(&self, target: TopicId) -> Option<Vec<TopicId>> {
        let mut path = Vec::new();
        self.find_path(TopicId::ROOT, target, &mut path)
            .then_some(path)
            .filter(|p| !p.is_empty())
    }

    fn find_path(&self, from: TopicId, target: TopicId, path: &mut Vec<TopicId>) -> bool {
        for &child in self.children(from) {
            path.push(child);
            if child == target || self.find_path(child, target, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

/// Builds a [`TableOfContents`] from depth-annotated records.
#[derive(Debug, Clone)]
pub struct TocBuilder {
    placeholder_title: String,
    root_title: String,
}

impl Default for TocBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TocBuilder {
    pub fn new() -> Self {
        Self {
            placeholder_title: DEFAULT_PLACEHOLDER_TITLE.to_string(),
            root_title: DEFAULT_ROOT_TITLE.to_string(),
        }
    }

    pub fn with_placeholder_title(mut self, title: impl Into<String>) -> Self {
        self.placeholder_title = title.into();
        self
    }

    pub fn with_root_title(mut self, title: impl Into<String>) -> Self {
        self.root_title = title.into();
        self
    }

    /// Reconstruct the hierarchy from a flat record stream.
    ///
    /// Each record becomes the last child of the nearest preceding open node
    /// with a strictly smaller depth. A jump of more than one level nests the
    /// record directly under that node; no intermediate folders are made up.
    /// A drop of any size closes every level down to the record's depth.
    pub fn build(&self, records: &[TocRecord]) -> TableOfContents {
        let root_depth = records
            .iter()
            .map(|r| i64::from(r.depth))
            .min()
            .unwrap_or(0)
            - 1;

        let mut nodes = Vec::with_capacity(records.len() + 1);
        nodes.push(TopicNode {
            title: self.root_title.clone(),
            entry: None,
            depth: root_depth,
            children: Vec::new(),
        });

        let mut open: Vec<TopicId> = vec![TopicId::ROOT];
        let mut folders = 0usize;

        for record in records {
            let depth = i64::from(record.depth);
            while open.len() > 1
                && open
                    .last()
                    .is_some_and(|&top| nodes[top.0 as usize].depth >= depth)
            {
                open.pop();
            }

            let entry = record.entry_ref.as_deref().and_then(EntryRef::parse);
            if entry.is_none() {
                folders += 1;
            }

            let id = TopicId(nodes.len() as u32);
            nodes.push(TopicNode {
                title: self.decode_title(&record.title),
                entry,
                depth,
                children: Vec::new(),
            });

            let parent = open.last().copied().unwrap_or(TopicId::ROOT);
            nodes[parent.0 as usize].children.push(id);
            open.push(id);
        }

        let toc = TableOfContents { nodes };
        debug!(
            records = records.len(),
            folders,
            max_depth = ?toc.max_depth(),
            "built table of contents"
        );
        toc
    }

    fn decode_title(&self, raw: &str) -> String {
        let decoded = decode_entities(raw);
        let title = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.is_empty() {
            self.placeholder_title.clone()
        } else {
            title
        }
    }
}

/// Build a table of contents with default options.
pub fn build_toc(records: &[TocRecord]) -> TableOfContents {
    TocBuilder::new().build(records)
}

#[cfg(feature = "cli")]
mod serialize {
    use serde::ser::{Serialize, SerializeSeq, SerializeStruct, Serializer};

    use super::{TableOfContents, TopicId};

    struct TopicView<'a> {
        toc: &'a TableOfContents,
        id: TopicId,
    }

    struct ChildrenView<'a> {
        toc: &'a TableOfContents,
        id: TopicId,
    }

    impl Serialize for TopicView<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let node = self.toc.node(self.id);
            let mut state = serializer.serialize_struct("Topic", 3)?;
            state.serialize_field("title", &node.title)?;
            state.serialize_field("entry", &node.entry)?;
            state.serialize_field(
                "children",
                &ChildrenView {
                    toc: self.toc,
                    id: self.id,
                },
            )?;
            state.end()
        }
    }

    impl Serialize for ChildrenView<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let children = self.toc.children(self.id);
            let mut seq = serializer.serialize_seq(Some(children.len()))?;
            for &id in children {
                seq.serialize_element(&TopicView { toc: self.toc, id })?;
            }
            seq.end()
        }
    }

    impl Serialize for TableOfContents {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            ChildrenView {
                toc: self,
                id: self.root(),
            }
            .serialize(serializer)
        }
    }
}
