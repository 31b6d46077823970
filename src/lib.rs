//! # chmview
//!
//! Table-of-contents reconstruction and standalone page previews for
//! compiled-help (CHM) archives.
//!
//! ## Features
//!
//! - Rebuild the contents tree from flat, depth-annotated navigation records
//! - Read HTML sitemaps (`.hhc`) into those records
//! - Adapt a single archive page into a self-contained HTML document:
//!   images and stylesheets are inlined, links to other pages become
//!   synthetic [`ArchiveUrl`]s a preview host can resolve
//! - Tolerant HTML5 parsing with legacy code-page detection
//!
//! Archives are consumed through the [`Container`] trait. Decoding the
//! binary archive format itself is left to the caller; [`DirectoryContainer`]
//! serves an already extracted archive.
//!
//! ## Quick Start
//!
//! ```
//! use chmview::{TocBuilder, TocRecord};
//!
//! let records = [
//!     TocRecord::new("Introduction", 0).with_entry("intro.htm"),
//!     TocRecord::new("Installing", 1).with_entry("install.htm"),
//!     TocRecord::new("Upgrading", 1).with_entry("upgrade.htm#from-v1"),
//!     TocRecord::new("Reference", 0),
//! ];
//! let toc = TocBuilder::new().build(&records);
//!
//! let top: Vec<_> = toc.children(toc.root()).iter().map(|&id| toc.node(id).title.as_str()).collect();
//! assert_eq!(top, ["Introduction", "Reference"]);
//! assert_eq!(toc.max_depth(), Some(1));
//! ```
//!
//! ## Adapting Pages
//!
//! ```no_run
//! use chmview::{AdaptOptions, DirectoryContainer, DocumentAdapter};
//!
//! let archive = DirectoryContainer::new("extracted/help").unwrap();
//! let adapter = DocumentAdapter::new(AdaptOptions::new().with_archive_name("help.chm"));
//! let doc = adapter.adapt("html/intro.htm", &archive).unwrap();
//! std::fs::write(&doc.metadata.suggested_name, &doc.bytes).unwrap();
//! ```

pub mod adapt;
pub mod container;
pub mod dom;
pub mod error;
pub mod toc;
pub(crate) mod util;

pub use adapt::{
    AdaptOptions, AdaptedDocument, ArchiveUrl, DocumentAdapter, DocumentMetadata, LinkKind,
    LinkTarget, ReferencePolicy, adapt,
};
pub use container::{Container, DirectoryContainer, EntryIndex, MemoryContainer};
pub use error::{Diagnostic, Error, Result};
pub use toc::sitemap::parse_sitemap;
pub use toc::{EntryRef, TableOfContents, TocBuilder, TocRecord, TopicId, TopicNode, build_toc};
