//! `encodelite` is a crate for exploring the biosample metadata published by
//! the ENCODE archive.
//!
//! The crate provides four main points of entry:
//!
//! - Inferring a cell-type hierarchy from the archive's "cell slim"
//!   annotations.
//! - Deriving filter options (assays, organisms, targets, cell types, and
//!   assemblies) from search facets.
//! - Searching released files, experiments, and datasets by cell type,
//!   target, and output type.
//! - Running region-overlap queries against a precomputed interval index.
//!
//! ## Cell-type hierarchies
//!
//! The archive annotates each biosample type with zero or more _slims_:
//! coarse category labels such as `leukocyte` or `epithelial cell`. It does
//! not, however, say how those slims relate to one another. The
//! [`hierarchy`] module reconstructs that structure purely from membership:
//! a slim is placed beneath the closest slim whose members strictly enclose
//! its own. The result is a forest packed beneath a synthetic root
//! [`Node`](hierarchy::Node), where each node also carries the aggregate
//! members of its entire subtree.
//!
//! Raw records (as returned by the archive) are filtered through the
//! [`catalog`] module before the hierarchy is built. Only cell-like
//! classifications are retained.
//!
//! ```
//! use encodelite::catalog::Record;
//! use encodelite::hierarchy;
//!
//! let tree = hierarchy::build(vec![
//!     Record::new("K562", "cell line", ["leukocyte", "hematopoietic cell", "cancer cell"]),
//!     Record::new("GM12878", "cell line", ["leukocyte", "hematopoietic cell", "B cell"]),
//!     Record::new("liver", "tissue", ["hepatocyte"]),
//! ]);
//!
//! for node in tree.descendants() {
//!     println!("{} ({} terms)", node.label(), node.aggregate_members().len());
//! }
//!
//! let b_cell = tree.find("B cell").unwrap();
//! assert_eq!(b_cell.members(), ["GM12878"]);
//! assert!(tree.find("hepatocyte").is_none());
//! ```
//!
//! ## Talking to the archive
//!
//! With the `client` feature enabled, the `client` module provides a
//! blocking client that fetches the live catalog, search facets, and
//! metadata search results. The [`facet`] and [`search`] modules are usable
//! without it for working with responses obtained by other means: a
//! [`search::Criteria`] expands into one [`search::Query`] per combination of
//! cell type, target, and output type, and returned objects are reduced to
//! [`search::Item`]s.
//!
//! ## Overlap queries
//!
//! The [`overlap`] module prepares an uploaded BED file, invokes the external
//! interval search executable with a fixed command line, and parses its
//! output. The executable and its inputs are set via [`config::Config`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod catalog;
#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod facet;
pub mod hierarchy;
pub mod overlap;
pub mod search;

pub use config::Config;
pub use hierarchy::Node;
