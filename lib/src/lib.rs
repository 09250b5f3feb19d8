#![doc = svgbobdoc::transform!(
//! A toolkit for bootstrapping CMS page trees from plain files.
//!
//! # Overview
//!
//! Sprout turns a directory of YAML documents with Markdown fragments into a
//! typed, persisted page tree. A content directory looks like:
//!
//! ```text
//! content/
//!   pages/          one document per page
//!   models/         non-page records
//!   pages.yml       attribute defaults for every page
//!   relations.yml   how related objects' attributes are transformed
//!   schema.toml     the concrete page and object types
//! ```
//!
//! A document is front matter followed by any number of named fragments,
//! each rendered as Markdown after template expansion:
//!
//! ```yaml
//! ---
//! path: /about/
//! type: core.StandardPage
//! title: About Us
//! --- @body
//! We started in a {{ image('garage.jpg', 'left') }}.
//! ```
//!
//! Pages are built in two passes around a global barrier:
//!
//! ```svgbob
//!  +--------+     +------------+     +----------+
//!  | Loader |---->| Path trie  |---->| SiteTree |
//!  +--------+     +------------+     +----+-----+
//!                                         |
//!        +--------------------------------+
//!        |
//!        v
//!  +-------------+  pending    +----------+
//!  | Instantiate |------------>| Resolve  |
//!  | (pass one)  |  relations  | (pass 2) |
//!  +------+------+             +----+-----+
//!         |                         |
//!         v                         v
//!  +----------------------------------------+
//!  |                  Store                 |
//!  +----------------------------------------+
//! ```
//!
//!   * **Loading** reads every document below `pages/` in a deterministic
//!     order. Paths come from the `path` attribute or from the file's place
//!     in the directory, without any `001 ` ordering prefix.
//!
//!   * The **path trie** arranges documents by path, bridging gaps with
//!     synthetic nodes.
//!
//!   * **Instantiation** walks the tree parents first, creating one page per
//!     node and applying attributes through the type's schema. Relations
//!     that point at other pages, such as `$path: /about/`, cannot be built
//!     until every page exists and are recorded on their node.
//!
//!   * **Resolution** builds the recorded relations against the complete
//!     tree and saves their owners.
//!
//! See [`bootstrap::content()`] for a complete run.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fstree;
pub mod value;
pub mod markdown;
pub mod templating;
pub mod content;
pub mod tree;
pub mod schema;
pub mod relations;
pub mod store;
pub mod transform;
pub mod mapper;
pub mod instantiate;
pub mod resolve;
pub mod bootstrap;

pub use rayon;
