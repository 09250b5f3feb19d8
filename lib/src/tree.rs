use std::fmt;
use std::sync::Arc;

use derive_more::Debug;

use crate::content::ContentDocument;
use crate::error::{ErrorKind, Result};
use crate::mapper::Deferred;
use crate::store::{Page, PageId};
use crate::util::{normalize_path, path_segments};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// The object built for a node during instantiation. `id` is `None` in a
/// dry run, where nothing is persisted.
#[derive(Debug, Clone)]
pub struct Materialized {
    pub page: Page,
    pub id: Option<PageId>,
}

#[derive(Debug)]
pub struct SiteNode {
    pub id: NodeId,
    /// Normalized, i.e, `/about/team/`.
    pub full_path: String,
    pub slug: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// `None` for synthetic nodes bridging a gap in the paths.
    #[debug(skip)]
    pub properties: Option<Arc<ContentDocument>>,
    pub parent_reference: Option<PageId>,
    pub materialized: Option<Materialized>,
    pub pending_relations: Vec<Deferred>,
}

impl SiteNode {
    fn new(id: NodeId, full_path: String, parent: Option<NodeId>) -> Self {
        let slug = path_segments(&full_path).last().unwrap_or("/").to_string();
        SiteNode {
            id,
            full_path,
            slug,
            parent,
            children: vec![],
            properties: None,
            parent_reference: None,
            materialized: None,
            pending_relations: vec![],
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.properties.is_none()
    }

    pub fn materialized_id(&self) -> Option<PageId> {
        self.materialized.as_ref().and_then(|m| m.id)
    }
}

/// A path trie of content documents, stored as an arena addressed by
/// [`NodeId`]. The root is `/`.
#[derive(Debug)]
pub struct SiteTree {
    nodes: Vec<SiteNode>,
}

impl Default for SiteTree {
    fn default() -> Self {
        SiteTree::new()
    }
}

impl SiteTree {
    pub fn new() -> Self {
        SiteTree { nodes: vec![SiteNode::new(NodeId(0), "/".into(), None)] }
    }

    /// Builds a tree by inserting `documents` in order.
    pub fn from_documents<I>(documents: I) -> Result<Self>
        where I: IntoIterator<Item = ContentDocument>
    {
        let mut tree = SiteTree::new();
        for document in documents {
            tree.insert(Arc::new(document))?;
        }

        Ok(tree)
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root(&self) -> &SiteNode {
        &self[self.root_id()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, document: Arc<ContentDocument>) -> Result<NodeId> {
        self.insert_at(self.root_id(), document)
    }

    /// Inserts `document` below `node`.
    ///
    /// A document whose path equals a node's path replaces that node's
    /// properties. Otherwise it descends into the child whose slug matches the
    /// next path segment, creating a synthetic node when no such child exists
    /// and more than one segment remains.
    pub fn insert_at(&mut self, node: NodeId, document: Arc<ContentDocument>) -> Result<NodeId> {
        let path = normalize_path(document.path());
        let mut current = node;
        loop {
            let here = &self[current].full_path;
            if !path.starts_with(here.as_str()) {
                return Err(structure("path is not a descendant of the insertion node", &path, here));
            }

            if path == *here {
                self.nodes[current.0].properties = Some(document);
                return Ok(current);
            }

            let mut remainder = path_segments(&path[here.len()..]);
            let (slug, is_leaf) = match (remainder.next(), remainder.next()) {
                (Some(slug), next) => (slug, next.is_none()),
                (None, _) => return Err(structure("path has no remaining segment", &path, here)),
            };

            let mut matches = self[current].children.iter()
                .copied()
                .filter(|&child| self[child].slug == slug);

            current = match (matches.next(), matches.next()) {
                (Some(_), Some(_)) => return Err(structure("siblings share a slug", &path, slug)),
                (Some(child), None) => child,
                (None, _) => {
                    let full_path = format!("{}{}/", self[current].full_path, slug);
                    let child = self.add_child(current, full_path)?;
                    if is_leaf {
                        self.nodes[child.0].properties = Some(document);
                        return Ok(child);
                    }

                    child
                }
            };
        }
    }

    fn add_child(&mut self, parent: NodeId, full_path: String) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        let node = SiteNode::new(id, full_path, Some(parent));
        if self[parent].children.iter().any(|&c| self[c].slug == node.slug) {
            return Err(structure("siblings share a slug", &node.full_path, &node.slug));
        }

        self.nodes[parent.0].children.push(id);
        self.nodes.push(node);
        Ok(id)
    }

    /// The node at `path`, if there is one.
    pub fn get(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root_id();
        for segment in path_segments(path) {
            current = self[current].children.iter()
                .copied()
                .find(|&child| self[child].slug == segment)?;
        }

        Some(current)
    }

    /// All nodes below and including `root`, parents before children and
    /// siblings in insertion order.
    pub fn depth_first(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self[id].children.iter().rev().copied());
        }

        order
    }

    /// Number of nodes below `root`, excluding `root`.
    pub fn descendants(&self, root: NodeId) -> usize {
        self.depth_first(root).len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteNode> {
        self.nodes.iter()
    }
}

fn structure(message: &str, path: &str, at: &str) -> crate::error::Error {
    error! {
        message,
        "path" => path,
        "at" => at,
    }.with_kind(ErrorKind::Structure)
}

impl std::ops::Index<NodeId> for SiteTree {
    type Output = SiteNode;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl std::ops::IndexMut<NodeId> for SiteTree {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    fn doc(path: &str, title: &str) -> ContentDocument {
        ContentDocument::new(dict!["path" => path, "title" => title]).unwrap()
    }

    fn title(tree: &SiteTree, id: NodeId) -> Option<&str> {
        tree[id].properties.as_ref()?.get("title")?.as_str()
    }

    #[test]
    fn reinsertion_replaces_properties_only() {
        let mut tree = SiteTree::from_documents([
            doc("/about/", "About"),
            doc("/about/team/", "Team"),
        ]).unwrap();

        let about = tree.get("/about/").unwrap();
        let shape = tree[about].children.clone();
        let again = tree.insert(Arc::new(doc("about", "About Us"))).unwrap();

        assert_eq!(again, about);
        assert_eq!(tree[about].children, shape);
        assert_eq!(title(&tree, about), Some("About Us"));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn the_root_can_be_declared() {
        let tree = SiteTree::from_documents([doc("/about/", "About"), doc("/", "Home")]).unwrap();
        assert_eq!(title(&tree, tree.root_id()), Some("Home"));
        assert_eq!(tree.root().slug, "/");
    }

    #[test]
    fn gaps_are_filled_with_synthetic_nodes() {
        let tree = SiteTree::from_documents([
            doc("/a/b/c/d/", "D"),
            doc("/a/x/", "X"),
            doc("/a/b/", "B"),
        ]).unwrap();

        for node in tree.iter() {
            let Some(parent) = node.parent else {
                assert_eq!(node.full_path, "/");
                continue;
            };

            let parent = &tree[parent];
            assert!(node.full_path.starts_with(&parent.full_path));
            assert!(node.full_path.len() > parent.full_path.len());
            assert_eq!(path_segments(&node.full_path).count(), path_segments(&parent.full_path).count() + 1);
            assert_eq!(format!("{}{}/", parent.full_path, node.slug), node.full_path);
        }

        let a = tree.get("/a/").unwrap();
        let c = tree.get("/a/b/c/").unwrap();
        assert!(tree[a].is_synthetic());
        assert!(tree[c].is_synthetic());
        assert!(!tree[tree.get("/a/b/").unwrap()].is_synthetic());
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn children_never_share_slugs() {
        let tree = SiteTree::from_documents([
            doc("/a/", "A"),
            doc("/a/b/", "B"),
            doc("/a/b/", "B again"),
            doc("a/b", "B thrice"),
            doc("/a/c/", "C"),
            doc("/a/b/d/", "D"),
        ]).unwrap();

        for node in tree.iter() {
            let mut slugs: Vec<_> = node.children.iter().map(|&c| &tree[c].slug).collect();
            let count = slugs.len();
            slugs.sort();
            slugs.dedup();
            assert_eq!(slugs.len(), count);
        }

        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn non_descendants_are_structure_errors() {
        let mut tree = SiteTree::from_documents([doc("/a/", "A"), doc("/b/", "B")]).unwrap();
        let a = tree.get("/a/").unwrap();
        let error = tree.insert_at(a, Arc::new(doc("/b/c/", "C"))).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Structure);
    }

    #[test]
    fn depth_first_visits_parents_first() {
        let tree = SiteTree::from_documents([
            doc("/", "Home"),
            doc("/about/", "About"),
            doc("/contact/", "Contact"),
            doc("/about/team/", "Team"),
        ]).unwrap();

        let paths: Vec<_> = tree.depth_first(tree.root_id())
            .into_iter()
            .map(|id| tree[id].full_path.as_str())
            .collect();

        assert_eq!(paths, ["/", "/about/", "/about/team/", "/contact/"]);
        assert_eq!(tree.descendants(tree.root_id()), 3);
    }
}
