//! Pass one: materializes every node of a [`SiteTree`] as a page, parents
//! before children, recording the relations that must wait for pass two.

use crate::error::{Error, ErrorKind, Result};
use crate::mapper::Mapper;
use crate::relations::RelationMappings;
use crate::schema::Registry;
use crate::store::{Page, PageId, Store, UserId};
use crate::templating::Engine;
use crate::transform::Tally;
use crate::tree::{Materialized, NodeId, SiteTree};
use crate::util::truncate_slug;
use crate::value::{Dict, Value};

/// A node that could not be materialized.
#[derive(Debug, Clone)]
pub struct NodeFailure {
    pub path: String,
    pub error: Error,
    /// Descendants not attempted because of this failure.
    pub skipped: usize,
}

/// The outcome of one instantiation pass.
#[derive(Debug, Default, Clone)]
pub struct Report {
    /// Pages created or, in a dry run, that would have been.
    pub created: usize,
    /// Relation batches recorded for the resolver.
    pub deferred: usize,
    pub tally: Tally,
    pub failures: Vec<NodeFailure>,
    /// Nodes below a failed node.
    pub skipped: usize,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Instantiator<'a, S: ?Sized> {
    store: &'a mut S,
    registry: &'a Registry,
    mappings: &'a RelationMappings,
    engine: &'a dyn Engine,
    defaults: Dict,
    owner: UserId,
    dry_run: bool,
}

impl<'a, S: Store + ?Sized> Instantiator<'a, S> {
    pub fn new(
        store: &'a mut S,
        registry: &'a Registry,
        mappings: &'a RelationMappings,
        engine: &'a dyn Engine,
        owner: UserId,
    ) -> Self {
        Instantiator {
            store,
            registry,
            mappings,
            engine,
            owner,
            defaults: Dict::new(),
            dry_run: false,
        }
    }

    /// Attributes merged under every node's own attributes.
    pub fn defaults(mut self, defaults: Dict) -> Self {
        self.defaults = defaults;
        self
    }

    /// Builds every page without writing anything to the store.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Materializes every node of `tree`.
    ///
    /// A node that fails is recorded in [`Report::failures`] and its subtree
    /// is not attempted; its siblings are. Malformed input and structural
    /// conflicts abort the pass.
    pub fn instantiate(&mut self, tree: &mut SiteTree) -> Result<Report> {
        let mut report = Report::default();
        self.visit(tree, tree.root_id(), None, &mut report)?;
        Ok(report)
    }

    fn visit(
        &mut self,
        tree: &mut SiteTree,
        node: NodeId,
        parent: Option<PageId>,
        report: &mut Report,
    ) -> Result<()> {
        tree[node].parent_reference = parent;
        match self.materialize(tree, node, report) {
            Ok(id) => {
                for child in tree[node].children.clone() {
                    self.visit(tree, child, id, report)?;
                }

                Ok(())
            }
            Err(e) if e.kind().is_fatal() => Err(e),
            Err(e) => {
                let node = &tree[node];
                let skipped = tree.descendants(node.id);
                tracing::error!(
                    path = %node.full_path,
                    properties = ?node.properties.as_ref().map(|p| &p.attributes),
                    skipped,
                    "failed to instantiate page; skipping its subtree:\n{e}",
                );

                report.skipped += skipped;
                report.failures.push(NodeFailure {
                    path: node.full_path.clone(),
                    error: e,
                    skipped,
                });

                Ok(())
            }
        }
    }

    fn materialize(&mut self, tree: &mut SiteTree, node: NodeId, report: &mut Report) -> Result<Option<PageId>> {
        let path = tree[node].full_path.clone();
        let Some(properties) = tree[node].properties.clone() else {
            return Err(missing("no content document for this path", &path, "path"));
        };

        let mut attrs = self.defaults.clone();
        attrs.extend(properties.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));

        let Some(kind) = attrs.get("type").and_then(|v| v.as_str()) else {
            return Err(missing("page has no `type`", &path, "type"));
        };

        let schema = self.registry.get(kind).map_err(|e| e.chain(missing("page type is not registered", &path, "type")))?;
        let title = match attrs.get("title") {
            Some(Value::Null) | None => return Err(missing("page has no `title`", &path, "title")),
            Some(title) => title.to_string(),
        };

        let mut page = Page::new(schema.name.clone(), self.owner);
        page.slug = truncate_slug(&tree[node].slug).to_string();
        page.title = title;

        let (deferred, tally) = {
            let mut mapper = Mapper::new(&*self.store, self.engine, self.mappings);
            let deferred = mapper.apply(&mut page, &attrs, schema)?;
            (deferred, mapper.tally())
        };

        let id = match self.dry_run {
            true => {
                tracing::info!(%path, kind = %page.kind, deferred = deferred.len(), "would create page");
                None
            }
            false => {
                let id = self.store.add_child(tree[node].parent_reference, &page)?;
                self.store.save(id, &page)?;
                self.store.publish(id)?;
                tracing::info!(%path, kind = %page.kind, %id, deferred = deferred.len(), "created page");
                Some(id)
            }
        };

        report.created += 1;
        report.deferred += deferred.len();
        report.tally += tally;

        let node = &mut tree[node];
        node.pending_relations = deferred;
        node.materialized = Some(Materialized { page, id });
        Ok(id)
    }
}

fn missing(message: &str, path: &str, attribute: &str) -> Error {
    error! {
        message,
        "path" => path,
        "attribute" => attribute,
    }.with_kind(ErrorKind::MissingAttribute)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::content::ContentDocument;
    use crate::dict;
    use crate::store::{MemoryStore, Persistence};
    use crate::templating::MiniJinjaEngine;

    pub(crate) const SCHEMA: &str = r#"
        [types."core.HomePage"]
        body = "scalar"

        [types."core.StandardPage"]
        body = "scalar"
        links = { many = "core.LinkItem" }
    "#;

    pub(crate) const RELATIONS: &str = "
        LinkItem:
          page: $page
          link_page: $path
    ";

    pub(crate) fn doc(path: &str, kind: &str, title: &str) -> ContentDocument {
        ContentDocument::new(dict!["path" => path, "type" => kind, "title" => title]).unwrap()
    }

    /// `/`, `/about/` and `/about/team/`, where the team page links back to
    /// `/about/`.
    pub(crate) fn site() -> SiteTree {
        let mut team = doc("/about/team/", "core.StandardPage", "Team");
        let link = dict!["title" => "About", "link_page" => "/about/"];
        team.attributes.insert("links".into(), Value::from(vec![Value::from(link)]));

        SiteTree::from_documents([
            doc("/", "core.HomePage", "Home"),
            doc("/about/", "core.StandardPage", "About"),
            team,
        ]).unwrap()
    }

    pub(crate) fn config() -> (Registry, RelationMappings) {
        (Registry::from_toml(SCHEMA).unwrap(), RelationMappings::from_yaml(RELATIONS).unwrap())
    }

    #[test]
    fn pages_follow_the_tree() {
        let (registry, mappings) = config();
        let engine = MiniJinjaEngine::default();
        let mut store = MemoryStore::new();
        let mut tree = site();

        let report = Instantiator::new(&mut store, &registry, &mappings, &engine, UserId(1))
            .instantiate(&mut tree)
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.created, 3);
        assert_eq!(report.deferred, 1);

        let home = tree.root().materialized_id().unwrap();
        let about = tree[tree.get("/about/").unwrap()].materialized_id().unwrap();
        let team = tree.get("/about/team/").unwrap();

        assert_eq!(store.children(None), [home]);
        assert_eq!(store.children(Some(home)), [about]);
        assert_eq!(store.children(Some(about)), [tree[team].materialized_id().unwrap()]);
        assert_eq!(tree[team].parent_reference, Some(about));
        assert_eq!(tree[team].pending_relations.len(), 1);

        let page = store.page(about).unwrap();
        assert_eq!(page.title, "About");
        assert_eq!(page.slug, "about");
        assert!(page.live && page.show_in_menus && !page.locked);
        assert!(store.stored_page(about).unwrap().published.is_some());
    }

    #[test]
    fn dry_runs_write_nothing() {
        let (registry, mappings) = config();
        let engine = MiniJinjaEngine::default();
        let mut store = MemoryStore::new();
        let mut tree = site();

        let report = Instantiator::new(&mut store, &registry, &mappings, &engine, UserId(1))
            .dry_run(true)
            .instantiate(&mut tree)
            .unwrap();

        assert_eq!(report.created, 3);
        assert_eq!(store.writes().total(), 0);
        assert_eq!(store.writes().save, 0);
        assert_eq!(store.writes().publish, 0);
        for node in tree.iter() {
            let materialized = node.materialized.as_ref().unwrap();
            assert!(materialized.id.is_none());
        }
    }

    #[test]
    fn failures_skip_the_subtree_only() {
        let (registry, mappings) = config();
        let engine = MiniJinjaEngine::default();
        let mut store = MemoryStore::new();
        let untitled = ContentDocument::new(dict!["path" => "/about/", "type" => "core.StandardPage"]).unwrap();
        let mut tree = SiteTree::from_documents([
            doc("/", "core.HomePage", "Home"),
            untitled,
            doc("/about/team/", "core.StandardPage", "Team"),
            doc("/contact/", "core.Unregistered", "Contact"),
            doc("/news/", "core.StandardPage", "News"),
        ]).unwrap();

        let report = Instantiator::new(&mut store, &registry, &mappings, &engine, UserId(1))
            .instantiate(&mut tree)
            .unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 1);
        let failed: Vec<_> = report.failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, ["/about/", "/contact/"]);
        assert!(report.failures.iter().all(|f| f.error.kind() == ErrorKind::MissingAttribute));
        assert!(tree[tree.get("/about/team/").unwrap()].materialized.is_none());
        assert!(tree[tree.get("/news/").unwrap()].materialized_id().is_some());
    }

    #[test]
    fn defaults_sit_under_properties() {
        let (registry, mappings) = config();
        let engine = MiniJinjaEngine::default();
        let mut store = MemoryStore::new();
        let mut tree = SiteTree::from_documents([
            ContentDocument::new(dict!["path" => "/", "title" => "Home", "body" => "mine"]).unwrap(),
        ]).unwrap();

        let defaults = dict!["type" => "core.HomePage", "body" => "default", "show_in_menus" => false];
        Instantiator::new(&mut store, &registry, &mappings, &engine, UserId(1))
            .defaults(defaults)
            .instantiate(&mut tree)
            .unwrap();

        let page = store.page(tree.root().materialized_id().unwrap()).unwrap();
        assert_eq!(page.value("body"), Some(&Value::from("mine")));
        assert!(!page.show_in_menus);
    }

    #[test]
    fn synthetic_nodes_fail_with_their_subtree() {
        let (registry, mappings) = config();
        let engine = MiniJinjaEngine::default();
        let mut store = MemoryStore::new();
        let mut tree = SiteTree::from_documents([
            doc("/", "core.HomePage", "Home"),
            doc("/a/b/", "core.StandardPage", "B"),
        ]).unwrap();

        let report = Instantiator::new(&mut store, &registry, &mappings, &engine, UserId(1))
            .instantiate(&mut tree)
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "/a/");
        assert_eq!(report.failures[0].skipped, 1);
        assert_eq!(store.writes().add_child, 1);
    }

    #[test]
    fn colliding_slugs_fail_one_sibling() {
        let (registry, mappings) = config();
        let engine = MiniJinjaEngine::default();
        let mut store = MemoryStore::new();
        let stem = "x".repeat(55);
        let first = format!("/{stem}1/");
        let second = format!("/{stem}2/");
        let mut tree = SiteTree::from_documents([
            doc("/", "core.HomePage", "Home"),
            doc(&first, "core.StandardPage", "First"),
            doc(&second, "core.StandardPage", "Second"),
            doc("/zeta/", "core.StandardPage", "Zeta"),
        ]).unwrap();

        let report = Instantiator::new(&mut store, &registry, &mappings, &engine, UserId(1))
            .instantiate(&mut tree)
            .unwrap();

        assert_eq!(report.created, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, second);
        assert!(!report.failures[0].error.kind().is_fatal());
        assert!(tree[tree.get(&first).unwrap()].materialized_id().is_some());
        assert!(tree[tree.get("/zeta/").unwrap()].materialized_id().is_some());
    }
}
