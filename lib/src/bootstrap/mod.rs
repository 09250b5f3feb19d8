//! Whole runs over a content directory, as driven by the `seeder` tool.

mod assets;
mod models;
mod users;

pub use assets::*;
pub use models::*;
pub use users::*;

use serde::Deserialize;

use crate::content::{ContentDir, Loader};
use crate::error::Result;
use crate::instantiate::{Instantiator, Report};
use crate::relations::RelationMappings;
use crate::resolve::{ResolveReport, Resolver};
use crate::schema::Registry;
use crate::store::{AssetKind, PageId, Site, Store, UserId, UserStore};
use crate::templating::{ImageIndex, MiniJinjaEngine};
use crate::tree::SiteTree;
use crate::value::{Dict, Format, Yaml};

#[derive(Debug, Default, Clone)]
pub struct ContentSummary {
    pub documents: usize,
    pub nodes: usize,
    pub instantiated: Report,
    /// `None` in a dry run.
    pub resolved: Option<ResolveReport>,
    pub sites: usize,
}

/// The user `username`. Unknown users are an error.
pub fn owner<S: UserStore + ?Sized>(store: &S, username: &str) -> Result<UserId> {
    store.find_user(username).ok_or_else(|| error! {
        "owner does not exist",
        "username" => username,
    })
}

/// Builds the page tree of `dir` in `store`, owned by `owner`.
///
/// Documents are loaded and arranged into a [`SiteTree`], every node is
/// instantiated, and then, unless `dry_run`, deferred relations are resolved
/// and sites are pointed at their root pages. `globals` are visible to
/// templates as `G`.
pub fn content<S: Store + ?Sized>(
    store: &mut S,
    dir: &ContentDir,
    owner: UserId,
    dry_run: bool,
    globals: &Dict,
) -> Result<ContentSummary> {
    let registry = Registry::load(dir.schema_file())?;
    let mappings = RelationMappings::load(dir.relations_file())?;
    let defaults = dir.defaults()?;

    let images: ImageIndex = store.assets(AssetKind::Image).into_iter().collect();
    let engine = MiniJinjaEngine::new(globals, images);

    let documents = Loader::new(&engine).load(dir.pages())?;
    let mut summary = ContentSummary { documents: documents.len(), ..Default::default() };
    let mut tree = SiteTree::from_documents(documents)?;
    summary.nodes = tree.len();

    summary.instantiated = Instantiator::new(store, &registry, &mappings, &engine, owner)
        .defaults(defaults)
        .dry_run(dry_run)
        .instantiate(&mut tree)?;

    if dry_run {
        tracing::info!(nodes = summary.nodes, "dry run complete; nothing was written");
        return Ok(summary);
    }

    summary.resolved = Some(Resolver::new(store, &mappings, &engine).resolve(&mut tree)?);
    summary.sites = sites(store, dir, &tree)?;
    Ok(summary)
}

#[derive(Debug, Deserialize)]
struct SiteRecord {
    hostname: String,
    #[serde(default = "default_port")]
    port: u16,
    /// A path in the page tree, i.e, `/` or `/campaign/`.
    #[serde(default = "default_root")]
    root_page: String,
    #[serde(default)]
    is_default: bool,
}

fn default_port() -> u16 { 80 }

fn default_root() -> String { "/".into() }

/// Upserts the sites in `sites.yml`, routing each root page from the page
/// materialized for the root of `tree`. Without `sites.yml`, the default
/// site is `localhost:80` rooted at the tree's root. Returns the number of
/// sites written.
pub fn sites<S: Store + ?Sized>(store: &mut S, dir: &ContentDir, tree: &SiteTree) -> Result<usize> {
    let Some(root) = tree.root().materialized_id() else {
        tracing::warn!("the root page was not created; no site points at the tree");
        return Ok(0);
    };

    let file = dir.sites_file();
    let records: Vec<SiteRecord> = match file.is_file() {
        true => Yaml::read_or_default(&file)?,
        false => vec![SiteRecord {
            hostname: "localhost".into(),
            port: default_port(),
            root_page: default_root(),
            is_default: true,
        }],
    };

    let mut written = 0;
    for record in records {
        let Some(root_page) = store.route_from(root, &record.root_page) else {
            tracing::error!(hostname = %record.hostname, root_page = %record.root_page,
                "site root page does not exist; skipping site");
            continue;
        };

        upsert_site(store, record, root_page)?;
        written += 1;
    }

    Ok(written)
}

fn upsert_site<S: Store + ?Sized>(store: &mut S, record: SiteRecord, root_page: PageId) -> Result<()> {
    tracing::info!(hostname = %record.hostname, port = record.port, %root_page, "updating site");
    store.upsert_site(Site {
        hostname: record.hostname,
        port: record.port,
        root_page,
        is_default: record.is_default,
    })
}
