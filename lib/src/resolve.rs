//! Pass two: builds the relations deferred during instantiation, now that
//! every page in the tree has been persisted.

use std::mem;

use crate::error::{ErrorKind, Result};
use crate::relations::RelationMappings;
use crate::store::Store;
use crate::templating::Engine;
use crate::transform::{Context, Tally};
use crate::tree::SiteTree;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ResolveReport {
    /// Relation batches assigned.
    pub batches: usize,
    /// Related objects built across all batches.
    pub items: usize,
    /// Pages saved and republished with their resolved relations.
    pub saved: usize,
    pub tally: Tally,
}

pub struct Resolver<'a, S: ?Sized> {
    store: &'a mut S,
    mappings: &'a RelationMappings,
    engine: &'a dyn Engine,
}

impl<'a, S: Store + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a mut S, mappings: &'a RelationMappings, engine: &'a dyn Engine) -> Self {
        Resolver { store, mappings, engine }
    }

    /// Drains every node's pending relations, parents before children, and
    /// saves each owning page once with its relations replaced.
    ///
    /// `$path` values are routed from the page materialized for the tree's
    /// root. A pending relation on a node that was never persisted is a
    /// structural error: pass one did not complete for it.
    pub fn resolve(&mut self, tree: &mut SiteTree) -> Result<ResolveReport> {
        let mut report = ResolveReport::default();
        let site_root = tree.root().materialized_id();
        for id in tree.depth_first(tree.root_id()) {
            let pending = mem::take(&mut tree[id].pending_relations);
            if pending.is_empty() {
                continue;
            }

            let node = &mut tree[id];
            let (Some(owner), Some(materialized)) = (node.materialized_id(), node.materialized.as_mut()) else {
                return Err(error! {
                    "deferred relations on a page that was never persisted",
                    "path" => &node.full_path,
                    "relations" => pending.len(),
                }.with_kind(ErrorKind::Structure));
            };

            let ctx = Context {
                store: &*self.store,
                engine: self.engine,
                owner: Some(owner),
                site_root,
            };

            for batch in pending {
                let mapping = self.mappings.for_type(&batch.target);
                let related: Vec<_> = batch.items.iter()
                    .map(|attrs| ctx.build_related(&batch.target, mapping, attrs, &mut report.tally))
                    .collect();

                tracing::debug!(
                    path = %node.full_path,
                    relation = %batch.relation,
                    items = related.len(),
                    "resolved deferred relation",
                );

                report.batches += 1;
                report.items += related.len();
                materialized.page.relations.insert(batch.relation, related);
            }

            self.store.save(owner, &materialized.page)?;
            self.store.publish(owner)?;
            report.saved += 1;
        }

        Ok(report)
    }
}
