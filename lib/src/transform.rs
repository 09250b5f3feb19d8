//! The named transformations bound to attributes in `relations.yml`, shared
//! by eager construction during instantiation and by the deferred resolver.

use std::ops::AddAssign;
use std::sync::Arc;

use crate::markdown;
use crate::relations::{Symbol, TypeMapping};
use crate::store::{AssetKind, AssetStore, Field, PageId, PathRouter, RecordStore, Reference, Related};
use crate::templating::Engine;
use crate::value::{Dict, Value};

/// What a transformation yields for one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Set(Field),
    /// The target could not be found; the field is set to null.
    Nulled(Field),
    /// The transformation is unknown; the field is left unset.
    Dropped,
}

/// Counts of attributes that did not transform cleanly.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Tally {
    pub nulled: usize,
    pub dropped: usize,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.nulled += rhs.nulled;
        self.dropped += rhs.dropped;
    }
}

/// Everything a transformation may consult.
pub struct Context<'a, S: ?Sized> {
    pub store: &'a S,
    pub engine: &'a dyn Engine,
    /// The persisted page owning the attribute. `None` while that page is
    /// still being built.
    pub owner: Option<PageId>,
    /// The page `$path` lookups are routed from.
    pub site_root: Option<PageId>,
}

impl<'a, S> Context<'a, S>
    where S: AssetStore + PathRouter + RecordStore + ?Sized
{
    /// Applies `symbol` to `value`. `scope` is the template context of a
    /// `markdown` transformation.
    pub fn apply(&self, symbol: Option<&Symbol>, value: &Value, scope: &Dict) -> Outcome {
        let symbol = match symbol {
            None | Some(Symbol::Index) | Some(Symbol::Doc) => {
                return Outcome::Set(Field::Value(value.clone()));
            }
            Some(symbol) => symbol,
        };

        let reference = match symbol {
            Symbol::Page => Some(self.owner.map_or(Reference::Owner, Reference::Page)),
            Symbol::Path => self.page_for_path(value).map(Reference::Page),
            Symbol::Image => self.asset(AssetKind::Image, value).map(Reference::Image),
            Symbol::Document => self.asset(AssetKind::Document, value).map(Reference::Document),
            Symbol::Model(kind) => self.store.find_record(kind, value).map(Reference::Record),
            Symbol::Markdown => return self.markdown(value, scope),
            Symbol::Unknown(name) => {
                tracing::error!(symbol = %name, %value, "unknown transformation; dropping field");
                return Outcome::Dropped;
            }
            Symbol::Index | Symbol::Doc => None,
        };

        match reference {
            Some(reference) => Outcome::Set(Field::Ref(Some(reference))),
            None => {
                tracing::error!(%symbol, %value, "unresolved reference; setting field to null");
                Outcome::Nulled(Field::Ref(None))
            }
        }
    }

    fn page_for_path(&self, value: &Value) -> Option<PageId> {
        let path = value.as_str()?;
        self.store.route_from(self.site_root?, path)
    }

    fn asset(&self, kind: AssetKind, value: &Value) -> Option<crate::store::AssetId> {
        self.store.find_asset(kind, value.as_str()?)
    }

    fn markdown(&self, value: &Value, scope: &Dict) -> Outcome {
        let Some(text) = value.as_str() else {
            return Outcome::Set(Field::Value(value.clone()));
        };

        match markdown::render_fragment(self.engine, "markdown", text, scope) {
            Ok(html) => Outcome::Set(Field::Value(html.into())),
            Err(e) => {
                tracing::error!(error = %e, "failed to render markdown attribute");
                Outcome::Nulled(Field::Value(Value::Null))
            }
        }
    }

    /// Builds one related object of type `kind` from `attrs`, transforming
    /// each attribute by its binding in `mapping`.
    pub fn build_related(
        &self,
        kind: &Arc<str>,
        mapping: Option<&TypeMapping>,
        attrs: &Dict,
        tally: &mut Tally,
    ) -> Related {
        let mut related = Related::new(kind.clone());
        for (attr, value) in attrs {
            let symbol = mapping.and_then(|m| m.symbol(attr));
            match self.apply(symbol, value, attrs) {
                Outcome::Set(field) => {
                    related.fields.insert(attr.clone(), field);
                }
                Outcome::Nulled(field) => {
                    tally.nulled += 1;
                    related.fields.insert(attr.clone(), field);
                }
                Outcome::Dropped => tally.dropped += 1,
            }
        }

        related
    }
}
