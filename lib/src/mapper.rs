use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::relations::{Binding, RelationMappings, Symbol, TypeMapping};
use crate::schema::{FieldKind, TypeSchema};
use crate::store::{AssetStore, Page, PathRouter, RecordStore, Related};
use crate::templating::Engine;
use crate::transform::{Context, Outcome, Tally};
use crate::value::{Dict, Value};

/// Attributes that address a document rather than describe its page.
pub const RESERVED_ATTRIBUTES: &[&str] = &["type", "path"];

/// A batch of related objects that can only be built once every page in the
/// tree exists. The owner is the node the record is stored on.
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred {
    pub relation: Arc<str>,
    pub target: Arc<str>,
    pub items: Vec<Dict>,
}

/// Splits `name[subkey]` into its parts. `name` alone has no subkey.
///
/// ```
/// use sprout::mapper::parse_attribute;
///
/// assert_eq!(parse_attribute("body"), Some(("body", None)));
/// assert_eq!(parse_attribute("carousel[intro]"), Some(("carousel", Some("intro"))));
/// assert_eq!(parse_attribute("carousel[]"), Some(("carousel", Some(""))));
/// assert_eq!(parse_attribute("not valid"), None);
/// ```
pub fn parse_attribute(attr: &str) -> Option<(&str, Option<&str>)> {
    static ATTRIBUTE: Lazy<Option<Regex>> = Lazy::new(|| {
        Regex::new(r"^(\w+)(?:\[(\w*)\])?$").ok()
    });

    let captures = ATTRIBUTE.as_ref()?.captures(attr)?;
    let name = captures.get(1)?.as_str();
    Some((name, captures.get(2).map(|m| m.as_str())))
}

/// Whether a value cannot be taken literally while the tree is being built.
fn is_unresolvable(value: &Value) -> bool {
    !matches!(value, Value::String(_)) || value.is_symbolic()
}

/// Sets a page's attributes according to its type's schema and the relation
/// mappings, deferring relations that need the complete tree.
pub struct Mapper<'a, S: ?Sized> {
    ctx: Context<'a, S>,
    mappings: &'a RelationMappings,
    tally: Tally,
}

impl<'a, S> Mapper<'a, S>
    where S: AssetStore + PathRouter + RecordStore + ?Sized
{
    pub fn new(store: &'a S, engine: &'a dyn Engine, mappings: &'a RelationMappings) -> Self {
        let ctx = Context { store, engine, owner: None, site_root: None };
        Mapper { ctx, mappings, tally: Tally::default() }
    }

    /// References that could not be resolved or transformations that were
    /// unknown while applying attributes.
    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Applies `attrs` to `page`, whose type is described by `schema`.
    /// Returns the relations that must wait for the whole tree.
    pub fn apply(&mut self, page: &mut Page, attrs: &Dict, schema: &TypeSchema) -> Result<Vec<Deferred>> {
        let owner_mapping = self.mappings.for_type(&schema.name);
        let mut deferred = vec![];
        for (attr, value) in attrs {
            if RESERVED_ATTRIBUTES.contains(&&**attr) {
                continue;
            }

            let Some((name, index)) = parse_attribute(attr) else {
                tracing::warn!(attribute = %attr, "malformed attribute name; skipping");
                continue;
            };

            let Some(kind) = schema.field(name) else {
                tracing::warn!(attribute = %attr, kind = %schema.name, "unknown attribute; skipping");
                continue;
            };

            match (kind, index) {
                (FieldKind::Scalar, None) => page.set_scalar(name, value.clone()),
                (FieldKind::Foreign(_), None) => {
                    let binding = owner_mapping.and_then(|m| m.get(name));
                    self.foreign(page, name, binding, value);
                }
                (FieldKind::Many(target), Some(index)) => {
                    let related = self.bracketed(target, index, value);
                    page.relations.entry(name.into()).or_default().push(related);
                }
                (FieldKind::Many(target), None) => {
                    if let Some(batch) = self.listed(page, name, target, value)? {
                        deferred.push(batch);
                    }
                }
                (_, Some(_)) => {
                    tracing::warn!(attribute = %attr, "sub-key on a field that is not a collection; skipping");
                }
            }
        }

        Ok(deferred)
    }

    fn foreign(&mut self, page: &mut Page, name: &str, binding: Option<&Binding>, value: &Value) {
        let symbol = match binding.and_then(|b| b.symbol()) {
            Some(s @ (Symbol::Image | Symbol::Document | Symbol::Model(_))) => s,
            _ => {
                tracing::warn!(attribute = name, %value, "no lookup for foreign attribute; skipping");
                return;
            }
        };

        let field = match self.ctx.apply(Some(symbol), value, &Dict::new()) {
            Outcome::Set(field) => field,
            Outcome::Nulled(field) => {
                self.tally.nulled += 1;
                field
            }
            Outcome::Dropped => {
                self.tally.dropped += 1;
                return;
            }
        };

        page.fields.insert(name.into(), field);
    }

    /// The interpolated mapping values for one related object. Bindings that
    /// need a literal to act on are left out.
    fn interpolate(mapping: Option<&TypeMapping>, index: Value, doc: &Value) -> Dict {
        let mut attrs = Dict::new();
        for (attr, binding) in mapping.into_iter().flat_map(|m| m.iter()) {
            let value = match binding {
                Binding::Literal(v) => v.clone(),
                Binding::Symbol(Symbol::Index) => index.clone(),
                Binding::Symbol(Symbol::Doc) => doc.clone(),
                Binding::Symbol(Symbol::Page) => Value::from(Symbol::Page.to_string()),
                Binding::Symbol(_) => continue,
            };

            attrs.insert(attr.clone(), value);
        }

        attrs
    }

    /// `name[index]`: one related object built now from the mapping and, when
    /// `value` is a mapping, its entries.
    fn bracketed(&mut self, target: &Arc<str>, index: &str, value: &Value) -> Related {
        let mapping = self.mappings.for_type(target);
        let mut attrs = Self::interpolate(mapping, Value::from(index), value);
        if let Some(dict) = value.as_dict() {
            attrs.extend(dict.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        self.ctx.build_related(target, mapping, &attrs, &mut self.tally)
    }

    /// A list of related objects. Built now and assigned to the relation
    /// unless any attribute needs the whole tree, in which case the batch is
    /// returned for deferral.
    fn listed(
        &mut self,
        page: &mut Page,
        name: &str,
        target: &Arc<str>,
        value: &Value,
    ) -> Result<Option<Deferred>> {
        let Some(elements) = value.as_slice() else {
            return err! {
                "relation attribute must be a list",
                "attribute" => name,
                "found" => value.kind(),
            };
        };

        let mapping = self.mappings.for_type(target);
        let mut defer = false;
        let mut items = Vec::with_capacity(elements.len());
        for (position, element) in elements.iter().enumerate() {
            let Some(element) = element.as_dict() else {
                return err! {
                    "relation list elements must be mappings",
                    "attribute" => name,
                    "position" => position,
                    "found" => element.kind(),
                };
            };

            let mut attrs = Self::interpolate(mapping, Value::from(position), value);
            for (attr, literal) in element {
                defer |= match mapping.and_then(|m| m.get(attr)) {
                    Some(Binding::Symbol(symbol)) => symbol.is_deferred(),
                    Some(Binding::Literal(v)) => is_unresolvable(v),
                    None => is_unresolvable(literal),
                };

                attrs.insert(attr.clone(), literal.clone());
            }

            items.push(attrs);
        }

        let relation: Arc<str> = name.into();
        if defer {
            tracing::debug!(relation = name, items = items.len(), "deferring relation");
            return Ok(Some(Deferred { relation, target: target.clone(), items }));
        }

        let related = items.iter()
            .map(|attrs| self.ctx.build_related(target, mapping, attrs, &mut self.tally))
            .collect();

        page.relations.insert(relation, related);
        Ok(None)
    }
}
