use std::fmt;
use std::sync::Arc;
use std::path::Path;
use std::collections::BTreeMap;

use crate::error::{ErrorKind, Result};
use crate::value::{Dict, Format, Value, Yaml};

/// A named transformation, written in `relations.yml` as a `$`-prefixed
/// string or the bare word `markdown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// `$page`: the page under construction.
    Page,
    /// `$index`: the sub-key of a bracketed attribute.
    Index,
    /// `$doc`: the raw value of the attribute.
    Doc,
    /// `$path`: the live page at a slash-separated path.
    Path,
    /// `$image`: an image by file name.
    Image,
    /// `$document`: a document by file name.
    Document,
    /// `markdown`: text rendered through the fragment pipeline.
    Markdown,
    /// `$model:<type>`: a record of `type` by natural key.
    Model(Arc<str>),
    Unknown(Arc<str>),
}

impl Symbol {
    /// Classifies `string`, returning `None` when it is not symbolic.
    pub fn parse(string: &str) -> Option<Symbol> {
        let symbol = match string {
            "$page" => Symbol::Page,
            "$index" => Symbol::Index,
            "$doc" => Symbol::Doc,
            "$path" => Symbol::Path,
            "$image" => Symbol::Image,
            "$document" => Symbol::Document,
            "markdown" => Symbol::Markdown,
            s if s.starts_with("$model:") && s.len() > "$model:".len() => {
                Symbol::Model(s["$model:".len()..].into())
            }
            s if s.starts_with('$') => Symbol::Unknown(s.into()),
            _ => return None,
        };

        Some(symbol)
    }

    /// Whether an attribute bound to this symbol can only be computed once
    /// the whole tree exists. `$index`, `$doc` and `markdown` are computable
    /// while the owner is being built.
    pub fn is_deferred(&self) -> bool {
        !matches!(self, Symbol::Index | Symbol::Doc | Symbol::Markdown)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Page => write!(f, "$page"),
            Symbol::Index => write!(f, "$index"),
            Symbol::Doc => write!(f, "$doc"),
            Symbol::Path => write!(f, "$path"),
            Symbol::Image => write!(f, "$image"),
            Symbol::Document => write!(f, "$document"),
            Symbol::Markdown => write!(f, "markdown"),
            Symbol::Model(kind) => write!(f, "$model:{kind}"),
            Symbol::Unknown(name) => name.fmt(f),
        }
    }
}

/// The right-hand side of one attribute mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Literal(Value),
    Symbol(Symbol),
}

impl Binding {
    pub fn parse(value: Value) -> Binding {
        match value.as_str().and_then(Symbol::parse) {
            Some(symbol) => Binding::Symbol(symbol),
            None => Binding::Literal(value),
        }
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Binding::Symbol(symbol) => Some(symbol),
            Binding::Literal(_) => None,
        }
    }
}

/// The attribute bindings of one concrete type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMapping {
    pub bindings: BTreeMap<Arc<str>, Binding>,
}

impl TypeMapping {
    pub fn get(&self, attribute: &str) -> Option<&Binding> {
        self.bindings.get(attribute)
    }

    pub fn symbol(&self, attribute: &str) -> Option<&Symbol> {
        self.get(attribute).and_then(|b| b.symbol())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Binding)> {
        self.bindings.iter()
    }
}

/// The `relations.yml` table: type name to attribute bindings.
#[derive(Debug, Clone, Default)]
pub struct RelationMappings {
    types: BTreeMap<Arc<str>, TypeMapping>,
}

impl RelationMappings {
    pub fn from_dict(dict: &Dict) -> Result<Self> {
        let mut types = BTreeMap::new();
        for (name, value) in dict {
            let bindings = match value {
                Value::Null => BTreeMap::new(),
                Value::Dict(attrs) => attrs.iter()
                    .map(|(k, v)| (k.clone(), Binding::parse(v.clone())))
                    .collect(),
                other => return Err(error! {
                    "relation mapping must be a mapping of attributes",
                    "type" => name,
                    "found" => other.kind(),
                }.with_kind(ErrorKind::Malformed)),
            };

            types.insert(name.clone(), TypeMapping { bindings });
        }

        Ok(RelationMappings { types })
    }

    pub fn from_yaml(string: &str) -> Result<Self> {
        let dict: Dict = Yaml::from_str(string)?;
        Self::from_dict(&dict)
    }

    /// Reads `relations.yml` at `path`. A missing file is an empty table.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dict: Dict = Yaml::read_or_default(path)?;
        Self::from_dict(&dict)
    }

    /// The mapping for `name`, falling back to the bare type name after the
    /// last `.`: `core.CarouselItem`, then `CarouselItem`.
    pub fn for_type(&self, name: &str) -> Option<&TypeMapping> {
        self.types.get(name).or_else(|| {
            let (_, bare) = name.rsplit_once('.')?;
            self.types.get(bare)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_classified_once() {
        assert_eq!(Symbol::parse("$page"), Some(Symbol::Page));
        assert_eq!(Symbol::parse("markdown"), Some(Symbol::Markdown));
        assert_eq!(Symbol::parse("$model:core.Location"), Some(Symbol::Model("core.Location".into())));
        assert_eq!(Symbol::parse("$model:"), Some(Symbol::Unknown("$model:".into())));
        assert_eq!(Symbol::parse("$bogus"), Some(Symbol::Unknown("$bogus".into())));
        assert_eq!(Symbol::parse("plain"), None);

        assert!(Symbol::Path.is_deferred());
        assert!(Symbol::Page.is_deferred());
        assert!(Symbol::Unknown("$x".into()).is_deferred());
        assert!(!Symbol::Index.is_deferred());
        assert!(!Symbol::Markdown.is_deferred());
    }

    #[test]
    fn mappings_fall_back_to_bare_names() {
        let mappings = RelationMappings::from_yaml(concat!(
            "CarouselItem:\n",
            "  page: $page\n",
            "  link_page: $path\n",
            "  caption: markdown\n",
            "  order: 1\n",
            "core.StandardPage:\n",
            "  hero: $image\n",
        )).unwrap();

        let carousel = mappings.for_type("core.CarouselItem").unwrap();
        assert_eq!(carousel.symbol("page"), Some(&Symbol::Page));
        assert_eq!(carousel.symbol("caption"), Some(&Symbol::Markdown));
        assert_eq!(carousel.get("order"), Some(&Binding::Literal(Value::from(1u8))));

        let page = mappings.for_type("core.StandardPage").unwrap();
        assert_eq!(page.symbol("hero"), Some(&Symbol::Image));
        assert!(mappings.for_type("core.Missing").is_none());
    }

    #[test]
    fn non_mapping_entries_are_malformed() {
        let error = RelationMappings::from_yaml("CarouselItem: [a, b]\n").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
    }
}
