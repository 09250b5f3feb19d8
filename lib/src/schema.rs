use std::sync::Arc;
use std::path::Path;
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ErrorKind, Result};
use crate::value::{Format, Toml};

/// Scalar fields every page type has.
pub const BASE_PAGE_FIELDS: &[&str] = &[
    "title", "slug", "seo_title", "search_description", "show_in_menus", "menu_title",
];

/// How an attribute maps onto a field of a concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A value stored as-is.
    Scalar,
    /// A reference to one object of the target type.
    Foreign(Arc<str>),
    /// A one-to-many collection of objects of the target type.
    Many(Arc<str>),
}

/// The declared shape of one concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    pub name: Arc<str>,
    pub fields: BTreeMap<Arc<str>, FieldKind>,
}

impl TypeSchema {
    pub fn field(&self, name: &str) -> Option<&FieldKind> {
        static SCALAR: FieldKind = FieldKind::Scalar;

        match self.fields.get(name) {
            Some(kind) => Some(kind),
            None if BASE_PAGE_FIELDS.contains(&name) => Some(&SCALAR),
            None => None,
        }
    }
}

/// Maps concrete type names, i.e, `core.StandardPage`, to their schema.
///
/// Read from `schema.toml`:
///
/// ```toml
/// [types."core.StandardPage"]
/// body = "scalar"
/// hero = { foreign = "images.Image" }
/// carousel = { many = "core.CarouselItem" }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<Arc<str>, TypeSchema>,
}

#[derive(Default, Deserialize)]
struct RawRegistry {
    #[serde(default)]
    types: BTreeMap<Arc<str>, BTreeMap<Arc<str>, FieldKind>>,
}

impl From<RawRegistry> for Registry {
    fn from(raw: RawRegistry) -> Self {
        let types = raw.types.into_iter()
            .map(|(name, fields)| (name.clone(), TypeSchema { name, fields }))
            .collect();

        Registry { types }
    }
}

impl Registry {
    pub fn from_toml(string: &str) -> Result<Self> {
        let raw: RawRegistry = Toml::from_str(string)?;
        Ok(raw.into())
    }

    /// Reads the registry at `path`. A missing file is an empty registry.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw: RawRegistry = Toml::read_or_default(path)?;
        Ok(raw.into())
    }

    pub fn insert(&mut self, name: &str, fields: BTreeMap<Arc<str>, FieldKind>) {
        let name: Arc<str> = name.into();
        self.types.insert(name.clone(), TypeSchema { name, fields });
    }

    /// The schema of `name`. An unknown type is a missing-attribute error.
    pub fn get(&self, name: &str) -> Result<&TypeSchema> {
        self.types.get(name).ok_or_else(|| error! {
            "unknown content type",
            "type" => name,
            "known types" => self.types.keys()
                .map(|k| &**k)
                .collect::<Vec<_>>()
                .join(", "),
        }.with_kind(ErrorKind::MissingAttribute))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}
