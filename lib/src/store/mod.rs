//! The persistent side of a bootstrap run: the object model written to the
//! CMS and the collaborator traits the core drives it through.

mod memory;

pub use memory::*;

use std::fmt;
use std::sync::Arc;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value::{Dict, Value};

macro_rules! define_id {
    ($($(#[$attr:meta])* $name:ident),* $(,)?) => ($(
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    )*)
}

define_id! {
    /// Identifies a persisted page.
    PageId,
    /// Identifies a stored image or document.
    AssetId,
    /// Identifies a persisted non-page record.
    RecordId,
    UserId,
}

/// A typed page as it is written to the page tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub kind: Arc<str>,
    pub title: String,
    pub slug: String,
    pub owner: UserId,
    pub live: bool,
    pub locked: bool,
    pub has_unpublished_changes: bool,
    pub show_in_menus: bool,
    #[serde(default)]
    pub fields: BTreeMap<Arc<str>, Field>,
    #[serde(default)]
    pub relations: BTreeMap<Arc<str>, Vec<Related>>,
}

impl Page {
    /// A new, unsaved page of type `kind` with the baseline state flags: live,
    /// unlocked, no pending changes, and shown in menus.
    pub fn new(kind: Arc<str>, owner: UserId) -> Self {
        Page {
            kind,
            owner,
            title: String::new(),
            slug: String::new(),
            live: true,
            locked: false,
            has_unpublished_changes: false,
            show_in_menus: true,
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Sets a scalar attribute. Attributes the page models directly are
    /// routed to their own members; everything else lands in `fields`.
    pub fn set_scalar(&mut self, name: &str, value: Value) {
        match (name, &value) {
            ("title", _) => self.title = value.to_string(),
            ("slug", _) => self.slug = crate::util::truncate_slug(&value.to_string()).into(),
            ("show_in_menus", Value::Bool(b)) => self.show_in_menus = *b,
            _ => { self.fields.insert(name.into(), Field::Value(value)); }
        }
    }

    /// The scalar value of `name`, if it was set.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)?.as_value()
    }

    /// The reference held by `name`, if it is a reference field.
    pub fn reference(&self, name: &str) -> Option<Option<Reference>> {
        self.fields.get(name)?.as_reference()
    }
}

/// An object stored in a page's one-to-many relation collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Related {
    pub kind: Arc<str>,
    pub fields: BTreeMap<Arc<str>, Field>,
}

impl Related {
    pub fn new(kind: Arc<str>) -> Self {
        Related { kind, fields: BTreeMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Value(Value),
    Ref(Option<Reference>),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(v) => Some(v),
            Field::Ref(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<Option<Reference>> {
        match self {
            Field::Ref(r) => Some(*r),
            Field::Value(_) => None,
        }
    }
}

/// A pointer from a field to another persisted object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// The page holding the object this reference lives in. Replaced with a
    /// [`Reference::Page`] once that page is persisted.
    Owner,
    Page(PageId),
    Image(AssetId),
    Document(AssetId),
    Record(RecordId),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Document,
}

impl AssetKind {
    /// The directory, relative to the media root, files of this kind live in.
    pub fn directory(self) -> &'static str {
        match self {
            AssetKind::Image => "original_images",
            AssetKind::Document => "documents",
        }
    }

    /// The stored path of a file named `file_name`.
    pub fn stored_path(self, file_name: &str) -> String {
        let base = file_name.rsplit('/').next().unwrap_or(file_name);
        format!("{}/{}", self.directory(), base)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    pub title: String,
    /// Path relative to the media root, i.e, `original_images/urn.jpg`.
    pub path: String,
    pub owner: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub kind: Arc<str>,
    pub fields: Dict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_staff: bool,
    /// `sha256$<salt>$<hex digest>`.
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub hostname: String,
    pub port: u16,
    pub root_page: PageId,
    pub is_default: bool,
}

/// Lookup of stored images and documents.
pub trait AssetStore {
    /// The asset of `kind` whose stored path is exactly that of `file_name`.
    fn find_asset(&self, kind: AssetKind, file_name: &str) -> Option<AssetId>;

    /// Every asset of `kind` as `(file name, id)` pairs.
    fn assets(&self, kind: AssetKind) -> Vec<(String, AssetId)>;

    /// Records an asset at `path`, replacing any existing record with the same
    /// stored path.
    fn upsert_asset(&mut self, kind: AssetKind, path: &str, owner: UserId) -> Result<AssetId>;
}

/// Resolves slash-separated paths to live pages.
pub trait PathRouter {
    /// The root page of the default site.
    fn site_root(&self) -> Option<PageId>;

    /// The live page at `path` below `root`. `/` is `root` itself.
    fn route_from(&self, root: PageId, path: &str) -> Option<PageId>;

    /// The live page at `path` in the default site.
    fn route(&self, path: &str) -> Option<PageId> {
        self.route_from(self.site_root()?, path)
    }
}

/// Writes to the page tree.
pub trait Persistence {
    /// Attaches `page` as the last child of `parent`, or as a top-level page
    /// when `parent` is `None`. Fails if a sibling already has its slug.
    fn add_child(&mut self, parent: Option<PageId>, page: &Page) -> Result<PageId>;

    /// Stores a new revision of the page `id`.
    fn save(&mut self, id: PageId, page: &Page) -> Result<()>;

    /// Makes the latest revision of `id` visible.
    fn publish(&mut self, id: PageId) -> Result<()>;

    fn page(&self, id: PageId) -> Option<&Page>;
}

/// Non-page records, addressed by natural key.
pub trait RecordStore {
    /// The field `kind` records are identified by, if one was declared.
    fn natural_key(&self, kind: &str) -> Option<&str>;

    fn set_natural_key(&mut self, kind: &str, field: &str);

    /// The record of `kind` whose natural key field equals `key`.
    fn find_record(&self, kind: &str, key: &Value) -> Option<RecordId>;

    /// Stores `record`, replacing `id` if given, and returns its id.
    fn save_record(&mut self, id: Option<RecordId>, record: Record) -> Result<RecordId>;

    fn record(&self, id: RecordId) -> Option<&Record>;
}

pub trait UserStore {
    fn find_user(&self, username: &str) -> Option<UserId>;

    /// Creates a user. Fails if the username is taken.
    fn create_user(&mut self, user: User) -> Result<UserId>;
}

pub trait SiteStore {
    /// Inserts or replaces the site with the same hostname and port. A default
    /// site demotes any other default.
    fn upsert_site(&mut self, site: Site) -> Result<()>;

    fn default_site(&self) -> Option<&Site>;
}

/// Everything a bootstrap run needs from the CMS.
pub trait Store: AssetStore + PathRouter + Persistence + RecordStore + UserStore + SiteStore { }

impl<T> Store for T
    where T: AssetStore + PathRouter + Persistence + RecordStore + UserStore + SiteStore
{ }

#[cfg(test)] static_assertions::assert_impl_all!(MemoryStore: Store, Send, Sync);
#[cfg(test)] static_assertions::assert_obj_safe!(AssetStore, PathRouter, Persistence, RecordStore);
