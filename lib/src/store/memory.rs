use std::fs;
use std::path::Path;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result, Chainable};
use crate::store::*;
use crate::util::path_segments;
use crate::value::{Format, Json, Value};

/// A store held in memory and persisted as one JSON file.
///
/// Identifiers are one-based positions in the respective tables.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pages: Vec<StoredPage>,
    #[serde(default)]
    assets: Vec<Asset>,
    #[serde(default)]
    records: Vec<Record>,
    #[serde(default)]
    natural_keys: BTreeMap<String, String>,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    sites: Vec<Site>,
    #[serde(skip)]
    writes: Writes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPage {
    pub parent: Option<PageId>,
    pub children: Vec<PageId>,
    pub draft: Page,
    pub published: Option<Page>,
    pub revisions: u64,
}

/// Number of write operations performed since the store was opened.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Writes {
    pub add_child: usize,
    pub save: usize,
    pub publish: usize,
    pub assets: usize,
    pub records: usize,
    pub users: usize,
    pub sites: usize,
}

impl Writes {
    pub fn total(&self) -> usize {
        self.add_child + self.save + self.publish
            + self.assets + self.records + self.users + self.sites
    }
}

fn slot<T>(table: &[T], id: u64) -> Option<&T> {
    table.get(usize::try_from(id).ok()?.checked_sub(1)?)
}

fn slot_mut<T>(table: &mut [T], id: u64) -> Option<&mut T> {
    table.get_mut(usize::try_from(id).ok()?.checked_sub(1)?)
}

fn next_id<T>(table: &[T]) -> u64 {
    table.len() as u64 + 1
}

/// Points every [`Reference::Owner`] held by `page` at `id`.
fn bind_owner(page: &mut Page, id: PageId) {
    let fields = page.fields.values_mut()
        .chain(page.relations.values_mut().flatten().flat_map(|r| r.fields.values_mut()));

    for field in fields {
        if let Field::Ref(Some(reference @ Reference::Owner)) = field {
            *reference = Reference::Page(id);
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Opens the store persisted at `path`; an absent file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Json::read_or_default(path)
    }

    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).chain_with(|| error! {
            "failed to write store",
            "path" => path.display(),
        })
    }

    pub fn writes(&self) -> Writes {
        self.writes
    }

    pub fn stored_page(&self, id: PageId) -> Option<&StoredPage> {
        slot(&self.pages, id.0)
    }

    pub fn children(&self, parent: Option<PageId>) -> Vec<PageId> {
        match parent {
            Some(id) => self.stored_page(id).map(|p| p.children.clone()).unwrap_or_default(),
            None => (1..=self.pages.len() as u64)
                .map(PageId)
                .filter(|&id| self.stored_page(id).map_or(false, |p| p.parent.is_none()))
                .collect(),
        }
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        slot(&self.assets, id.0)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    fn missing_page(id: PageId) -> crate::error::Error {
        error!("no such page", "id" => id).with_kind(ErrorKind::Unresolved)
    }
}

impl AssetStore for MemoryStore {
    fn find_asset(&self, kind: AssetKind, file_name: &str) -> Option<AssetId> {
        let path = kind.stored_path(file_name);
        self.assets.iter()
            .find(|a| a.kind == kind && a.path == path)
            .map(|a| a.id)
    }

    fn assets(&self, kind: AssetKind) -> Vec<(String, AssetId)> {
        self.assets.iter()
            .filter(|a| a.kind == kind)
            .map(|a| (a.path.rsplit('/').next().unwrap_or(&a.path).to_string(), a.id))
            .collect()
    }

    fn upsert_asset(&mut self, kind: AssetKind, path: &str, owner: UserId) -> Result<AssetId> {
        self.writes.assets += 1;
        if let Some(id) = self.find_asset(kind, path) {
            return Ok(id);
        }

        let stored = kind.stored_path(path);
        let file_name = stored.rsplit('/').next().unwrap_or(&stored);
        let title = match file_name.rsplit_once('.') {
            Some((stem, _)) => stem.to_string(),
            None => file_name.to_string(),
        };

        let id = AssetId(next_id(&self.assets));
        self.assets.push(Asset { id, kind, title, path: stored, owner });
        Ok(id)
    }
}

impl PathRouter for MemoryStore {
    fn site_root(&self) -> Option<PageId> {
        self.default_site().map(|site| site.root_page)
    }

    fn route_from(&self, root: PageId, path: &str) -> Option<PageId> {
        let mut current = root;
        for segment in path_segments(path) {
            current = self.stored_page(current)?.children.iter()
                .copied()
                .find(|&child| self.stored_page(child).map_or(false, |p| p.draft.slug == segment))?;
        }

        self.stored_page(current)
            .filter(|page| page.draft.live)
            .map(|_| current)
    }
}

impl Persistence for MemoryStore {
    fn add_child(&mut self, parent: Option<PageId>, page: &Page) -> Result<PageId> {
        if let Some(parent) = parent {
            if self.stored_page(parent).is_none() {
                return Err(Self::missing_page(parent));
            }
        }

        let collision = self.children(parent).into_iter()
            .filter_map(|id| self.stored_page(id))
            .any(|sibling| sibling.draft.slug == page.slug);

        if collision {
            return Err(error! {
                "a sibling page already uses this slug",
                "slug" => &page.slug,
                "parent" => parent.map_or_else(|| "<root>".to_string(), |p| p.to_string()),
            });
        }

        let id = PageId(next_id(&self.pages));
        let mut draft = page.clone();
        bind_owner(&mut draft, id);
        self.pages.push(StoredPage {
            parent,
            children: vec![],
            draft,
            published: None,
            revisions: 1,
        });

        if let Some(parent) = parent.and_then(|p| slot_mut(&mut self.pages, p.0)) {
            parent.children.push(id);
        }

        self.writes.add_child += 1;
        Ok(id)
    }

    fn save(&mut self, id: PageId, page: &Page) -> Result<()> {
        let stored = slot_mut(&mut self.pages, id.0).ok_or_else(|| Self::missing_page(id))?;
        stored.draft = page.clone();
        stored.draft.has_unpublished_changes = true;
        bind_owner(&mut stored.draft, id);
        stored.revisions += 1;
        self.writes.save += 1;
        Ok(())
    }

    fn publish(&mut self, id: PageId) -> Result<()> {
        let stored = slot_mut(&mut self.pages, id.0).ok_or_else(|| Self::missing_page(id))?;
        stored.draft.has_unpublished_changes = false;
        stored.published = Some(stored.draft.clone());
        self.writes.publish += 1;
        Ok(())
    }

    fn page(&self, id: PageId) -> Option<&Page> {
        self.stored_page(id).map(|p| &p.draft)
    }
}

impl RecordStore for MemoryStore {
    fn natural_key(&self, kind: &str) -> Option<&str> {
        self.natural_keys.get(kind).map(|k| k.as_str())
    }

    fn set_natural_key(&mut self, kind: &str, field: &str) {
        self.natural_keys.insert(kind.to_string(), field.to_string());
    }

    fn find_record(&self, kind: &str, key: &Value) -> Option<RecordId> {
        let field = self.natural_key(kind)?;
        self.records.iter()
            .position(|r| &*r.kind == kind && r.fields.get(field) == Some(key))
            .map(|i| RecordId(i as u64 + 1))
    }

    fn save_record(&mut self, id: Option<RecordId>, record: Record) -> Result<RecordId> {
        self.writes.records += 1;
        match id {
            Some(id) => {
                let slot = slot_mut(&mut self.records, id.0).ok_or_else(|| error! {
                    "no such record",
                    "id" => id,
                }.with_kind(ErrorKind::Unresolved))?;

                *slot = record;
                Ok(id)
            }
            None => {
                let id = RecordId(next_id(&self.records));
                self.records.push(record);
                Ok(id)
            }
        }
    }

    fn record(&self, id: RecordId) -> Option<&Record> {
        slot(&self.records, id.0)
    }
}

impl UserStore for MemoryStore {
    fn find_user(&self, username: &str) -> Option<UserId> {
        self.users.iter()
            .position(|u| u.username == username)
            .map(|i| UserId(i as u64 + 1))
    }

    fn create_user(&mut self, user: User) -> Result<UserId> {
        if self.find_user(&user.username).is_some() {
            return err!("username is already taken", "username" => user.username);
        }

        self.writes.users += 1;
        self.users.push(user);
        Ok(UserId(self.users.len() as u64))
    }
}

impl SiteStore for MemoryStore {
    fn upsert_site(&mut self, site: Site) -> Result<()> {
        if self.page(site.root_page).is_none() {
            return Err(Self::missing_page(site.root_page));
        }

        if site.is_default {
            self.sites.iter_mut().for_each(|s| s.is_default = false);
        }

        self.writes.sites += 1;
        match self.sites.iter_mut().find(|s| s.hostname == site.hostname && s.port == site.port) {
            Some(existing) => *existing = site,
            None => self.sites.push(site),
        }

        Ok(())
    }

    fn default_site(&self) -> Option<&Site> {
        self.sites.iter().find(|s| s.is_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(slug: &str) -> Page {
        let mut page = Page::new("core.StandardPage".into(), UserId(1));
        page.title = slug.to_uppercase();
        page.slug = slug.into();
        page
    }

    #[test]
    fn sibling_slugs_are_unique() {
        let mut store = MemoryStore::new();
        let home = store.add_child(None, &page("home")).unwrap();
        store.add_child(Some(home), &page("about")).unwrap();

        let error = store.add_child(Some(home), &page("about")).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Other);
        assert!(!error.kind().is_fatal());
        assert!(store.add_child(None, &page("about")).is_ok());
    }

    #[test]
    fn routing_descends_by_slug() {
        let mut store = MemoryStore::new();
        let home = store.add_child(None, &page("home")).unwrap();
        let about = store.add_child(Some(home), &page("about")).unwrap();
        let team = store.add_child(Some(about), &page("team")).unwrap();

        assert_eq!(store.route_from(home, "/"), Some(home));
        assert_eq!(store.route_from(home, "about"), Some(about));
        assert_eq!(store.route_from(home, "/about/team/"), Some(team));
        assert_eq!(store.route_from(home, "/about/nope/"), None);
        assert_eq!(store.route("/about/"), None);

        store.upsert_site(Site {
            hostname: "localhost".into(),
            port: 80,
            root_page: home,
            is_default: true,
        }).unwrap();

        assert_eq!(store.route("/about/"), Some(about));
    }

    #[test]
    fn owner_references_bind_on_save() {
        let mut store = MemoryStore::new();
        let mut home = page("home");
        let mut item = Related::new("core.CarouselItem".into());
        item.fields.insert("page".into(), Field::Ref(Some(Reference::Owner)));
        home.relations.insert("carousel".into(), vec![item]);

        let id = store.add_child(None, &home).unwrap();
        let stored = store.page(id).unwrap();
        let field = stored.relations["carousel"][0].get("page");
        assert_eq!(field, Some(&Field::Ref(Some(Reference::Page(id)))));
    }

    #[test]
    fn records_are_found_by_natural_key() {
        let mut store = MemoryStore::new();
        let record = Record {
            kind: "core.Location".into(),
            fields: crate::dict!["slug" => "north", "name" => "North"],
        };

        let id = store.save_record(None, record).unwrap();
        assert_eq!(store.find_record("core.Location", &Value::from("north")), None);

        store.set_natural_key("core.Location", "slug");
        assert_eq!(store.find_record("core.Location", &Value::from("north")), Some(id));
        assert_eq!(store.find_record("core.Other", &Value::from("north")), None);
    }

    #[test]
    fn persisted_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = MemoryStore::new();
        let home = store.add_child(None, &page("home")).unwrap();
        store.publish(home).unwrap();
        store.upsert_asset(AssetKind::Image, "urn.jpg", UserId(1)).unwrap();
        store.persist(&path).unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.page(home), store.page(home));
        assert!(reopened.stored_page(home).unwrap().published.is_some());
        assert_eq!(reopened.find_asset(AssetKind::Image, "urn.jpg"), Some(AssetId(1)));
        assert_eq!(reopened.writes().total(), 0);
    }
}
