use std::fs;
use std::path::Path;
use std::ops::AddAssign;

use crate::content::ContentDir;
use crate::error::{Result, Chainable};
use crate::fstree::{Entry, FsTree};
use crate::store::{AssetKind, AssetStore, UserId};

/// File extensions accepted into the image library.
pub const IMAGE_EXTENSIONS: &[&str] = &["gif", "jpg", "jpeg", "png", "webp"];

/// Counts of one asset import.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ImportCounts {
    pub total: usize,
    /// Already stored with identical contents.
    pub unchanged: usize,
    /// Already stored with different contents; the copy was replaced.
    pub altered: usize,
    pub inserted: usize,
    /// Not acceptable as the library's kind of asset.
    pub ignored: usize,
}

impl AddAssign for ImportCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.unchanged += rhs.unchanged;
        self.altered += rhs.altered;
        self.inserted += rhs.inserted;
        self.ignored += rhs.ignored;
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AssetSummary {
    pub images: ImportCounts,
    pub documents: ImportCounts,
}

impl AssetSummary {
    pub fn total(&self) -> ImportCounts {
        let mut total = self.images;
        total += self.documents;
        total
    }
}

/// Imports `<content>/image-library` and `<content>/document-library` into
/// `media`, owned by `owner`. A library that does not exist is skipped.
pub fn assets<S: AssetStore + ?Sized>(
    store: &mut S,
    dir: &ContentDir,
    media: &Path,
    owner: UserId,
) -> Result<AssetSummary> {
    Ok(AssetSummary {
        images: import(store, &dir.image_library(), media, AssetKind::Image, owner)?,
        documents: import(store, &dir.document_library(), media, AssetKind::Document, owner)?,
    })
}

fn import<S: AssetStore + ?Sized>(
    store: &mut S,
    library: &Path,
    media: &Path,
    kind: AssetKind,
    owner: UserId,
) -> Result<ImportCounts> {
    let mut counts = ImportCounts::default();
    if !library.is_dir() {
        tracing::warn!(library = %library.display(), "asset library does not exist; skipping");
        return Ok(counts);
    }

    let tree = FsTree::build(library)?;
    for entry in tree.files_below(tree.root_id()) {
        counts.total += 1;
        let target = media.join(kind.stored_path(&entry.file_name));
        if store.find_asset(kind, &entry.file_name).is_some() && target.is_file() {
            if same_contents(&entry.path, &target)? {
                counts.unchanged += 1;
                continue;
            }

            copy(entry, &target)?;
            store.upsert_asset(kind, &entry.file_name, owner)?;
            tracing::info!(path = %entry.path.display(), "replaced asset, retaining its id");
            counts.altered += 1;
        } else if kind == AssetKind::Image && !is_image(entry) {
            tracing::error!(path = %entry.path.display(), "not an image; ignoring");
            counts.ignored += 1;
        } else {
            copy(entry, &target)?;
            let id = store.upsert_asset(kind, &entry.file_name, owner)?;
            tracing::info!(path = %entry.path.display(), %id, "added asset");
            counts.inserted += 1;
        }
    }

    Ok(counts)
}

fn is_image(entry: &Entry) -> bool {
    entry.file_ext()
        .map(|ext| ext.to_ascii_lowercase())
        .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn same_contents(a: &Path, b: &Path) -> Result<bool> {
    let read = |path: &Path| fs::read(path).chain_with(|| error! {
        "failed to read asset",
        "path" => path.display(),
    });

    Ok(read(a)? == read(b)?)
}

fn copy(entry: &Entry, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).chain_with(|| error! {
            "failed to create media directory",
            "path" => parent.display(),
        })?;
    }

    fs::copy(&entry.path, target).chain_with(|| error! {
        "failed to copy asset into media",
        "from" => entry.path.display(),
        "to" => target.display(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn imports_count_each_outcome() {
        let content = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let images = content.path().join("image-library");
        fs::create_dir_all(images.join("people")).unwrap();
        fs::write(images.join("urn.jpg"), b"urn").unwrap();
        fs::write(images.join("people/ada.PNG"), b"ada").unwrap();
        fs::write(images.join("readme.txt"), b"not an image").unwrap();
        fs::create_dir_all(content.path().join("document-library")).unwrap();
        fs::write(content.path().join("document-library/terms.pdf"), b"terms").unwrap();

        let dir = ContentDir::new(content.path()).unwrap();
        let mut store = MemoryStore::new();
        let summary = assets(&mut store, &dir, media.path(), UserId(1)).unwrap();
        assert_eq!(summary.images, ImportCounts { total: 3, inserted: 2, ignored: 1, ..Default::default() });
        assert_eq!(summary.documents, ImportCounts { total: 1, inserted: 1, ..Default::default() });
        assert!(media.path().join("original_images/ada.PNG").is_file());
        assert!(media.path().join("documents/terms.pdf").is_file());

        fs::write(images.join("urn.jpg"), b"a new urn").unwrap();
        let summary = assets(&mut store, &dir, media.path(), UserId(1)).unwrap();
        assert_eq!(summary.images, ImportCounts { total: 3, unchanged: 1, altered: 1, ignored: 1, ..Default::default() });
        assert_eq!(summary.total().unchanged, 2);
        assert_eq!(fs::read(media.path().join("original_images/urn.jpg")).unwrap(), b"a new urn");
        assert_eq!(store.assets(AssetKind::Image).len(), 2);
    }

    #[test]
    fn missing_libraries_are_skipped() {
        let content = tempfile::tempdir().unwrap();
        let media = tempfile::tempdir().unwrap();
        let dir = ContentDir::new(content.path()).unwrap();
        let summary = assets(&mut MemoryStore::new(), &dir, media.path(), UserId(1)).unwrap();
        assert_eq!(summary, AssetSummary::default());
    }
}
