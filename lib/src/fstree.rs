use std::sync::Arc;
use std::path::Path;
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::{Result, Chainable};

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// An arena of every file and directory below a root, with each directory's
/// children in lexicographic order of their file names.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub depth: usize,
}

impl FsTree {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            entries: vec![],
        }
    }

    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return err! {
                "file system tree root must be an existing directory",
                "search root" => root.display(),
            }
        }

        let walker = jwalk::WalkDir::new(root)
            .follow_links(true)
            .skip_hidden(true)
            .sort(true);

        let mut tree: FsTree = FsTree::new();
        for entry in walker {
            let entry = entry.chain_with(|| error! {
                "failed to walk file system tree",
                "search root" => root.display(),
            })?;

            tree.insert(entry);
        }

        if tree.len() == 0 {
            return err! {
                "file system tree discovery yielded zero files",
                "search root" => root.display(),
            }
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    #[inline]
    pub fn get<R, P>(&self, root: R, path: P) -> Option<&Entry>
        where R: Into<Option<EntryId>>, P: AsRef<Path>
    {
        self.get_id(root.into(), path.as_ref()).map(|id| &self[id])
    }

    pub fn get_id<R, P>(&self, root: R, path: P) -> Option<EntryId>
        where R: Into<Option<EntryId>>, P: AsRef<Path>
    {
        let root = root.into().unwrap_or(self.root_id());
        let full_path = self[root].path.join(path.as_ref());
        self.map.get(&*full_path).cloned()
    }

    /// Visits `root` and its descendants. In every directory, files are
    /// visited before sub-directories; each group is in file name order.
    /// Sub-directories are only descended into when `visit` returns `true`.
    pub fn files_first<'a, F>(&'a self, root: EntryId, mut visit: F)
        where F: FnMut(&'a Entry) -> bool
    {
        fn _walk<'a, F: FnMut(&'a Entry) -> bool>(tree: &'a FsTree, id: EntryId, visit: &mut F) {
            if !visit(&tree[id]) {
                return;
            }

            let children = &tree[id].children;
            let (dirs, files): (Vec<&EntryId>, Vec<&EntryId>) = children.iter()
                .partition(|&&child| tree[child].file_type.is_dir());

            for child in files.into_iter().chain(dirs) {
                _walk(tree, *child, visit);
            }
        }

        _walk(self, root, &mut visit)
    }

    /// Every file below `root` in [`FsTree::files_first()`] order.
    pub fn files_below(&self, root: EntryId) -> Vec<&Entry> {
        let mut files = vec![];
        self.files_first(root, |entry| {
            if entry.file_type.is_file() {
                files.push(entry);
            }

            true
        });

        files
    }

    fn insert(&mut self, entry: jwalk::DirEntry<((), ())>) -> EntryId {
        let path: Arc<Path> = Arc::from(entry.path().into_boxed_path());
        let parent = match entry.depth {
            0 => None,
            _ => self.map.get(&entry.parent_path).cloned(),
        };

        let entry = Entry {
            id: EntryId(self.entries.len()),
            path,
            file_type: entry.file_type,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent,
            children: vec![],
            depth: entry.depth,
        };

        self.map.insert(entry.path.clone(), entry.id);
        if let Some(parent) = entry.parent {
            self.entries[parent.0].children.push(entry.id);
        }

        let id = entry.id;
        self.entries.push(entry);
        id
    }
}

impl Entry {
    /// File name without the extension.
    pub fn file_stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((left, _)) => left,
            None => &self.file_name,
        }
    }

    /// The complete extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, right)| right)
    }

    /// Path relative to `other`. `self` must be super-path of `other`.
    pub fn path_relative_to(&self, other: &Entry) -> Option<&Path> {
        self.path.strip_prefix(&other.path).ok()
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
