mod dir;
mod document;

pub use dir::*;
pub use document::*;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Result;
use crate::fstree::{Entry, FsTree};
use crate::templating::Engine;

/// Reads every content document below a pages directory.
pub struct Loader<'e> {
    engine: &'e dyn Engine,
}

impl<'e> Loader<'e> {
    pub fn new(engine: &'e dyn Engine) -> Self {
        Loader { engine }
    }

    /// Loads the documents below `pages`. In every directory, document files
    /// come first, ordered by their full file name, then sub-directories in
    /// name order. Documents are parsed in parallel; the output keeps the
    /// enumeration order.
    pub fn load<P: AsRef<Path>>(&self, pages: P) -> Result<Vec<ContentDocument>> {
        let pages = pages.as_ref();
        let tree = FsTree::build(pages)?;
        let files: Vec<PathBuf> = tree.files_below(tree.root_id())
            .into_iter()
            .filter(|entry| is_document(entry))
            .filter_map(|entry| entry.path_relative_to(tree.root()))
            .map(|path| path.to_path_buf())
            .collect();

        tracing::debug!(count = files.len(), root = %pages.display(), "loading content documents");
        files.par_iter()
            .map(|relative| ContentDocument::read(self.engine, pages, relative))
            .collect()
    }
}

/// Files ending in `.yml` or `.yaml` are content documents.
pub fn is_document(entry: &Entry) -> bool {
    entry.file_type.is_file() && matches!(entry.file_ext(), Some("yml" | "yaml"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;
    use crate::templating::MiniJinjaEngine;

    #[test]
    fn documents_load_in_enumeration_order() {
        let dir = tempfile::tempdir().unwrap();
        let pages = dir.path();
        fs::create_dir_all(pages.join("about")).unwrap();
        fs::write(pages.join("home.yml"), "---\npath: /\ntitle: Home\n").unwrap();
        fs::write(pages.join("002 contact.yml"), "---\ntitle: Contact\n").unwrap();
        fs::write(pages.join("001 about.yml"), "---\ntitle: About\n").unwrap();
        fs::write(pages.join("notes.txt"), "not content").unwrap();
        fs::write(pages.join("about/team.yaml"), "---\ntitle: Team\n--- @body\nhi\n").unwrap();

        let engine = MiniJinjaEngine::default();
        let docs = Loader::new(&engine).load(pages).unwrap();
        let paths: Vec<_> = docs.iter().map(|d| d.path()).collect();
        assert_eq!(paths, ["/about/", "/contact/", "/", "/about/team/"]);
        assert_eq!(docs[3].get("body").and_then(|v| v.as_str()), Some("<p>hi</p>\n"));
    }

    #[test]
    fn malformed_files_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.yml"), "title: Bad\n").unwrap();

        let engine = MiniJinjaEngine::default();
        let error = Loader::new(&engine).load(dir.path()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
    }
}
