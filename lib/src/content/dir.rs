use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::value::{Dict, Format, Yaml};

/// The layout of a content directory.
///
/// ```text
/// <content>/
///   pages/             page documents, one per file
///   models/            non-page records, one type per file
///   image-library/     image files
///   document-library/  document files
///   pages.yml          attribute defaults merged under every page
///   relations.yml      per-type attribute transformations
///   sites.yml          site records
///   users.yml          user records
///   schema.toml        the type registry
///   seeder.toml        command-line tool settings
/// ```
#[derive(Debug, Clone)]
pub struct ContentDir {
    root: PathBuf,
}

macro_rules! content_paths {
    ($($(#[$attr:meta])* $name:ident => $path:literal),* $(,)?) => {
        $(
            $(#[$attr])*
            pub fn $name(&self) -> PathBuf {
                self.root.join($path)
            }
        )*
    };
}

impl ContentDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return err! {
                "content directory does not exist",
                "path" => root.display(),
            };
        }

        Ok(ContentDir { root: root.to_path_buf() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    content_paths! {
        pages => "pages",
        models => "models",
        image_library => "image-library",
        document_library => "document-library",
        /// Attribute defaults merged under every page.
        defaults_file => "pages.yml",
        relations_file => "relations.yml",
        sites_file => "sites.yml",
        users_file => "users.yml",
        schema_file => "schema.toml",
        settings_file => "seeder.toml",
    }

    /// The page attribute defaults, empty when `pages.yml` is absent.
    pub fn defaults(&self) -> Result<Dict> {
        Yaml::read_or_default(self.defaults_file())
    }
}
