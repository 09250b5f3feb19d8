use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use sprout::content::ContentDir;
use sprout::error::Result;
use sprout::value::{Dict, Format, Toml};

pub const DEFAULT_STORE: &str = "store.json";
pub const DEFAULT_MEDIA: &str = "media";

/// The optional `seeder.toml` at the root of a content directory.
///
/// ```toml
/// store = "../var/store.json"
/// media = "../var/media"
///
/// [globals]
/// company = "Acme"
/// ```
///
/// Relative paths are relative to the content directory.
#[derive(Default, Debug, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub store: Option<PathBuf>,
    #[serde(default)]
    pub media: Option<PathBuf>,
    /// Visible to templates as `G`.
    #[serde(default)]
    pub globals: Dict,
}

#[derive(Debug)]
pub struct Config {
    pub dir: ContentDir,
    pub store: PathBuf,
    pub media: PathBuf,
    pub settings: Settings,
}

impl Config {
    /// Reads the settings of `dir`. A `store` given on the command line wins
    /// over the one in `seeder.toml`.
    pub fn discover(dir: &Path, store: Option<&Path>) -> Result<Self> {
        let dir = ContentDir::new(dir)?;
        let settings: Settings = Toml::read_or_default(dir.settings_file())?;
        let store = match store {
            Some(store) => store.to_path_buf(),
            None => resolve(&dir, settings.store.as_deref(), DEFAULT_STORE),
        };

        let media = resolve(&dir, settings.media.as_deref(), DEFAULT_MEDIA);
        Ok(Config { dir, store, media, settings })
    }
}

fn resolve(dir: &ContentDir, path: Option<&Path>, default: &str) -> PathBuf {
    dir.root().join(path.unwrap_or(Path::new(default)))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn settings_are_optional() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::discover(tmp.path(), None).unwrap();
        assert_eq!(config.store, tmp.path().join(DEFAULT_STORE));
        assert_eq!(config.media, tmp.path().join(DEFAULT_MEDIA));
        assert!(config.settings.globals.is_empty());
    }

    #[test]
    fn settings_resolve_against_the_content_directory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("seeder.toml"), concat!(
            "store = \"var/db.json\"\n",
            "media = \"/srv/media\"\n",
            "[globals]\n",
            "company = \"Acme\"\n",
        )).unwrap();

        let config = Config::discover(tmp.path(), None).unwrap();
        assert_eq!(config.store, tmp.path().join("var/db.json"));
        assert_eq!(config.media, Path::new("/srv/media"));
        assert_eq!(config.settings.globals.get("company").and_then(|v| v.as_str()), Some("Acme"));

        let config = Config::discover(tmp.path(), Some(Path::new("other.json"))).unwrap();
        assert_eq!(config.store, Path::new("other.json"));
    }
}
