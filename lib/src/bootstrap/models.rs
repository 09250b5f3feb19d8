use std::path::Path;

use crate::content::ContentDir;
use crate::error::{ErrorKind, Result, Chainable};
use crate::fstree::FsTree;
use crate::store::{Record, RecordStore};
use crate::util::strip_ordering_prefix;
use crate::value::{Dict, Value, Yaml};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub files: usize,
    pub created: usize,
    pub updated: usize,
}

/// Creates or updates the non-page records in `<content>/models`.
///
/// Each `.yml` file directly in the directory holds the records of one type,
/// named by the file's stem without its ordering prefix: `001 core.Location.yml`
/// holds `core.Location` records. The file is either a single list of
/// attribute maps or a meta document followed by that list:
///
/// ```yaml
/// natural_key: slug
/// ---
/// - slug: north
///   name: North Campus
/// ```
///
/// When a natural key is declared, records whose key matches an existing
/// record update it instead of creating a new one.
pub fn models<S: RecordStore + ?Sized>(store: &mut S, dir: &ContentDir) -> Result<ModelSummary> {
    let root = dir.models();
    let tree = FsTree::build(&root)?;
    let mut summary = ModelSummary::default();
    let files = tree.root().children.iter()
        .map(|&id| &tree[id])
        .filter(|entry| entry.file_type.is_file() && entry.file_ext() == Some("yml"));

    for entry in files {
        let kind = strip_ordering_prefix(entry.file_stem());
        let (natural_key, items) = read_models(&entry.path)?;
        if let Some(key) = &natural_key {
            store.set_natural_key(kind, key);
        }

        tracing::info!(kind, count = items.len(), "creating records");
        for fields in items {
            let existing = natural_key.as_deref()
                .and_then(|key| fields.get(key))
                .and_then(|value| store.find_record(kind, value));

            match existing {
                Some(_) => summary.updated += 1,
                None => summary.created += 1,
            }

            store.save_record(existing, Record { kind: kind.into(), fields })?;
        }

        summary.files += 1;
    }

    Ok(summary)
}

fn read_models(path: &Path) -> Result<(Option<String>, Vec<Dict>)> {
    let malformed = || error! {
        "model file must hold a list of mappings, optionally after a meta document",
        "path" => path.display(),
    }.with_kind(ErrorKind::Malformed);

    let string = std::fs::read_to_string(path).chain_with(|| error! {
        "failed to read model file",
        "path" => path.display(),
    })?;

    let mut documents: Vec<Value> = Yaml::from_str_all(&string).chain_with(malformed)?;
    let (meta, items) = match documents.len() {
        1 => (None, documents.remove(0)),
        2 => {
            let items = documents.remove(1);
            (Some(documents.remove(0)), items)
        }
        _ => return Err(malformed()),
    };

    let natural_key = meta.as_ref()
        .and_then(|meta| meta.as_dict())
        .and_then(|meta| meta.get("natural_key"))
        .and_then(|key| key.as_str())
        .map(String::from);

    let items = match items {
        Value::Null => vec![],
        Value::Array(items) => items.iter()
            .map(|item| item.as_dict().cloned().ok_or_else(malformed))
            .collect::<Result<_>>()?,
        _ => return Err(malformed()),
    };

    Ok((natural_key, items))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::store::{MemoryStore, RecordId};

    #[test]
    fn records_are_keyed_naturally() {
        let tmp = tempfile::tempdir().unwrap();
        let models_dir = tmp.path().join("models");
        fs::create_dir_all(&models_dir).unwrap();
        fs::write(models_dir.join("001 core.Location.yml"), concat!(
            "natural_key: slug\n",
            "---\n",
            "- slug: north\n",
            "  name: North\n",
            "- slug: south\n",
            "  name: South\n",
        )).unwrap();

        fs::write(models_dir.join("002 core.Tag.yml"), "- name: news\n- name: events\n").unwrap();
        fs::write(models_dir.join("notes.txt"), "ignored").unwrap();

        let dir = ContentDir::new(tmp.path()).unwrap();
        let mut store = MemoryStore::new();
        let summary = models(&mut store, &dir).unwrap();
        assert_eq!(summary, ModelSummary { files: 2, created: 4, updated: 0 });
        assert_eq!(store.natural_key("core.Location"), Some("slug"));

        fs::write(models_dir.join("001 core.Location.yml"), concat!(
            "natural_key: slug\n",
            "---\n",
            "- slug: north\n",
            "  name: North Campus\n",
        )).unwrap();

        fs::remove_file(models_dir.join("002 core.Tag.yml")).unwrap();
        let summary = models(&mut store, &dir).unwrap();
        assert_eq!(summary, ModelSummary { files: 1, created: 0, updated: 1 });

        let north = store.find_record("core.Location", &Value::from("north")).unwrap();
        assert_eq!(north, RecordId(1));
        let record = store.record(north).unwrap();
        assert_eq!(record.fields.get("name"), Some(&Value::from("North Campus")));
        assert_eq!(store.records().len(), 4);
    }

    #[test]
    fn non_list_models_are_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let models_dir = tmp.path().join("models");
        fs::create_dir_all(&models_dir).unwrap();
        fs::write(models_dir.join("core.Tag.yml"), "name: news\n").unwrap();

        let dir = ContentDir::new(tmp.path()).unwrap();
        let error = models(&mut MemoryStore::new(), &dir).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Malformed);
    }
}
