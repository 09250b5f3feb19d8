use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind, Result, Chainable};
use crate::markdown;
use crate::templating::Engine;
use crate::util::{normalize_path, strip_ordering_prefix};
use crate::value::{Dict, Format, Value, Yaml};

const DELIMITER: &str = "---";
const FRAGMENT_DELIMITER: &str = "--- @";

/// The attributes of one content file: front matter merged with every
/// rendered fragment, plus a normalized `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDocument {
    pub source: Option<PathBuf>,
    pub attributes: Dict,
}

impl ContentDocument {
    /// A document with `attributes` whose `path`, if any, is normalized.
    pub fn new(mut attributes: Dict) -> Result<Self> {
        let path = match attributes.get("path") {
            Some(Value::String(path)) => normalize_path(path),
            None => "/".to_string(),
            Some(other) => return Err(error! {
                "document `path` must be a string",
                "found" => other.kind(),
            }.with_kind(ErrorKind::Malformed)),
        };

        attributes.insert("path".into(), path.into());
        Ok(ContentDocument { source: None, attributes })
    }

    /// The normalized path, always of the form `/a/b/`.
    pub fn path(&self) -> &str {
        self.attributes.get("path").and_then(|v| v.as_str()).unwrap_or("/")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The concrete type name, i.e, `core.StandardPage`, if declared.
    pub fn type_name(&self) -> Option<&str> {
        self.get("type").and_then(|v| v.as_str())
    }

    /// Parses the text of a content file.
    ///
    /// `relative` is the file's path relative to the pages directory. It is
    /// used to compute `path` when the front matter does not declare one.
    pub fn parse(engine: &dyn Engine, text: &str, relative: Option<&Path>) -> Result<Self> {
        let text = match text.contains('\r') {
            true => text.replace("\r\n", "\n"),
            false => text.to_string(),
        };

        let mut lines = text.split_inclusive('\n');
        if lines.next().map(|l| l.trim_end_matches('\n')) != Some(DELIMITER) {
            return Err(malformed(format!("expected first line to only contain `{DELIMITER}`")));
        }

        let mut front_matter = String::new();
        let mut front_closed = false;
        let mut fragments: Vec<(String, String)> = vec![];
        for line in lines {
            let bare = line.trim_end_matches('\n');
            if let Some(name) = bare.strip_prefix(FRAGMENT_DELIMITER) {
                let name = name.trim();
                if name.is_empty() {
                    return Err(malformed("fragment delimiter is missing a name"));
                }

                front_closed = true;
                fragments.push((name.to_string(), String::new()));
                continue;
            }

            match fragments.last_mut() {
                Some((_, body)) => body.push_str(line),
                None if bare.trim_end() == DELIMITER => front_closed = true,
                None if !front_closed => front_matter.push_str(line),
                None => {},
            }
        }

        let mut attributes = match front_matter.trim().is_empty() {
            true => Dict::new(),
            false => match Yaml::from_str::<Value>(&front_matter).map_err(parse_error)? {
                Value::Null => Dict::new(),
                Value::Dict(dict) => std::sync::Arc::unwrap_or_clone(dict),
                other => return Err(malformed(format!(
                    "front matter must be a mapping, found {}", other.kind()
                ))),
            }
        };

        for (name, body) in fragments {
            let html = markdown::render_fragment(engine, &name, &body, &attributes)?;
            attributes.insert(name.into(), html.into());
        }

        if !attributes.contains_key("path") {
            if let Some(relative) = relative {
                attributes.insert("path".into(), computed_path(relative).into());
            }
        }

        let mut document = ContentDocument::new(attributes)?;
        document.source = relative.map(|p| p.to_path_buf());
        Ok(document)
    }

    /// Reads and parses the content file at `root/relative`.
    pub fn read(engine: &dyn Engine, root: &Path, relative: &Path) -> Result<Self> {
        let file = root.join(relative);
        let text = std::fs::read_to_string(&file).chain_with(|| error! {
            "failed to read content file",
            "path" => file.display(),
        })?;

        let mut document = Self::parse(engine, &text, Some(relative)).chain_with(|| error! {
            "failed to parse content file",
            "path" => file.display(),
        })?;

        document.source = Some(file);
        Ok(document)
    }
}

fn malformed<S: Into<String>>(message: S) -> Error {
    let message: String = message.into();
    Error::from(message).with_kind(ErrorKind::Malformed)
}

fn parse_error(error: serde_yaml::Error) -> Error {
    Error::from(error)
        .chain(malformed("front matter is not valid YAML"))
}

/// The page path for a file at `relative`: directories are kept verbatim and
/// the file stem loses its ordering prefix.
///
/// ```
/// use std::path::Path;
/// use sprout::content::computed_path;
///
/// assert_eq!(computed_path(Path::new("007 our-story.yml")), "/our-story/");
/// assert_eq!(computed_path(Path::new("01 about/002 team.yml")), "/01 about/team/");
/// ```
pub fn computed_path(relative: &Path) -> String {
    let mut segments: Vec<String> = relative.parent()
        .into_iter()
        .flat_map(|p| p.iter())
        .map(|s| s.to_string_lossy().into_owned())
        .collect();

    if let Some(stem) = relative.file_stem() {
        segments.push(strip_ordering_prefix(&stem.to_string_lossy()).to_string());
    }

    normalize_path(&segments.join("/"))
}
