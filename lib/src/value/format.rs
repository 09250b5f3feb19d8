use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{ErrorDetail, Result, Chainable};

pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// Parses `string` as the data format `Self` as a `T` or returns an error
    /// if the `string` is an invalid `T`.
    fn from_str<T: DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Reads the file at `path` and parses it as `T`.
    fn read<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
        let path = path.as_ref();
        let string = fs::read_to_string(path).chain_with(|| error! {
            "failed to open file for reading",
            "file path" => path.display()
        })?;

        Self::from_str(&string).chain_with(|| error! {
            "failed to parse file",
            "file path" => path.display(),
        })
    }

    /// Like [`Format::read()`] but yields `T::default()` when no file exists
    /// at `path` or the file is blank.
    fn read_or_default<T, P>(path: P) -> Result<T>
        where T: DeserializeOwned + Default, P: AsRef<Path>
    {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(T::default());
        }

        let string = fs::read_to_string(path).chain_with(|| error! {
            "failed to open file for reading",
            "file path" => path.display()
        })?;

        if string.trim().is_empty() {
            return Ok(T::default());
        }

        Self::from_str(&string).chain_with(|| error! {
            "failed to parse file",
            "file path" => path.display(),
        })
    }
}

macro_rules! impl_format {
    ($name:ident : $func:expr, $E:ty) => (
        #[derive(Debug, Default, Copy, Clone)]
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            fn from_str<T: DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml: toml::from_str, toml::de::Error);
impl_format!(Json: serde_json::from_str, serde_json::error::Error);
impl_format!(Yaml: serde_yaml::from_str, serde_yaml::Error);

impl Yaml {
    /// Parses every document of a multi-document YAML stream.
    pub fn from_str_all<T: DeserializeOwned>(string: &str) -> Result<Vec<T>> {
        serde_yaml::Deserializer::from_str(string)
            .map(|document| T::deserialize(document).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Dict, Value};

    #[test]
    fn yaml_stream_yields_each_document() {
        let docs: Vec<Value> = Yaml::from_str_all("natural_key: slug\n---\n- slug: a\n- slug: b\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].as_dict().unwrap()["natural_key"].as_str(), Some("slug"));
        assert_eq!(docs[1].as_slice().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let dict: Dict = Yaml::read_or_default(dir.path().join("pages.yml")).unwrap();
        assert!(dict.is_empty());

        std::fs::write(dir.path().join("pages.yml"), "type: core.StandardPage\n").unwrap();
        let dict: Dict = Yaml::read_or_default(dir.path().join("pages.yml")).unwrap();
        assert_eq!(dict["type"], Value::from("core.StandardPage"));
    }
}
