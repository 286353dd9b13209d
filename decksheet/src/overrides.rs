use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};

const BUILTIN_OVERRIDES: &str = include_str!("../assets/overrides.json");

/// Image urls for card names that scryfall's fuzzy search doesn't resolve
/// to the face we want, mostly the pathway lands.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct OverrideTable {
    urls: HashMap<String, String>,
}

impl OverrideTable {
    pub fn builtin() -> Result<OverrideTable> {
        serde_json::from_str(BUILTIN_OVERRIDES).map_err(|source| Error::Overrides {
            path: "assets/overrides.json".into(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<OverrideTable> {
        let text = std::fs::read_to_string(path).map_err(Error::io(path))?;
        serde_json::from_str(&text).map_err(|source| Error::Overrides {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Entries of `other` replace entries with the same name.
    pub fn merge(&mut self, other: OverrideTable) {
        debug!("merging {} image url overrides", other.urls.len());
        self.urls.extend(other.urls);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.urls.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
