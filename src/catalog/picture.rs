use serde::{Deserialize, Serialize};

/// One catalogued picture, keyed by its file name below the catalog root.
///
/// Fields are declared alphabetically; that is the key order of the
/// database file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Picture {
    pub dir: Vec<String>,
    pub name: String,
    /// File name, e.g. `202411201620-aaibs.webp`
    pub path: String,
    pub tags: Vec<String>,
}

impl Picture {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for Picture {
    fn default() -> Self {
        Self {
            dir: vec!["uncategorized".to_string()],
            name: "untitled".to_string(),
            path: String::new(),
            tags: Vec::new(),
        }
    }
}
