//! Where the flat reference files come from (made by FontLab https://www.fontlab.com/)

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

/// File names of the reference data, relative to a [`TextSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub family_data: String,
    pub embeddings: String,
    pub tag_definitions: String,
    pub tag_metadata: String,
    pub rules: String,
    pub taggings: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self {
            family_data: "family_data.json".to_string(),
            embeddings: "embeddings.json".to_string(),
            tag_definitions: "tag_definitions.json".to_string(),
            tag_metadata: "tags_metadata.csv".to_string(),
            rules: "tag_rules.csv".to_string(),
            taggings: "families.csv".to_string(),
        }
    }
}

/// Anything that can hand over the text stored under a relative path
/// (a data directory, an HTTP mirror, a test fixture).
pub trait TextSource {
    fn load_text(&self, path: &str) -> Result<String>;
}

/// Reads files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl TextSource for FsSource {
    fn load_text(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        fs::read_to_string(&full).with_context(|| format!("reading {}", full.display()))
    }
}

/// In-memory files, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl TextSource for MemorySource {
    fn load_text(&self, path: &str) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {path}"))
    }
}
