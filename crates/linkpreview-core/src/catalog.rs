use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::PreviewError;
use crate::preview::{PreviewCallback, PreviewFetcher, PreviewGenerator, PreviewResult};
use crate::sanitize::clean_html;

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    previews: BTreeMap<String, String>,
}

/// Fixed preview markup keyed by URL.
///
/// ```toml
/// [previews]
/// "https://example.com/article" = "<div class=\"onebox\">Example</div>"
/// ```
///
/// Entries are sanitized on insertion. Unknown URLs have no preview.
#[derive(Clone, Debug, Default)]
pub struct StaticPreviews {
    entries: HashMap<String, String>,
}

impl StaticPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, PreviewError> {
        let file: CatalogFile = toml::from_str(source)?;
        let mut catalog = Self::new();
        for (url, html) in file.previews {
            catalog.insert(url, &html);
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, PreviewError> {
        let source = fs::read_to_string(path).map_err(|source| PreviewError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&source)?;
        log::debug!("loaded {} preview(s) from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn with_preview(mut self, url: impl Into<String>, html: &str) -> Self {
        self.insert(url, html);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, html: &str) {
        self.entries.insert(url.into(), clean_html(html));
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PreviewGenerator for StaticPreviews {
    fn generate(&self, url: &str) -> String {
        self.get(url).unwrap_or_default().to_string()
    }
}

impl PreviewFetcher for StaticPreviews {
    fn fetch(&self, url: &str, done: PreviewCallback) {
        done(PreviewResult::from_html(self.generate(url)));
    }
}
