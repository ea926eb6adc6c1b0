//! Project manifest discovery.
//!
//! A package may carry a `polymer.json` manifest naming its entrypoint and
//! source fragments; when present, the CLI analyzes those instead of
//! walking the whole tree.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

pub const MANIFEST_NAME: &str = "polymer.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    pub entrypoint: Option<String>,
    pub shell: Option<String>,
    pub fragments: Vec<String>,
    pub sources: Vec<String>,
}

impl ProjectConfig {
    /// Looks for a manifest in `root`.
    pub fn find(root: &Path) -> Option<PathBuf> {
        let candidate = root.join(MANIFEST_NAME);
        candidate.is_file().then_some(candidate)
    }

    pub fn load(path: &Path) -> Result<ProjectConfig> {
        debug!("reading project manifest at {path:?}");
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
        serde_json::from_str(&contents).with_context(|| format!("failed to parse {path:?}"))
    }

    /// The analysis entry set: entrypoint, shell, then fragments.
    pub fn entry_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        urls.extend(self.entrypoint.clone());
        urls.extend(self.shell.clone());
        urls.extend(self.fragments.iter().cloned());
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectConfig;

    #[test]
    fn parses_a_typical_manifest() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{
                "entrypoint": "index.html",
                "shell": "src/app-shell.html",
                "fragments": ["src/lazy-view.html"],
                "sources": ["src/**/*", "images/**/*"]
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.entry_urls(),
            ["index.html", "src/app-shell.html", "src/lazy-view.html"]
        );
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn missing_fields_default() {
        let config: ProjectConfig = serde_json::from_str("{}").unwrap();
        assert!(config.entry_urls().is_empty());
    }
}
