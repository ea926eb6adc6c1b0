//! Loading document contents by canonical URL.

use std::hash::BuildHasherDefault;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use rustc_hash::FxHasher;

use crate::urls::PackageUrl;

/// Loads the contents of a document by canonical URL.
///
/// Failures are `io::Error`s; the context treats any failure as a load
/// failure and reports it as an `unable-to-load` warning.
pub trait UrlLoader: Send + Sync {
    fn can_load(&self, url: &PackageUrl) -> bool;

    fn load(&self, url: &PackageUrl) -> io::Result<String>;
}

/// Loads package-relative URLs from a directory on disk.
#[derive(Debug)]
pub struct FsUrlLoader {
    root: PathBuf,
}

impl FsUrlLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, url: &PackageUrl) -> Option<PathBuf> {
        // Canonical URLs never contain dot segments, so escaping the root
        // can only happen through leading `../` segments.
        if url.starts_with("../") || url.contains("://") {
            return None;
        }
        Some(self.root.join(url.as_str()))
    }
}

impl UrlLoader for FsUrlLoader {
    fn can_load(&self, url: &PackageUrl) -> bool {
        self.path_for(url).is_some_and(|path| path.is_file())
    }

    fn load(&self, url: &PackageUrl) -> io::Result<String> {
        let path = self.path_for(url).ok_or_else(|| {
            io::Error::new(
                ErrorKind::NotFound,
                format!("URL outside the package root: {url}"),
            )
        })?;
        std::fs::read_to_string(path)
    }
}

/// In-memory loader.
///
/// Primarily for tests and for overlaying unsaved editor buffers on top of
/// another loader.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: DashMap<PackageUrl, String, BuildHasherDefault<FxHasher>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the given files, replacing existing contents.
    pub fn write_files<U, C>(&self, files: impl IntoIterator<Item = (U, C)>)
    where
        U: Into<String>,
        C: ToString,
    {
        for (url, contents) in files {
            self.write_file(url, contents.to_string());
        }
    }

    pub fn write_file(&self, url: impl Into<String>, contents: impl Into<String>) {
        self.files
            .insert(PackageUrl::new(url.into()), contents.into());
    }

    pub fn remove_file(&self, url: &str) {
        self.files.remove(&PackageUrl::new(url));
    }
}

impl UrlLoader for MemoryLoader {
    fn can_load(&self, url: &PackageUrl) -> bool {
        self.files.contains_key(url)
    }

    fn load(&self, url: &PackageUrl) -> io::Result<String> {
        self.files
            .get(url)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| io::Error::new(ErrorKind::NotFound, format!("no such document: {url}")))
    }
}

/// Chains an overlay loader in front of a base loader.
///
/// The overlay wins for any URL it can load; everything else falls through.
pub struct OverlayLoader<O, B> {
    overlay: O,
    base: B,
}

impl<O: UrlLoader, B: UrlLoader> OverlayLoader<O, B> {
    pub fn new(overlay: O, base: B) -> Self {
        Self { overlay, base }
    }
}

impl<O: UrlLoader, B: UrlLoader> UrlLoader for OverlayLoader<O, B> {
    fn can_load(&self, url: &PackageUrl) -> bool {
        self.overlay.can_load(url) || self.base.can_load(url)
    }

    fn load(&self, url: &PackageUrl) -> io::Result<String> {
        if self.overlay.can_load(url) {
            self.overlay.load(url)
        } else {
            self.base.load(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryLoader, OverlayLoader, UrlLoader};
    use crate::urls::PackageUrl;

    #[test]
    fn memory_loader_round_trips() {
        let loader = MemoryLoader::new();
        loader.write_file("a.html", "<html></html>");
        let url = PackageUrl::new("a.html");
        assert!(loader.can_load(&url));
        assert_eq!(loader.load(&url).unwrap(), "<html></html>");
        loader.remove_file("a.html");
        assert!(!loader.can_load(&url));
    }

    #[test]
    fn overlay_wins_over_base() {
        let overlay = MemoryLoader::new();
        overlay.write_file("a.js", "overlay");
        let base = MemoryLoader::new();
        base.write_file("a.js", "base");
        base.write_file("b.js", "base-only");

        let chained = OverlayLoader::new(overlay, base);
        assert_eq!(chained.load(&PackageUrl::new("a.js")).unwrap(), "overlay");
        assert_eq!(chained.load(&PackageUrl::new("b.js")).unwrap(), "base-only");
    }
}
