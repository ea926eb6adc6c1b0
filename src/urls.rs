//! Canonical URLs and URL resolution.
//!
//! Every cache table in the analyzer is keyed by a [`PackageUrl`]: a
//! package-relative, dot-segment-free URL string produced by a
//! [`UrlResolver`]. Two URLs that resolve equal name the same document.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A canonical, package-relative URL.
///
/// Cheap to clone; equality and hashing are plain string equality, so the
/// resolver is the only place allowed to construct these from raw input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageUrl(Arc<str>);

impl PackageUrl {
    pub(crate) fn new(url: impl Into<Arc<str>>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this URL points outside the root package, either by escaping
    /// upward or by entering an installed-components directory.
    pub fn is_external(&self) -> bool {
        self.0.starts_with("../")
            || self
                .0
                .split('/')
                .any(|segment| segment == "bower_components" || segment == "node_modules")
    }

    /// The directory portion of the URL, without a trailing slash.
    pub fn dirname(&self) -> &str {
        match self.0.rfind('/') {
            Some(index) => &self.0[..index],
            None => "",
        }
    }

    /// The extension after the final `.` of the final segment, if any.
    pub fn extension(&self) -> Option<&str> {
        let basename = self.0.rsplit('/').next()?;
        let dot = basename.rfind('.')?;
        if dot == 0 {
            return None;
        }
        Some(&basename[dot + 1..])
    }
}

impl Deref for PackageUrl {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PackageUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves raw URL strings to canonical ones.
///
/// Unresolvable URLs pass through unchanged and are treated as opaque keys;
/// the loader then refuses them and the failure surfaces as an
/// `unable-to-load` warning rather than an error here.
pub trait UrlResolver: Send + Sync {
    fn can_resolve(&self, url: &str) -> bool;

    /// Canonicalize a root-relative URL.
    fn resolve(&self, url: &str) -> PackageUrl;

    /// Canonicalize `href` as written in the document at `base`.
    fn relative(&self, base: &PackageUrl, href: &str) -> PackageUrl;
}

/// The default resolver: treats URLs as paths relative to a single package
/// root, normalizing `.` and `..` segments and stripping queries/fragments.
#[derive(Debug, Default)]
pub struct PackageUrlResolver;

impl PackageUrlResolver {
    fn has_scheme(url: &str) -> bool {
        url.split_once(':')
            .is_some_and(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(char::is_alphanumeric))
    }

    fn normalize(url: &str) -> PackageUrl {
        let url = url
            .split_once('#')
            .map_or(url, |(path, _)| path);
        let url = url
            .split_once('?')
            .map_or(url, |(path, _)| path);
        let url = url.trim_start_matches('/');

        let mut segments: Vec<&str> = Vec::new();
        let mut escapes = 0usize;
        for segment in url.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.is_empty() {
                        escapes += 1;
                    } else {
                        segments.pop();
                    }
                }
                other => segments.push(other),
            }
        }

        let mut out = String::new();
        for _ in 0..escapes {
            out.push_str("../");
        }
        out.push_str(&segments.join("/"));
        PackageUrl::new(out)
    }
}

impl UrlResolver for PackageUrlResolver {
    fn can_resolve(&self, url: &str) -> bool {
        !Self::has_scheme(url)
    }

    fn resolve(&self, url: &str) -> PackageUrl {
        if !self.can_resolve(url) {
            // Opaque passthrough; the loader decides what to do with it.
            return PackageUrl::new(url);
        }
        Self::normalize(url)
    }

    fn relative(&self, base: &PackageUrl, href: &str) -> PackageUrl {
        if !self.can_resolve(href) {
            return PackageUrl::new(href);
        }
        if href.starts_with('/') {
            return Self::normalize(href);
        }
        let dir = base.dirname();
        if dir.is_empty() {
            Self::normalize(href)
        } else {
            Self::normalize(&format!("{dir}/{href}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PackageUrl, PackageUrlResolver, UrlResolver};

    #[test]
    fn resolve_normalizes_dot_segments() {
        let resolver = PackageUrlResolver;
        assert_eq!(resolver.resolve("./a/b.html").as_str(), "a/b.html");
        assert_eq!(resolver.resolve("a/./c/../b.html").as_str(), "a/b.html");
        assert_eq!(resolver.resolve("/a/b.html").as_str(), "a/b.html");
        assert_eq!(resolver.resolve("a/b.html#frag").as_str(), "a/b.html");
        assert_eq!(resolver.resolve("a/b.html?q=1").as_str(), "a/b.html");
    }

    #[test]
    fn relative_resolves_against_containing_directory() {
        let resolver = PackageUrlResolver;
        let base = resolver.resolve("components/app/app.html");
        assert_eq!(
            resolver.relative(&base, "../shared/util.js").as_str(),
            "components/shared/util.js"
        );
        assert_eq!(
            resolver.relative(&base, "app.js").as_str(),
            "components/app/app.js"
        );
        assert_eq!(resolver.relative(&base, "/top.html").as_str(), "top.html");
    }

    #[test]
    fn urls_with_schemes_pass_through() {
        let resolver = PackageUrlResolver;
        assert!(!resolver.can_resolve("https://example.com/x.js"));
        assert_eq!(
            resolver.resolve("https://example.com/x.js").as_str(),
            "https://example.com/x.js"
        );
    }

    #[test]
    fn external_urls_are_recognized() {
        assert!(PackageUrl::new("bower_components/x/x.html").is_external());
        assert!(PackageUrl::new("../sibling/x.html").is_external());
        assert!(!PackageUrl::new("src/x.html").is_external());
    }

    #[test]
    fn extension_of_final_segment() {
        assert_eq!(PackageUrl::new("a/b.min.js").extension(), Some("js"));
        assert_eq!(PackageUrl::new("a/.hidden").extension(), None);
        assert_eq!(PackageUrl::new("a/b").extension(), None);
    }
}
