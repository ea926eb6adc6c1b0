//! The dependency graph: directed edges from each document to the documents
//! it imports.
//!
//! The graph drives transitive traversal with cycle tolerance and records
//! per-document failures. Failures do not propagate upward as failures —
//! importers still become ready, and the failure surfaces later as a warning
//! on the specific import feature. The one exception is the root of
//! [`when_ready`]: its own failure fails the readiness check.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::urls::PackageUrl;
use crate::warning::Warning;

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    outgoing: FxHashMap<PackageUrl, FxHashSet<PackageUrl>>,
    incoming: FxHashMap<PackageUrl, FxHashSet<PackageUrl>>,
    failures: FxHashMap<PackageUrl, Warning>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` and its outgoing import edges.
    pub fn add_document(
        &mut self,
        url: PackageUrl,
        imports: impl IntoIterator<Item = PackageUrl>,
    ) {
        let entry = self.outgoing.entry(url.clone()).or_default();
        let imports: Vec<PackageUrl> = imports.into_iter().collect();
        entry.extend(imports.iter().cloned());
        for import in imports {
            self.incoming.entry(import).or_default().insert(url.clone());
        }
    }

    /// Marks `url` failed. The document is still part of the graph; its
    /// importers remain ready.
    pub fn reject_document(&mut self, url: PackageUrl, warning: Warning) {
        self.outgoing.entry(url.clone()).or_default();
        self.failures.insert(url, warning);
    }

    pub fn failure_of(&self, url: &PackageUrl) -> Option<&Warning> {
        self.failures.get(url)
    }

    pub fn is_known(&self, url: &PackageUrl) -> bool {
        self.outgoing.contains_key(url) || self.failures.contains_key(url)
    }

    pub fn imports_of<'a>(&'a self, url: &PackageUrl) -> impl Iterator<Item = &'a PackageUrl> + 'a {
        self.outgoing.get(url).into_iter().flatten()
    }

    /// Readiness of the transitive closure rooted at `url`.
    ///
    /// Terminates on cycles by treating already-visited nodes as ready.
    /// Returns the failures encountered in the closure; only a failure of
    /// the root itself is an error.
    pub fn when_ready(&self, url: &PackageUrl) -> Result<Vec<(PackageUrl, Warning)>, Warning> {
        if let Some(warning) = self.failures.get(url) {
            return Err(warning.clone());
        }
        let mut visited: FxHashSet<&PackageUrl> = FxHashSet::default();
        let mut failures = Vec::new();
        let mut stack: Vec<&PackageUrl> = vec![url];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(warning) = self.failures.get(current) {
                failures.push((current.clone(), warning.clone()));
            }
            if let Some(imports) = self.outgoing.get(current) {
                stack.extend(imports.iter());
            }
        }
        Ok(failures)
    }

    /// The reverse-transitive closure of `urls`: every document that
    /// transitively imports any of them, plus the inputs themselves.
    pub fn dependants_of(&self, urls: &[PackageUrl]) -> FxHashSet<PackageUrl> {
        let mut closure: FxHashSet<PackageUrl> = FxHashSet::default();
        let mut stack: Vec<PackageUrl> = urls.to_vec();
        while let Some(current) = stack.pop() {
            if !closure.insert(current.clone()) {
                continue;
            }
            if let Some(importers) = self.incoming.get(&current) {
                stack.extend(importers.iter().cloned());
            }
        }
        closure
    }

    /// Computes the invalidation closure of `urls` against this graph and
    /// returns it together with a new graph with those documents dropped.
    pub fn invalidate(&self, urls: &[PackageUrl]) -> (DependencyGraph, FxHashSet<PackageUrl>) {
        let closure = self.dependants_of(urls);
        let mut pruned = DependencyGraph::new();
        for (url, imports) in &self.outgoing {
            if closure.contains(url) {
                continue;
            }
            pruned.add_document(url.clone(), imports.iter().cloned());
        }
        for (url, warning) in &self.failures {
            if !closure.contains(url) {
                pruned.failures.insert(url.clone(), warning.clone());
            }
        }
        (pruned, closure)
    }
}

#[cfg(test)]
mod tests {
    use super::DependencyGraph;
    use crate::source::SourceRange;
    use crate::urls::PackageUrl;
    use crate::warning::{Warning, WarningCode};

    fn url(s: &str) -> PackageUrl {
        PackageUrl::new(s)
    }

    fn failure(file: &str) -> Warning {
        Warning::error(WarningCode::ParseError, "boom", SourceRange::empty(file))
    }

    #[test]
    fn when_ready_terminates_on_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_document(url("a.html"), [url("b.html")]);
        graph.add_document(url("b.html"), [url("a.html")]);
        assert!(graph.when_ready(&url("a.html")).unwrap().is_empty());
        assert!(graph.when_ready(&url("b.html")).unwrap().is_empty());
    }

    #[test]
    fn import_failures_do_not_fail_the_importer() {
        let mut graph = DependencyGraph::new();
        graph.add_document(url("a.html"), [url("broken.html")]);
        graph.reject_document(url("broken.html"), failure("broken.html"));

        let failures = graph.when_ready(&url("a.html")).unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, url("broken.html"));

        assert!(graph.when_ready(&url("broken.html")).is_err());
    }

    #[test]
    fn dependants_closure_is_reverse_transitive() {
        let mut graph = DependencyGraph::new();
        graph.add_document(url("app.html"), [url("mid.html")]);
        graph.add_document(url("mid.html"), [url("leaf.html")]);
        graph.add_document(url("other.html"), [url("mid.html")]);
        graph.add_document(url("island.html"), []);

        let closure = graph.dependants_of(&[url("leaf.html")]);
        assert!(closure.contains(&url("leaf.html")));
        assert!(closure.contains(&url("mid.html")));
        assert!(closure.contains(&url("app.html")));
        assert!(closure.contains(&url("other.html")));
        assert!(!closure.contains(&url("island.html")));
    }

    #[test]
    fn invalidate_prunes_the_closure_and_keeps_the_rest() {
        let mut graph = DependencyGraph::new();
        graph.add_document(url("app.html"), [url("leaf.html")]);
        graph.add_document(url("island.html"), []);
        graph.add_document(url("leaf.html"), []);

        let (pruned, closure) = graph.invalidate(&[url("leaf.html")]);
        assert!(closure.contains(&url("app.html")));
        assert!(!pruned.is_known(&url("app.html")));
        assert!(!pruned.is_known(&url("leaf.html")));
        assert!(pruned.is_known(&url("island.html")));
    }

    #[test]
    fn invalidating_an_unknown_url_touches_only_itself() {
        let mut graph = DependencyGraph::new();
        graph.add_document(url("a.html"), []);
        let (pruned, closure) = graph.invalidate(&[url("new.html")]);
        assert_eq!(closure.len(), 1);
        assert!(pruned.is_known(&url("a.html")));
    }
}
