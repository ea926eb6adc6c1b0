//! The analysis cache: five snapshot-scoped tables plus the dependency
//! graph, all keyed by canonical URL.
//!
//! Entries are monotonic within a snapshot: once populated they are never
//! mutated. Invalidation never mutates either — it produces a *new* cache
//! without the reverse-transitive closure of the changed URLs, leaving the
//! old cache observable by anyone still holding it.

use std::hash::BuildHasherDefault;
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::{FxHashSet, FxHasher};

use crate::graph::DependencyGraph;
use crate::parse::ParsedDocument;
use crate::resolve::Document;
use crate::scan::ScannedDocument;
use crate::urls::PackageUrl;
use crate::warning::Warning;

pub(crate) type FxDashMap<K, V> = DashMap<K, V, BuildHasherDefault<FxHasher>>;

#[derive(Debug)]
enum Slot<T> {
    /// A producer owns this entry and has not finished.
    Pending,
    Ready(Result<Arc<T>, Warning>),
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        match self {
            Slot::Pending => Slot::Pending,
            Slot::Ready(result) => Slot::Ready(result.clone()),
        }
    }
}

/// The result of claiming a table entry.
pub(crate) enum Claim<T> {
    /// The caller owns the entry and must call `finish` or `cancel`.
    Owner,
    /// Another producer is mid-computation (a cycle, from a single
    /// analysis's perspective).
    InProgress,
    Done(Result<Arc<T>, Warning>),
}

/// One promise table: at-most-once production per (snapshot, URL).
#[derive(Debug)]
pub(crate) struct DocumentTable<T> {
    entries: FxDashMap<PackageUrl, Slot<T>>,
}

impl<T> Default for DocumentTable<T> {
    fn default() -> Self {
        Self {
            entries: FxDashMap::default(),
        }
    }
}

impl<T> DocumentTable<T> {
    /// Claims the entry for `url`. At most one caller per (snapshot, URL)
    /// ever receives `Claim::Owner`.
    pub(crate) fn claim(&self, url: &PackageUrl) -> Claim<T> {
        match self.entries.entry(url.clone()) {
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::Pending => Claim::InProgress,
                Slot::Ready(result) => Claim::Done(result.clone()),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Pending);
                Claim::Owner
            }
        }
    }

    pub(crate) fn finish(&self, url: &PackageUrl, result: Result<Arc<T>, Warning>) {
        self.entries.insert(url.clone(), Slot::Ready(result));
    }

    /// Drops a pending entry without recording a result, so a later analysis
    /// on the same snapshot can claim it again.
    pub(crate) fn cancel(&self, url: &PackageUrl) {
        self.entries
            .remove_if(url, |_, slot| matches!(slot, Slot::Pending));
    }

    /// The completed value for `url`, if any.
    pub(crate) fn peek(&self, url: &PackageUrl) -> Option<Result<Arc<T>, Warning>> {
        match self.entries.get(url).map(|entry| entry.value().clone()) {
            Some(Slot::Ready(result)) => Some(result),
            _ => None,
        }
    }

    /// Whether `url` is pending or complete.
    pub(crate) fn contains(&self, url: &PackageUrl) -> bool {
        self.entries.contains_key(url)
    }

    /// A copy of this table without the dropped URLs. Pending entries are
    /// never carried over: their producer belongs to the old snapshot.
    fn retained(&self, dropped: &FxHashSet<PackageUrl>) -> DocumentTable<T> {
        let retained = DocumentTable::default();
        for entry in self.entries.iter() {
            if dropped.contains(entry.key()) {
                continue;
            }
            if let Slot::Ready(result) = entry.value() {
                retained
                    .entries
                    .insert(entry.key().clone(), Slot::Ready(result.clone()));
            }
        }
        retained
    }
}

#[derive(Debug, Default)]
pub(crate) struct AnalysisCache {
    pub(crate) parsed: DocumentTable<ParsedDocument>,
    /// Scanned with no imports followed.
    pub(crate) scanned_local: DocumentTable<ScannedDocument>,
    /// Scanned with imports scheduled.
    pub(crate) scanned: DocumentTable<ScannedDocument>,
    pub(crate) analyzed: FxDashMap<PackageUrl, Arc<Document>>,
    pub(crate) failed: FxDashMap<PackageUrl, Warning>,
    graph: Mutex<DependencyGraph>,
}

impl AnalysisCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn graph(&self) -> MutexGuard<'_, DependencyGraph> {
        // Poisoning only matters if a producer panicked; the graph itself
        // is still structurally sound.
        self.graph
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A new cache without the reverse-transitive closure of `urls`,
    /// computed against the old graph. `self` is left untouched.
    pub(crate) fn invalidate(&self, urls: &[PackageUrl]) -> AnalysisCache {
        let (pruned_graph, dropped) = self.graph().invalidate(urls);

        let analyzed = FxDashMap::default();
        for entry in self.analyzed.iter() {
            if !dropped.contains(entry.key()) {
                analyzed.insert(entry.key().clone(), entry.value().clone());
            }
        }
        let failed = FxDashMap::default();
        for entry in self.failed.iter() {
            if !dropped.contains(entry.key()) {
                failed.insert(entry.key().clone(), entry.value().clone());
            }
        }

        AnalysisCache {
            parsed: self.parsed.retained(&dropped),
            scanned_local: self.scanned_local.retained(&dropped),
            scanned: self.scanned.retained(&dropped),
            analyzed,
            failed,
            graph: Mutex::new(pruned_graph),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{AnalysisCache, Claim, DocumentTable};
    use crate::source::SourceRange;
    use crate::urls::PackageUrl;
    use crate::warning::{Warning, WarningCode};

    fn url(s: &str) -> PackageUrl {
        PackageUrl::new(s)
    }

    #[test]
    fn claim_hands_out_ownership_exactly_once() {
        let table: DocumentTable<String> = DocumentTable::default();
        let key = url("a.html");
        assert!(matches!(table.claim(&key), Claim::Owner));
        assert!(matches!(table.claim(&key), Claim::InProgress));
        table.finish(&key, Ok(Arc::new("value".to_string())));
        match table.claim(&key) {
            Claim::Done(Ok(value)) => assert_eq!(*value, "value"),
            _ => panic!("expected a completed entry"),
        }
    }

    #[test]
    fn cancel_releases_only_pending_entries() {
        let table: DocumentTable<String> = DocumentTable::default();
        let key = url("a.html");
        assert!(matches!(table.claim(&key), Claim::Owner));
        table.cancel(&key);
        assert!(matches!(table.claim(&key), Claim::Owner));
        table.finish(&key, Ok(Arc::new("kept".to_string())));
        table.cancel(&key);
        assert!(table.peek(&key).is_some());
    }

    #[test]
    fn invalidate_copies_survivors_and_drops_the_closure() {
        let cache = AnalysisCache::new();
        cache.graph().add_document(url("app.html"), [url("leaf.html")]);
        cache.graph().add_document(url("island.html"), []);
        cache.graph().add_document(url("leaf.html"), []);
        cache.scanned.finish(
            &url("app.html"),
            Err(Warning::error(
                WarningCode::ParseError,
                "placeholder",
                SourceRange::empty("app.html"),
            )),
        );
        cache.failed.insert(
            url("island.html"),
            Warning::error(
                WarningCode::ParseError,
                "kept",
                SourceRange::empty("island.html"),
            ),
        );

        let fresh = cache.invalidate(&[url("leaf.html")]);
        assert!(fresh.scanned.peek(&url("app.html")).is_none());
        assert!(fresh.failed.contains_key(&url("island.html")));
        // The old cache is untouched.
        assert!(cache.scanned.peek(&url("app.html")).is_some());
    }

    #[test]
    fn pending_entries_never_survive_a_fork() {
        let cache = AnalysisCache::new();
        assert!(matches!(cache.parsed.claim(&url("a.html")), Claim::Owner));
        let fresh = cache.invalidate(&[]);
        assert!(matches!(fresh.parsed.claim(&url("a.html")), Claim::Owner));
    }
}
