//! The public facade: [`Analyzer`] accepts analysis requests and hands out
//! immutable [`Analysis`] snapshots.
//!
//! `analyze` calls serialize on the analyzer's in-flight slot. That
//! serialization exists for cache reuse, not correctness: each call forks
//! the current context and the fork becomes current when the call
//! completes, so snapshots handed out earlier remain valid and consistent.

use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use crate::context::AnalysisContext;
use crate::error::{AnalysisError, CancelToken};
use crate::features::FeatureKind;
use crate::loader::UrlLoader;
use crate::parse::{DocumentParser, DocumentType, ParserRegistry};
use crate::resolve::{Document, Feature};
use crate::scan::{Scanner, ScannerRegistry};
use crate::urls::{PackageUrl, PackageUrlResolver, UrlResolver};
use crate::warning::Warning;

pub struct AnalyzerOptions {
    loader: Arc<dyn UrlLoader>,
    resolver: Arc<dyn UrlResolver>,
    parsers: ParserRegistry,
    scanners: ScannerRegistry,
    lazy_edges: Vec<(String, Vec<String>)>,
}

impl AnalyzerOptions {
    pub fn new(loader: Arc<dyn UrlLoader>) -> Self {
        Self {
            loader,
            resolver: Arc::new(PackageUrlResolver),
            parsers: ParserRegistry::default(),
            scanners: ScannerRegistry::default(),
            lazy_edges: Vec::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_parser(
        mut self,
        document_type: DocumentType,
        parser: Arc<dyn DocumentParser>,
    ) -> Self {
        self.parsers.register(document_type, parser);
        self
    }

    pub fn with_scanner(mut self, document_type: DocumentType, scanner: Arc<dyn Scanner>) -> Self {
        self.scanners.register(document_type, scanner);
        self
    }

    /// Implicit import edges: each entry behaves as if the importer had
    /// declared the listed imports.
    pub fn with_lazy_edges(
        mut self,
        edges: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> Self {
        self.lazy_edges.extend(edges);
        self
    }
}

/// Selects features from a document's imported closure.
#[derive(Debug, Clone, Default)]
pub struct FeatureQuery {
    pub kind: Option<FeatureKind>,
    pub id: Option<String>,
    /// Traverse the import graph instead of stopping at the root document.
    pub imported: bool,
    /// Do not stop at package boundaries while traversing.
    pub external_packages: bool,
}

impl FeatureQuery {
    pub fn of_kind(kind: FeatureKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn imported(mut self) -> Self {
        self.imported = true;
        self
    }

    pub fn external_packages(mut self) -> Self {
        self.external_packages = true;
        self
    }
}

pub struct Analyzer {
    context: Mutex<Arc<AnalysisContext>>,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        let resolver = options.resolver;
        let mut lazy_edges: FxHashMap<PackageUrl, Vec<PackageUrl>> = FxHashMap::default();
        for (importer, imports) in options.lazy_edges {
            lazy_edges
                .entry(resolver.resolve(&importer))
                .or_default()
                .extend(imports.iter().map(|import| resolver.resolve(import)));
        }
        let context = AnalysisContext::new(
            Arc::new(options.parsers),
            Arc::new(options.scanners),
            options.loader,
            resolver,
            Arc::new(lazy_edges),
        );
        Self {
            context: Mutex::new(Arc::new(context)),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Arc<AnalysisContext>> {
        self.context
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Analyzes `urls` and everything they transitively import, returning a
    /// snapshot with all of them resolved.
    ///
    /// Returns the current snapshot unchanged when every URL is already
    /// resolved in it. Cancellation surfaces as
    /// [`AnalysisError::Cancelled`]; results computed before the
    /// cancellation stay in the new snapshot's cache for later calls.
    pub fn analyze<I, S>(
        &self,
        urls: I,
        token: Option<&CancelToken>,
    ) -> Result<Analysis, AnalysisError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Waiting on the slot is the "await the prior in-flight analysis"
        // step: it maximizes cache reuse between back-to-back calls.
        let mut slot = self.slot();
        if let Some(token) = token {
            token.check()?;
        }
        let current = slot.clone();

        let resolved: Vec<PackageUrl> = urls
            .into_iter()
            .map(|url| current.resolve_url(url.as_ref()))
            .collect();

        if resolved
            .iter()
            .all(|url| current.cache().analyzed.contains_key(url))
        {
            return Ok(Analysis { context: current });
        }

        let fork = Arc::new(current.fork(&[]));
        for url in &resolved {
            match fork.scan_transitive(url, token) {
                Ok(_) => {}
                Err(AnalysisError::Cancelled) => {
                    // Completed producers stay in the fork's cache for any
                    // non-cancelled peer.
                    *slot = fork;
                    return Err(AnalysisError::Cancelled);
                }
                // Document failures are recorded in the fork's failed-docs
                // table and surface through `get_document`.
                Err(AnalysisError::Document(_)) => {}
            }
        }
        for url in &resolved {
            let _ = fork.get_document(url);
        }

        *slot = fork.clone();
        Ok(Analysis { context: fork })
    }

    /// Forks the analyzer's state, invalidating the reverse-transitive
    /// import closure of `urls`. Snapshots handed out earlier are
    /// unaffected.
    pub fn files_changed<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut slot = self.slot();
        let resolved: Vec<PackageUrl> = urls
            .into_iter()
            .map(|url| slot.resolve_url(url.as_ref()))
            .collect();
        *slot = Arc::new(slot.fork(&resolved));
    }

    /// Forks with an empty cache.
    pub fn clear_caches(&self) {
        let mut slot = self.slot();
        *slot = Arc::new(slot.fork_clean());
    }

    /// The current snapshot, without scheduling any new analysis.
    pub fn snapshot(&self) -> Analysis {
        Analysis {
            context: self.slot().clone(),
        }
    }

    pub fn resolve_url(&self, url: &str) -> PackageUrl {
        self.slot().resolve_url(url)
    }

    pub fn can_resolve(&self, url: &str) -> bool {
        self.slot().can_resolve(url)
    }

    pub fn can_load(&self, url: &str) -> bool {
        let context = self.slot().clone();
        let resolved = context.resolve_url(url);
        context.can_load(&resolved)
    }
}

/// An immutable analysis snapshot bound to one cache generation.
#[derive(Clone)]
pub struct Analysis {
    context: Arc<AnalysisContext>,
}

impl Analysis {
    /// The resolved document for `url`, or the warning explaining why there
    /// is none.
    pub fn get_document(&self, url: &str) -> Result<Arc<Document>, Warning> {
        let resolved = self.context.resolve_url(url);
        self.context.get_document(&resolved)
    }

    /// The cache generation this snapshot is bound to.
    pub fn generation(&self) -> u32 {
        self.context.generation()
    }

    /// Features matching `query`, rooted at `url`.
    pub fn get_features(&self, url: &str, query: &FeatureQuery) -> Vec<Feature> {
        let root = self.context.resolve_url(url);
        let mut documents: Vec<Arc<Document>> = Vec::new();

        if query.imported {
            let mut visited: rustc_hash::FxHashSet<PackageUrl> = rustc_hash::FxHashSet::default();
            let mut queue: Vec<PackageUrl> = vec![root.clone()];
            while let Some(url) = queue.pop() {
                if !visited.insert(url.clone()) {
                    continue;
                }
                if url != root && !query.external_packages && url.is_external() {
                    continue;
                }
                let Ok(document) = self.context.get_document(&url) else {
                    continue;
                };
                for import in &document.imports {
                    if let Some(target) = &import.url {
                        queue.push(target.clone());
                    }
                }
                documents.push(document);
            }
        } else if let Ok(document) = self.context.get_document(&root) {
            documents.push(document);
        }

        let mut features = Vec::new();
        for document in &documents {
            let candidates: Vec<Feature> = match query.kind {
                Some(kind) => document.features_of_kind(kind).to_vec(),
                None => document.features.clone(),
            };
            for feature in candidates {
                if let Some(id) = &query.id {
                    if feature.identifier().as_deref() != Some(id.as_str()) {
                        continue;
                    }
                }
                features.push(feature);
            }
        }
        features
    }

    /// Every resolved document in this snapshot, sorted by URL.
    pub fn documents(&self) -> Vec<Arc<Document>> {
        let mut documents: Vec<Arc<Document>> = self
            .context
            .cache()
            .analyzed
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by(|a, b| a.url.cmp(&b.url));
        documents
    }

    /// Every warning in the snapshot: failed documents first, then
    /// per-document warnings, in stable order.
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings: Vec<Warning> = self
            .context
            .cache()
            .failed
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for document in self.documents() {
            // Inline documents re-resolve through their container; only
            // top-level documents report here.
            if document.scanned.is_inline {
                continue;
            }
            warnings.extend(document.all_warnings());
        }
        warnings.sort_by(|a, b| {
            (&a.range.file, a.range.start, a.code.as_str())
                .cmp(&(&b.range.file, b.range.start, b.code.as_str()))
        });
        warnings.dedup();
        warnings
    }
}
