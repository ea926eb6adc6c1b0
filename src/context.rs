//! The analysis context: one immutable snapshot of analysis state.
//!
//! A context owns a cache generation and orchestrates
//! load → parse → local-scan → transitive-scan → resolve. It never mutates
//! an existing snapshot: `files_changed` and `clear_caches` fork a new
//! context, and concurrent analyses on different forks proceed
//! independently.

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::cache::{AnalysisCache, Claim};
use crate::error::{AnalysisError, CancelToken};
use crate::loader::UrlLoader;
use crate::parse::{ParsedDocument, ParserRegistry};
use crate::resolve::{self, Document};
use crate::scan::{scan_document, ScannedDocument, ScannerRegistry};
use crate::source::SourceRange;
use crate::urls::{PackageUrl, UrlResolver};
use crate::warning::{Warning, WarningCode};

pub(crate) struct AnalysisContext {
    parsers: Arc<ParserRegistry>,
    scanners: Arc<ScannerRegistry>,
    loader: Arc<dyn UrlLoader>,
    resolver: Arc<dyn UrlResolver>,
    /// Extra implicit import edges, treated as if the importer had declared
    /// them; they emit no `Import` feature.
    lazy_edges: Arc<FxHashMap<PackageUrl, Vec<PackageUrl>>>,
    cache: AnalysisCache,
    generation: u32,
}

impl AnalysisContext {
    pub(crate) fn new(
        parsers: Arc<ParserRegistry>,
        scanners: Arc<ScannerRegistry>,
        loader: Arc<dyn UrlLoader>,
        resolver: Arc<dyn UrlResolver>,
        lazy_edges: Arc<FxHashMap<PackageUrl, Vec<PackageUrl>>>,
    ) -> Self {
        Self {
            parsers,
            scanners,
            loader,
            resolver,
            lazy_edges,
            cache: AnalysisCache::new(),
            generation: 0,
        }
    }

    pub(crate) fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    /// Forks this context, invalidating the reverse-transitive closure of
    /// `changed`. The fork shares the immutable collaborators but no
    /// mutable state.
    pub(crate) fn fork(&self, changed: &[PackageUrl]) -> AnalysisContext {
        AnalysisContext {
            parsers: self.parsers.clone(),
            scanners: self.scanners.clone(),
            loader: self.loader.clone(),
            resolver: self.resolver.clone(),
            lazy_edges: self.lazy_edges.clone(),
            cache: self.cache.invalidate(changed),
            generation: self.generation + 1,
        }
    }

    /// Forks with an empty cache.
    pub(crate) fn fork_clean(&self) -> AnalysisContext {
        AnalysisContext {
            parsers: self.parsers.clone(),
            scanners: self.scanners.clone(),
            loader: self.loader.clone(),
            resolver: self.resolver.clone(),
            lazy_edges: self.lazy_edges.clone(),
            cache: AnalysisCache::new(),
            generation: self.generation + 1,
        }
    }

    pub(crate) fn resolve_url(&self, url: &str) -> PackageUrl {
        self.resolver.resolve(url)
    }

    pub(crate) fn can_resolve(&self, url: &str) -> bool {
        self.resolver.can_resolve(url)
    }

    pub(crate) fn can_load(&self, url: &PackageUrl) -> bool {
        self.loader.can_load(url)
    }

    /// Loads and parses `url`, memoized per snapshot.
    fn parse(&self, url: &PackageUrl) -> Result<Arc<ParsedDocument>, Warning> {
        match self.cache.parsed.claim(url) {
            Claim::Done(result) => result,
            Claim::InProgress => Err(Warning::error(
                WarningCode::UnableToAnalyze,
                format!("parse of `{url}` re-entered while in progress"),
                SourceRange::empty(url.as_str()),
            )),
            Claim::Owner => {
                let result = self.parse_uncached(url);
                self.cache.parsed.finish(url, result.clone());
                result
            }
        }
    }

    fn parse_uncached(&self, url: &PackageUrl) -> Result<Arc<ParsedDocument>, Warning> {
        if !self.loader.can_load(url) {
            return Err(Warning::error(
                WarningCode::UnableToLoad,
                format!("no loader can load `{url}`"),
                SourceRange::empty(url.as_str()),
            ));
        }
        let contents = self.loader.load(url).map_err(|error| {
            Warning::error(
                WarningCode::UnableToLoad,
                format!("unable to load `{url}`: {error}"),
                SourceRange::empty(url.as_str()),
            )
        })?;
        let Some(document_type) = self.parsers.type_of(url) else {
            return Err(Warning::error(
                WarningCode::ParseError,
                format!("no parser registered for `{url}`"),
                SourceRange::empty(url.as_str()),
            ));
        };
        let Some(parser) = self.parsers.parser_for(document_type) else {
            return Err(Warning::error(
                WarningCode::ParseError,
                format!("no parser registered for `{document_type}` documents"),
                SourceRange::empty(url.as_str()),
            ));
        };
        parser.parse(&contents, url, None).map(Arc::new)
    }

    /// Parses and scans `url` without following imports.
    pub(crate) fn scan_local(
        &self,
        url: &PackageUrl,
        token: Option<&CancelToken>,
    ) -> Result<Arc<ScannedDocument>, AnalysisError> {
        match self.cache.scanned_local.claim(url) {
            Claim::Done(result) => result.map_err(AnalysisError::Document),
            Claim::InProgress => Err(AnalysisError::Document(Warning::error(
                WarningCode::UnableToAnalyze,
                format!("scan of `{url}` re-entered while in progress"),
                SourceRange::empty(url.as_str()),
            ))),
            Claim::Owner => {
                if let Some(token) = token {
                    if let Err(cancelled) = token.check() {
                        self.cache.scanned_local.cancel(url);
                        return Err(cancelled);
                    }
                }
                match self.parse(url) {
                    Err(warning) => {
                        self.cache.scanned_local.finish(url, Err(warning.clone()));
                        self.record_failure(url, warning.clone());
                        Err(AnalysisError::Document(warning))
                    }
                    Ok(parsed) => {
                        let scanned = Arc::new(scan_document(
                            parsed,
                            &self.parsers,
                            &self.scanners,
                            self.resolver.as_ref(),
                        ));
                        self.cache
                            .scanned_local
                            .finish(url, Ok(scanned.clone()));
                        Ok(scanned)
                    }
                }
            }
        }
    }

    /// Scans `url` and schedules its transitive imports.
    ///
    /// Import failures never fail the importer: they are recorded against
    /// the failed document and surface on the import feature at resolution.
    /// This is what lets cyclic imports finish.
    pub(crate) fn scan_transitive(
        &self,
        url: &PackageUrl,
        token: Option<&CancelToken>,
    ) -> Result<Arc<ScannedDocument>, AnalysisError> {
        match self.cache.scanned.claim(url) {
            Claim::Done(result) => result.map_err(AnalysisError::Document),
            Claim::InProgress => Err(AnalysisError::Document(Warning::error(
                WarningCode::UnableToAnalyze,
                format!("transitive scan of `{url}` re-entered while in progress"),
                SourceRange::empty(url.as_str()),
            ))),
            Claim::Owner => match self.scan_transitive_uncached(url, token) {
                Ok(scanned) => {
                    self.cache.scanned.finish(url, Ok(scanned.clone()));
                    Ok(scanned)
                }
                Err(AnalysisError::Cancelled) => {
                    self.cache.scanned.cancel(url);
                    Err(AnalysisError::Cancelled)
                }
                Err(AnalysisError::Document(warning)) => {
                    self.cache.scanned.finish(url, Err(warning.clone()));
                    Err(AnalysisError::Document(warning))
                }
            },
        }
    }

    fn scan_transitive_uncached(
        &self,
        url: &PackageUrl,
        token: Option<&CancelToken>,
    ) -> Result<Arc<ScannedDocument>, AnalysisError> {
        if let Some(token) = token {
            token.check()?;
        }
        let scanned = self.scan_local(url, token)?;

        let mut imports: Vec<PackageUrl> = scanned
            .imports()
            .into_iter()
            .filter_map(|import| import.url.clone())
            .collect();
        if let Some(lazy) = self.lazy_edges.get(url) {
            imports.extend(lazy.iter().cloned());
        }
        self.cache
            .graph()
            .add_document(url.clone(), imports.iter().cloned());

        for import in &imports {
            if self.cache.scanned.contains(import) {
                // Already scanned or mid-scan higher up the stack (a
                // cycle); either way it counts as scheduled.
                continue;
            }
            match self.scan_transitive(import, token) {
                Ok(_) => {}
                Err(AnalysisError::Cancelled) => return Err(AnalysisError::Cancelled),
                Err(AnalysisError::Document(warning)) => {
                    debug!("import of `{import}` from `{url}` failed: {}", warning.message);
                }
            }
        }

        match self.cache.graph().when_ready(url) {
            Ok(failures) => {
                if !failures.is_empty() {
                    debug!(
                        "`{url}` became ready with {} failed transitive import(s)",
                        failures.len()
                    );
                }
            }
            Err(warning) => return Err(AnalysisError::Document(warning)),
        }

        Ok(scanned)
    }

    fn record_failure(&self, url: &PackageUrl, warning: Warning) {
        self.cache.failed.insert(url.clone(), warning.clone());
        self.cache.graph().reject_document(url.clone(), warning);
    }

    /// The resolved document for `url`, created on first access within this
    /// snapshot and memoized for its lifetime.
    pub(crate) fn get_document(&self, url: &PackageUrl) -> Result<Arc<Document>, Warning> {
        if let Some(document) = self.cache.analyzed.get(url) {
            return Ok(document.value().clone());
        }
        if let Some(warning) = self.cache.failed.get(url) {
            return Err(warning.value().clone());
        }
        let scanned = match self.cache.scanned.peek(url) {
            Some(Ok(scanned)) => scanned,
            Some(Err(warning)) => return Err(warning),
            None => {
                return Err(Warning::warning(
                    WarningCode::UnableToAnalyze,
                    format!("`{url}` was not analyzed"),
                    SourceRange::empty(url.as_str()),
                ))
            }
        };
        let document = Arc::new(resolve::resolve_document(self, scanned));
        // First insertion wins so every caller observes the same document.
        let document = self
            .cache
            .analyzed
            .entry(url.clone())
            .or_insert(document)
            .value()
            .clone();
        Ok(document)
    }
}
