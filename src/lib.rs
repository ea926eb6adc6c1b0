//! A static analyzer for web-component corpora.
//!
//! Point the [`Analyzer`] at a set of entry documents and it transitively
//! follows imports, recognizes custom elements, mixins, behaviors,
//! namespaces, classes, and functions, resolves cross-document references
//! (superclasses, mixin applications, behavior compositions), and produces
//! a queryable [`Analysis`] snapshot plus a serializable JSON summary.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

pub mod analyzer;
pub mod ast;
mod cache;
mod context;
pub mod error;
pub mod features;
pub mod graph;
pub mod jsdoc;
pub mod loader;
pub mod logging;
pub mod parse;
pub mod printer;
pub mod resolve;
pub mod scan;
pub mod settings;
pub mod source;
pub mod summary;
pub mod urls;
pub mod warning;

pub use crate::analyzer::{Analysis, Analyzer, AnalyzerOptions, FeatureQuery};
pub use crate::error::{AnalysisError, CancelToken};
pub use crate::features::FeatureKind;
pub use crate::loader::{FsUrlLoader, MemoryLoader, OverlayLoader, UrlLoader};
pub use crate::resolve::{Document, Feature};
pub use crate::urls::{PackageUrl, PackageUrlResolver, UrlResolver};
pub use crate::warning::{Severity, Warning, WarningCode};

/// Analyze package-relative entry URLs under a package root on disk.
pub fn analyze_package(root: &Path, entries: &[String]) -> Result<Analysis> {
    let loader = Arc::new(FsUrlLoader::new(root));
    let analyzer = Analyzer::new(AnalyzerOptions::new(loader));
    Ok(analyzer.analyze(entries, None)?)
}
