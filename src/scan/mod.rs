//! The scanner pipeline.
//!
//! A scanner set is registered per document type and runs in registration
//! order; emitted features concatenate. Scanning is purely AST-driven: no
//! I/O and no imports followed. Inline sub-documents are parsed and scanned
//! recursively with their own type's scanner set, and the resulting scanned
//! document is attached to the inline feature.

pub mod html;
pub mod js;

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::features::{ScannedFeature, ScannedImport};
use crate::parse::{DocumentType, InlineInfo, ParsedDocument, ParserRegistry};
use crate::urls::{PackageUrl, UrlResolver};
use crate::warning::Warning;

/// Ambient context handed to scanners: everything they may consult beyond
/// the AST itself.
pub struct ScanContext<'a> {
    pub resolver: &'a dyn UrlResolver,
}

/// A per-document-type feature scanner.
pub trait Scanner: Send + Sync {
    fn scan(&self, document: &ParsedDocument, context: &ScanContext) -> Vec<ScannedFeature>;
}

/// Maps document types to their ordered scanner sets.
pub struct ScannerRegistry {
    scanners: FxHashMap<DocumentType, Vec<Arc<dyn Scanner>>>,
}

impl Default for ScannerRegistry {
    fn default() -> Self {
        let mut registry = Self {
            scanners: FxHashMap::default(),
        };
        registry.register(DocumentType::Html, Arc::new(html::ImportScanner));
        registry.register(DocumentType::Html, Arc::new(html::InlineDocumentScanner));
        registry.register(DocumentType::Html, Arc::new(html::ElementReferenceScanner));
        registry.register(DocumentType::Html, Arc::new(html::SlotScanner));
        registry.register(DocumentType::Js, Arc::new(js::ClassScanner));
        registry.register(DocumentType::Js, Arc::new(js::MixinScanner));
        registry.register(DocumentType::Js, Arc::new(js::BehaviorScanner));
        registry.register(DocumentType::Js, Arc::new(js::FunctionScanner));
        registry.register(DocumentType::Js, Arc::new(js::NamespaceScanner));
        registry
    }
}

impl ScannerRegistry {
    pub fn register(&mut self, document_type: DocumentType, scanner: Arc<dyn Scanner>) {
        self.scanners.entry(document_type).or_default().push(scanner);
    }

    pub fn scanners_for(&self, document_type: DocumentType) -> &[Arc<dyn Scanner>] {
        self.scanners
            .get(&document_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A document with its features scanned, imports not yet followed.
#[derive(Debug, Clone)]
pub struct ScannedDocument {
    pub url: PackageUrl,
    pub parsed: Arc<ParsedDocument>,
    pub features: Vec<ScannedFeature>,
    pub warnings: Vec<Warning>,
    pub is_inline: bool,
}

impl ScannedDocument {
    /// Direct and nested features, in scan order; inline sub-documents
    /// contribute their own features through the tree walk.
    pub fn all_features(&self) -> Vec<&ScannedFeature> {
        let mut out = Vec::new();
        collect_features(&self.features, &mut out);
        out
    }

    pub fn imports(&self) -> Vec<&ScannedImport> {
        self.all_features()
            .into_iter()
            .filter_map(|feature| match feature {
                ScannedFeature::Import(import) => Some(import),
                _ => None,
            })
            .collect()
    }

    /// Document warnings plus every feature's warnings, nested features
    /// included.
    pub fn all_warnings(&self) -> Vec<&Warning> {
        let mut out: Vec<&Warning> = self.warnings.iter().collect();
        for feature in self.all_features() {
            out.extend(feature.warnings());
            if let ScannedFeature::InlineDocument(inline) = feature {
                if let Some(document) = &inline.document {
                    out.extend(document.warnings.iter());
                }
            }
        }
        out
    }
}

fn collect_features<'a>(features: &'a [ScannedFeature], out: &mut Vec<&'a ScannedFeature>) {
    for feature in features {
        out.push(feature);
        if let ScannedFeature::InlineDocument(inline) = feature {
            if let Some(document) = &inline.document {
                collect_features(&document.features, out);
            }
        }
    }
}

/// Runs the scanner set for a parsed document and recursively scans inline
/// sub-documents.
pub fn scan_document(
    parsed: Arc<ParsedDocument>,
    parsers: &ParserRegistry,
    scanners: &ScannerRegistry,
    resolver: &dyn UrlResolver,
) -> ScannedDocument {
    let context = ScanContext { resolver };
    let document_type = parsed.document_type();
    debug!("scanning {} as {document_type}", parsed.url);

    let mut features = Vec::new();
    for scanner in scanners.scanners_for(document_type) {
        features.extend(scanner.scan(&parsed, &context));
    }

    for feature in &mut features {
        let ScannedFeature::InlineDocument(inline) = feature else {
            continue;
        };
        let Some(parser) = parsers.parser_for(inline.document_type) else {
            continue;
        };
        let info = InlineInfo {
            offset: inline.offset.clone(),
        };
        match parser.parse(&inline.contents, &parsed.url, Some(&info)) {
            Ok(sub_parsed) => {
                let sub_scanned =
                    scan_document(Arc::new(sub_parsed), parsers, scanners, resolver);
                inline.document = Some(Box::new(sub_scanned));
            }
            Err(warning) => inline.warnings.push(warning),
        }
    }

    ScannedDocument {
        url: parsed.url.clone(),
        is_inline: parsed.is_inline(),
        parsed,
        features,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use super::{scan_document, ScannedDocument, ScannerRegistry};
    use crate::parse::{DocumentType, ParserRegistry};
    use crate::urls::{PackageUrl, PackageUrlResolver};

    /// Parses and scans a standalone document for scanner unit tests.
    pub(crate) fn scan_source(url: &str, document_type: DocumentType, source: &str) -> ScannedDocument {
        let parsers = ParserRegistry::default();
        let scanners = ScannerRegistry::default();
        let resolver = PackageUrlResolver;
        let url = PackageUrl::new(url);
        let parser = parsers.parser_for(document_type).expect("parser registered");
        let parsed = parser.parse(source, &url, None).expect("fixture should parse");
        scan_document(Arc::new(parsed), &parsers, &scanners, &resolver)
    }
}
