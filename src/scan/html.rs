//! Markup scanners: imports, inline documents, element references, slots.

use crate::ast::html::{HtmlDocument, HtmlElement, HtmlNode};
use crate::features::{
    AttributeUse, ImportKind, ScannedElementReference, ScannedFeature, ScannedImport,
    ScannedInlineDocument, Slot,
};
use crate::parse::{DocumentType, ParsedAst, ParsedDocument};
use crate::scan::{ScanContext, Scanner};
use crate::source::LocationOffset;

fn html_ast(document: &ParsedDocument) -> Option<&HtmlDocument> {
    match &document.ast {
        ParsedAst::Html(ast) => Some(ast),
        _ => None,
    }
}

/// Emits an `Import` per recognized import element, with the href resolved
/// against the containing URL.
pub struct ImportScanner;

impl Scanner for ImportScanner {
    fn scan(&self, document: &ParsedDocument, context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(ast) = html_ast(document) else {
            return Vec::new();
        };
        let mut features = Vec::new();
        ast.for_each_element(&mut |element| {
            let kind = match element.name.as_str() {
                "link" => {
                    let rel = element.attr_value("rel").unwrap_or_default();
                    if rel.eq_ignore_ascii_case("import") {
                        ImportKind::HtmlImport
                    } else if rel.eq_ignore_ascii_case("stylesheet") {
                        ImportKind::HtmlStyle
                    } else {
                        return;
                    }
                }
                "script" if element.attr("src").is_some() => ImportKind::HtmlScript,
                _ => return,
            };
            let href = match kind {
                ImportKind::HtmlScript => element.attr_value("src"),
                _ => element.attr_value("href"),
            };
            let Some(href) = href else {
                return;
            };
            // Hrefs the resolver refuses (full URLs to other origins) stay
            // unresolved; no graph edge is recorded for them.
            let url = context
                .resolver
                .can_resolve(href)
                .then(|| context.resolver.relative(&document.url, href));
            features.push(ScannedFeature::Import(ScannedImport {
                kind,
                href: href.to_string(),
                url,
                range: element.span.to_range(&document.url),
                warnings: Vec::new(),
            }));
        });
        features
    }
}

/// Extracts script and style blocks as inline sub-documents with a
/// line/column offset for downstream source ranges.
pub struct InlineDocumentScanner;

impl Scanner for InlineDocumentScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(ast) = html_ast(document) else {
            return Vec::new();
        };
        let mut features = Vec::new();
        ast.for_each_element(&mut |element| {
            let document_type = match element.name.as_str() {
                "script" if element.attr("src").is_none() => {
                    let script_type = element.attr_value("type").unwrap_or("text/javascript");
                    if script_type.contains("javascript") || script_type == "module" {
                        DocumentType::Js
                    } else {
                        return;
                    }
                }
                "style" => DocumentType::Css,
                _ => return,
            };
            let contents = element.text();
            if contents.trim().is_empty() {
                return;
            }
            let start = element.text_start().unwrap_or(element.span.start);
            features.push(ScannedFeature::InlineDocument(ScannedInlineDocument {
                document_type,
                contents,
                offset: LocationOffset::new(
                    start.line,
                    start.column,
                    Some(document.url.to_string()),
                ),
                range: element.span.to_range(&document.url),
                document: None,
                warnings: Vec::new(),
            }));
        });
        features
    }
}

/// Records every custom-element *use*: any hyphenated tag, excluding the
/// element-module wrapper, with its attributes and their ranges.
pub struct ElementReferenceScanner;

impl Scanner for ElementReferenceScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(ast) = html_ast(document) else {
            return Vec::new();
        };
        let mut features = Vec::new();
        ast.for_each_element(&mut |element| {
            if !element.name.contains('-') || element.name == "dom-module" {
                return;
            }
            let attributes = element
                .attrs
                .iter()
                .map(|attr| AttributeUse {
                    name: attr.name.clone(),
                    value: attr.value.clone(),
                    range: attr.span.to_range(&document.url),
                })
                .collect();
            features.push(ScannedFeature::ElementReference(ScannedElementReference {
                tag_name: element.name.clone(),
                attributes,
                range: element.span.to_range(&document.url),
            }));
        });
        features
    }
}

/// Finds `<slot>` elements, remembering the `dom-module` id of the template
/// that contains them so they can be attached to the right element.
pub struct SlotScanner;

impl Scanner for SlotScanner {
    fn scan(&self, document: &ParsedDocument, _context: &ScanContext) -> Vec<ScannedFeature> {
        let Some(ast) = html_ast(document) else {
            return Vec::new();
        };
        let mut features = Vec::new();
        walk_slots(&ast.roots, None, document, &mut features);
        features
    }
}

fn walk_slots(
    nodes: &[HtmlNode],
    module: Option<&str>,
    document: &ParsedDocument,
    features: &mut Vec<ScannedFeature>,
) {
    for node in nodes {
        let HtmlNode::Element(element) = node else {
            continue;
        };
        let module = owning_module(element, module);
        if element.name == "slot" {
            features.push(ScannedFeature::Slot(Slot {
                name: element.attr_value("name").map(str::to_string),
                module: module.map(str::to_string),
                range: element.span.to_range(&document.url),
            }));
        }
        walk_slots(&element.children, module, document, features);
    }
}

fn owning_module<'a>(element: &'a HtmlElement, current: Option<&'a str>) -> Option<&'a str> {
    if element.name == "dom-module" {
        element.attr_value("id").or(current)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use crate::features::{FeatureKind, ImportKind, ScannedFeature};
    use crate::parse::DocumentType;
    use crate::scan::test_util::scan_source;

    #[test]
    fn import_scanner_resolves_hrefs_against_the_containing_url() {
        let scanned = scan_source(
            "app/index.html",
            DocumentType::Html,
            "<link rel=\"import\" href=\"../widgets/widget.html\">\n<script src=\"index.js\"></script>\n<link rel=\"stylesheet\" href=\"style.css\">\n<link rel=\"icon\" href=\"favicon.ico\">\n",
        );
        let imports = scanned.imports();
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].kind, ImportKind::HtmlImport);
        assert_eq!(imports[0].url.as_ref().unwrap().as_str(), "widgets/widget.html");
        assert_eq!(imports[1].kind, ImportKind::HtmlScript);
        assert_eq!(imports[1].url.as_ref().unwrap().as_str(), "app/index.js");
        assert_eq!(imports[2].kind, ImportKind::HtmlStyle);
        assert_eq!(imports[2].url.as_ref().unwrap().as_str(), "app/style.css");
    }

    #[test]
    fn external_hrefs_record_no_resolved_url() {
        let scanned = scan_source(
            "index.html",
            DocumentType::Html,
            "<script src=\"https://cdn.example.com/lib.js\"></script>",
        );
        let imports = scanned.imports();
        assert_eq!(imports.len(), 1);
        assert!(imports[0].url.is_none());
        assert_eq!(imports[0].href, "https://cdn.example.com/lib.js");
    }

    #[test]
    fn inline_scripts_are_scanned_with_offsets() {
        let scanned = scan_source(
            "index.html",
            DocumentType::Html,
            "<html>\n<script>\nclass XInline extends HTMLElement {}\ncustomElements.define('x-inline', XInline);\n</script>\n</html>",
        );
        let inline = scanned
            .features
            .iter()
            .find_map(|feature| match feature {
                ScannedFeature::InlineDocument(inline) => Some(inline),
                _ => None,
            })
            .expect("inline document scanned");
        let document = inline.document.as_ref().expect("inline doc attached");
        let element = document
            .features
            .iter()
            .find_map(|feature| match feature {
                ScannedFeature::Element(element) => Some(element),
                _ => None,
            })
            .expect("element scanned from inline script");
        assert_eq!(element.tag_name.as_deref(), Some("x-inline"));
        // Ranges are already in the containing file's coordinates.
        assert_eq!(element.class.range.file, "index.html");
        assert_eq!(element.class.range.start.line, 2);
    }

    #[test]
    fn element_references_exclude_the_module_wrapper() {
        let scanned = scan_source(
            "index.html",
            DocumentType::Html,
            "<dom-module id=\"x-host\">\n  <template>\n    <paper-button raised label=\"go\"></paper-button>\n    <div></div>\n  </template>\n</dom-module>",
        );
        let references: Vec<_> = scanned
            .features
            .iter()
            .filter(|feature| feature.kind() == FeatureKind::ElementReference)
            .collect();
        assert_eq!(references.len(), 1);
        let ScannedFeature::ElementReference(reference) = references[0] else {
            unreachable!();
        };
        assert_eq!(reference.tag_name, "paper-button");
        assert_eq!(reference.attributes.len(), 2);
        assert_eq!(reference.attributes[0].name, "raised");
        assert_eq!(reference.attributes[1].value.as_deref(), Some("go"));
        assert_eq!(reference.attributes[1].range.start.line, 2);
    }

    #[test]
    fn slots_remember_their_module() {
        let scanned = scan_source(
            "index.html",
            DocumentType::Html,
            "<dom-module id=\"x-card\">\n  <template>\n    <slot name=\"header\"></slot>\n    <slot></slot>\n  </template>\n</dom-module>",
        );
        let slots: Vec<_> = scanned
            .features
            .iter()
            .filter_map(|feature| match feature {
                ScannedFeature::Slot(slot) => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].name.as_deref(), Some("header"));
        assert_eq!(slots[0].module.as_deref(), Some("x-card"));
        assert_eq!(slots[1].name, None);
    }
}
