//! Parsed documents and the parser registry.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ast::css::{self, CssDocument};
use crate::ast::html::{self, HtmlDocument};
use crate::ast::js;
use crate::ast::js_parser::{self, ParseError as JsParseError};
use crate::source::{LocationOffset, SourcePosition, SourceRange};
use crate::urls::PackageUrl;
use crate::warning::{Warning, WarningCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    Html,
    Js,
    Css,
    Json,
}

impl DocumentType {
    pub fn from_extension(extension: &str) -> Option<DocumentType> {
        match extension {
            "html" | "htm" => Some(DocumentType::Html),
            "js" | "mjs" => Some(DocumentType::Js),
            "css" => Some(DocumentType::Css),
            "json" => Some(DocumentType::Json),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentType::Html => "html",
            DocumentType::Js => "js",
            DocumentType::Css => "css",
            DocumentType::Json => "json",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an inline document sits inside its containing document.
#[derive(Debug, Clone, Default)]
pub struct InlineInfo {
    pub offset: LocationOffset,
}

/// An immutable parse result. Cache tables hand out `Arc`s of these.
#[derive(Debug)]
pub struct ParsedDocument {
    pub url: PackageUrl,
    pub source: Arc<str>,
    pub inline: Option<InlineInfo>,
    pub ast: ParsedAst,
}

#[derive(Debug)]
pub enum ParsedAst {
    Html(HtmlDocument),
    Js(js::Program),
    Css(CssDocument),
    Json(serde_json::Value),
}

impl ParsedDocument {
    pub fn document_type(&self) -> DocumentType {
        match &self.ast {
            ParsedAst::Html(_) => DocumentType::Html,
            ParsedAst::Js(_) => DocumentType::Js,
            ParsedAst::Css(_) => DocumentType::Css,
            ParsedAst::Json(_) => DocumentType::Json,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.inline.is_some()
    }
}

/// Parses one document type. Parsers are pure: no caching, no I/O.
pub trait DocumentParser: Send + Sync {
    fn parse(
        &self,
        contents: &str,
        url: &PackageUrl,
        inline: Option<&InlineInfo>,
    ) -> Result<ParsedDocument, Warning>;
}

pub struct HtmlParser;

impl DocumentParser for HtmlParser {
    fn parse(
        &self,
        contents: &str,
        url: &PackageUrl,
        inline: Option<&InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        Ok(ParsedDocument {
            url: url.clone(),
            source: Arc::from(contents),
            inline: inline.cloned(),
            ast: ParsedAst::Html(html::parse(contents)),
        })
    }
}

pub struct JsParser;

impl DocumentParser for JsParser {
    fn parse(
        &self,
        contents: &str,
        url: &PackageUrl,
        inline: Option<&InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        // Inline scripts lex from their offset so every span is already in
        // the containing document's coordinates.
        let start = match inline {
            Some(info) => SourcePosition::new(info.offset.line, info.offset.col),
            None => SourcePosition::default(),
        };
        let program = js_parser::parse(contents, start)
            .map_err(|error| js_parse_warning(url, &error))?;
        Ok(ParsedDocument {
            url: url.clone(),
            source: Arc::from(contents),
            inline: inline.cloned(),
            ast: ParsedAst::Js(program),
        })
    }
}

fn js_parse_warning(url: &PackageUrl, error: &JsParseError) -> Warning {
    Warning::error(
        WarningCode::ParseError,
        error.message.clone(),
        SourceRange::new(url.as_str(), error.position, error.position),
    )
}

pub struct CssParser;

impl DocumentParser for CssParser {
    fn parse(
        &self,
        contents: &str,
        url: &PackageUrl,
        inline: Option<&InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        Ok(ParsedDocument {
            url: url.clone(),
            source: Arc::from(contents),
            inline: inline.cloned(),
            ast: ParsedAst::Css(css::parse(contents)),
        })
    }
}

pub struct JsonParser;

impl DocumentParser for JsonParser {
    fn parse(
        &self,
        contents: &str,
        url: &PackageUrl,
        inline: Option<&InlineInfo>,
    ) -> Result<ParsedDocument, Warning> {
        let value = serde_json::from_str(contents).map_err(|error| {
            let position = SourcePosition::new(
                error.line().saturating_sub(1),
                error.column().saturating_sub(1),
            );
            Warning::error(
                WarningCode::ParseError,
                error.to_string(),
                SourceRange::new(url.as_str(), position, position),
            )
        })?;
        Ok(ParsedDocument {
            url: url.clone(),
            source: Arc::from(contents),
            inline: inline.cloned(),
            ast: ParsedAst::Json(value),
        })
    }
}

/// Maps document types to parsers.
pub struct ParserRegistry {
    parsers: FxHashMap<DocumentType, Arc<dyn DocumentParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self {
            parsers: FxHashMap::default(),
        };
        registry.register(DocumentType::Html, Arc::new(HtmlParser));
        registry.register(DocumentType::Js, Arc::new(JsParser));
        registry.register(DocumentType::Css, Arc::new(CssParser));
        registry.register(DocumentType::Json, Arc::new(JsonParser));
        registry
    }
}

impl ParserRegistry {
    pub fn register(&mut self, document_type: DocumentType, parser: Arc<dyn DocumentParser>) {
        self.parsers.insert(document_type, parser);
    }

    pub fn parser_for(&self, document_type: DocumentType) -> Option<&Arc<dyn DocumentParser>> {
        self.parsers.get(&document_type)
    }

    /// The document type a URL parses as, judged by extension.
    pub fn type_of(&self, url: &PackageUrl) -> Option<DocumentType> {
        url.extension().and_then(DocumentType::from_extension)
    }
}
