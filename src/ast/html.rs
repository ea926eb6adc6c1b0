//! A forgiving markup parser.
//!
//! Tag soup in, tree out: unknown tags nest, stray close tags are dropped,
//! and nothing is ever a fatal error. Script and style contents are kept as
//! raw text nodes with their start positions so they can be re-parsed as
//! inline documents.

use crate::ast::{Cursor, Span};
use crate::source::SourcePosition;

#[derive(Debug, Clone, Default)]
pub struct HtmlDocument {
    pub roots: Vec<HtmlNode>,
}

#[derive(Debug, Clone)]
pub enum HtmlNode {
    Element(HtmlElement),
    Text(HtmlText),
    Comment(HtmlComment),
}

#[derive(Debug, Clone)]
pub struct HtmlElement {
    pub name: String,
    pub attrs: Vec<HtmlAttr>,
    pub children: Vec<HtmlNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct HtmlText {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct HtmlComment {
    pub value: String,
    pub span: Span,
}

impl HtmlElement {
    pub fn attr(&self, name: &str) -> Option<&HtmlAttr> {
        self.attrs
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(|attr| attr.value.as_deref())
    }

    /// The concatenated text of direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let HtmlNode::Text(text) = child {
                out.push_str(&text.value);
            }
        }
        out
    }

    /// The start position of the first direct text child, if any.
    pub fn text_start(&self) -> Option<SourcePosition> {
        self.children.iter().find_map(|child| match child {
            HtmlNode::Text(text) => Some(text.span.start),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HtmlAttr {
    pub name: String,
    pub value: Option<String>,
    pub span: Span,
}

impl HtmlDocument {
    /// Depth-first walk over every element.
    pub fn for_each_element<'a>(&'a self, f: &mut impl FnMut(&'a HtmlElement)) {
        fn walk<'a>(nodes: &'a [HtmlNode], f: &mut impl FnMut(&'a HtmlElement)) {
            for node in nodes {
                if let HtmlNode::Element(element) = node {
                    f(element);
                    walk(&element.children, f);
                }
            }
        }
        walk(&self.roots, f);
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parses markup. Never fails; malformed input degrades to text nodes.
pub fn parse(src: &str) -> HtmlDocument {
    Parser {
        cursor: Cursor::new(src, SourcePosition::default()),
        stack: Vec::new(),
        roots: Vec::new(),
    }
    .run()
}

struct Parser<'a> {
    cursor: Cursor<'a>,
    stack: Vec<HtmlElement>,
    roots: Vec<HtmlNode>,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> HtmlDocument {
        let mut text_start = self.cursor.position();
        let mut text = String::new();

        while !self.cursor.is_eof() {
            if self.cursor.starts_with("<") && self.looks_like_markup() {
                self.flush_text(&mut text, text_start);
                self.parse_markup();
                text_start = self.cursor.position();
            } else {
                // Stray `<` or ordinary text.
                if let Some(ch) = self.cursor.bump() {
                    text.push(ch);
                }
            }
        }
        self.flush_text(&mut text, text_start);

        let end = self.cursor.position();
        while let Some(mut element) = self.stack.pop() {
            element.span.end = end;
            self.append_node(HtmlNode::Element(element));
        }

        HtmlDocument { roots: self.roots }
    }

    fn looks_like_markup(&self) -> bool {
        match self.cursor.peek_second() {
            Some(ch) => ch == '!' || ch == '/' || ch.is_ascii_alphabetic(),
            None => false,
        }
    }

    fn flush_text(&mut self, text: &mut String, start: SourcePosition) {
        if text.is_empty() {
            return;
        }
        let node = HtmlNode::Text(HtmlText {
            value: std::mem::take(text),
            span: Span::new(start, self.cursor.position()),
        });
        self.append_node(node);
    }

    fn append_node(&mut self, node: HtmlNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn parse_markup(&mut self) {
        if self.cursor.starts_with("<!--") {
            self.parse_comment();
        } else if self.cursor.starts_with("<!") {
            // Doctype or similar declaration; skip to `>`.
            while let Some(ch) = self.cursor.bump() {
                if ch == '>' {
                    break;
                }
            }
        } else if self.cursor.starts_with("</") {
            self.parse_close_tag();
        } else {
            self.parse_open_tag();
        }
    }

    fn parse_comment(&mut self) {
        let start = self.cursor.position();
        self.cursor.eat_str("<!--");
        let mut value = String::new();
        while !self.cursor.is_eof() && !self.cursor.starts_with("-->") {
            if let Some(ch) = self.cursor.bump() {
                value.push(ch);
            }
        }
        self.cursor.eat_str("-->");
        let node = HtmlNode::Comment(HtmlComment {
            value,
            span: Span::new(start, self.cursor.position()),
        });
        self.append_node(node);
    }

    fn parse_close_tag(&mut self) {
        let end_start = self.cursor.position();
        self.cursor.eat_str("</");
        let name = self
            .cursor
            .eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
            .to_ascii_lowercase();
        while let Some(ch) = self.cursor.bump() {
            if ch == '>' {
                break;
            }
        }
        let end = self.cursor.position();

        // Pop until the matching open element; drop the close tag if there
        // is none.
        if let Some(index) = self.stack.iter().rposition(|element| element.name == name) {
            while self.stack.len() > index {
                let Some(mut element) = self.stack.pop() else {
                    break;
                };
                element.span.end = if self.stack.len() == index {
                    end
                } else {
                    end_start
                };
                self.append_node(HtmlNode::Element(element));
            }
        }
    }

    fn parse_open_tag(&mut self) {
        let start = self.cursor.position();
        self.cursor.eat_str("<");
        let name = self
            .cursor
            .eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
            .to_ascii_lowercase();

        let mut attrs = Vec::new();
        let mut self_closing = false;
        loop {
            self.cursor.skip_whitespace();
            match self.cursor.peek() {
                None => break,
                Some('>') => {
                    self.cursor.bump();
                    break;
                }
                Some('/') => {
                    self.cursor.bump();
                    if self.cursor.peek() == Some('>') {
                        self.cursor.bump();
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    if let Some(attr) = self.parse_attr() {
                        attrs.push(attr);
                    }
                }
            }
        }

        let mut element = HtmlElement {
            name: name.clone(),
            attrs,
            children: Vec::new(),
            span: Span::new(start, self.cursor.position()),
        };

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            self.append_node(HtmlNode::Element(element));
            return;
        }

        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            let text_start = self.cursor.position();
            let close = format!("</{name}");
            let value = self.cursor.eat_until_ignore_case(&close).to_string();
            if !value.is_empty() {
                element.children.push(HtmlNode::Text(HtmlText {
                    value,
                    span: Span::new(text_start, self.cursor.position()),
                }));
            }
            // Consume the close tag.
            while let Some(ch) = self.cursor.bump() {
                if ch == '>' {
                    break;
                }
            }
            element.span.end = self.cursor.position();
            self.append_node(HtmlNode::Element(element));
            return;
        }

        self.stack.push(element);
    }

    fn parse_attr(&mut self) -> Option<HtmlAttr> {
        let start = self.cursor.position();
        let name = self
            .cursor
            .eat_while(|ch| !ch.is_whitespace() && ch != '=' && ch != '>' && ch != '/')
            .to_ascii_lowercase();
        if name.is_empty() {
            // Not an attribute; consume one char to make progress.
            self.cursor.bump();
            return None;
        }

        self.cursor.skip_whitespace();
        let value = if self.cursor.peek() == Some('=') {
            self.cursor.bump();
            self.cursor.skip_whitespace();
            Some(match self.cursor.peek() {
                Some(quote @ ('"' | '\'')) => {
                    self.cursor.bump();
                    let value = self.cursor.eat_while(|ch| ch != quote).to_string();
                    self.cursor.bump();
                    value
                }
                _ => self
                    .cursor
                    .eat_while(|ch| !ch.is_whitespace() && ch != '>')
                    .to_string(),
            })
        } else {
            None
        };

        Some(HtmlAttr {
            name,
            value,
            span: Span::new(start, self.cursor.position()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, HtmlNode};

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = parse("<dom-module id=\"x-foo\">\n  <template><div class=a></div></template>\n</dom-module>\n");
        let mut names = Vec::new();
        doc.for_each_element(&mut |element| names.push(element.name.clone()));
        assert_eq!(names, ["dom-module", "template", "div"]);

        let mut module = None;
        doc.for_each_element(&mut |element| {
            if element.name == "dom-module" {
                module = Some(element.attr_value("id").unwrap().to_string());
            }
        });
        assert_eq!(module.as_deref(), Some("x-foo"));
    }

    #[test]
    fn script_contents_stay_raw() {
        let doc = parse("<script>\nif (1 < 2) { call(); }\n</script>");
        let mut text = None;
        doc.for_each_element(&mut |element| {
            if element.name == "script" {
                text = Some(element.text());
            }
        });
        assert_eq!(text.as_deref(), Some("\nif (1 < 2) { call(); }\n"));
    }

    #[test]
    fn script_text_position_is_tracked() {
        let doc = parse("<html>\n<script>var x = 1;</script>\n</html>");
        let mut start = None;
        doc.for_each_element(&mut |element| {
            if element.name == "script" {
                start = element.text_start();
            }
        });
        let start = start.unwrap();
        assert_eq!((start.line, start.column), (1, 8));
    }

    #[test]
    fn void_and_unclosed_elements_do_not_capture_siblings() {
        let doc = parse("<link rel=import href=\"a.html\"><div>x</div>");
        assert_eq!(doc.roots.len(), 2);
        assert!(matches!(&doc.roots[0], HtmlNode::Element(e) if e.name == "link"));
        assert!(matches!(&doc.roots[1], HtmlNode::Element(e) if e.name == "div"));
    }

    #[test]
    fn stray_close_tags_are_dropped() {
        let doc = parse("</div><p>ok</p>");
        assert_eq!(doc.roots.len(), 1);
    }
}
