//! A minimal stylesheet parser.
//!
//! Stylesheets carry no scanned features of their own today; parsing them
//! keeps them first-class documents in the dependency graph (they can be
//! imported, invalidated, and reported on like any other document type).

use crate::ast::{Cursor, Span};
use crate::source::SourcePosition;

#[derive(Debug, Clone, Default)]
pub struct CssDocument {
    pub rules: Vec<CssRule>,
}

#[derive(Debug, Clone)]
pub struct CssRule {
    pub selector: String,
    pub span: Span,
}

/// Parses a stylesheet into a flat rule list. Forgiving: unbalanced input
/// yields the rules recognized so far.
pub fn parse(src: &str) -> CssDocument {
    let mut cursor = Cursor::new(src, SourcePosition::default());
    let mut rules = Vec::new();

    loop {
        skip_trivia(&mut cursor);
        if cursor.is_eof() {
            break;
        }
        let start = cursor.position();
        let mut selector = String::new();
        let mut reached_block = false;
        while let Some(ch) = cursor.peek() {
            if ch == '{' {
                reached_block = true;
                break;
            }
            if ch == ';' {
                // At-rule without a block, e.g. `@import ...;`.
                cursor.bump();
                break;
            }
            selector.push(ch);
            cursor.bump();
        }
        if reached_block {
            skip_block(&mut cursor);
        }
        let selector = selector.trim().to_string();
        if !selector.is_empty() {
            rules.push(CssRule {
                selector,
                span: Span::new(start, cursor.position()),
            });
        }
    }

    CssDocument { rules }
}

fn skip_trivia(cursor: &mut Cursor) {
    loop {
        cursor.skip_whitespace();
        if cursor.starts_with("/*") {
            cursor.eat_str("/*");
            while !cursor.is_eof() && !cursor.starts_with("*/") {
                cursor.bump();
            }
            cursor.eat_str("*/");
        } else {
            break;
        }
    }
}

fn skip_block(cursor: &mut Cursor) {
    debug_assert_eq!(cursor.peek(), Some('{'));
    let mut depth = 0usize;
    while let Some(ch) = cursor.bump() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            '"' | '\'' => {
                while let Some(inner) = cursor.bump() {
                    if inner == '\\' {
                        cursor.bump();
                    } else if inner == ch {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse;

    #[test]
    fn parses_rules_and_at_rules() {
        let doc = parse(
            "/* banner */\n:host { display: block; }\n@media (min-width: 600px) { .wide { color: red; } }\n@import url(\"shared.css\");\n",
        );
        let selectors: Vec<&str> = doc.rules.iter().map(|rule| rule.selector.as_str()).collect();
        assert_eq!(
            selectors,
            [":host", "@media (min-width: 600px)", "@import url(\"shared.css\")"]
        );
    }

    #[test]
    fn tolerates_unbalanced_input() {
        let doc = parse(".a { color: red;");
        assert_eq!(doc.rules.len(), 1);
    }
}
