//! Lexer and recursive-descent parser for the script subset.
//!
//! The parser fails fast: a syntax error fails the whole document, which the
//! context records as a parse failure for that URL. There is no recovery.

use std::fmt;

use crate::ast::js::*;
use crate::ast::{Cursor, Span};
use crate::jsdoc::Annotation;
use crate::source::SourcePosition;

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub position: SourcePosition,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Num(String),
    Template,
    Regex,
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    span: Span,
    doc: Option<String>,
}

const PUNCTS: &[&str] = &[
    ">>>=", "===", "!==", "**=", "...", "<<=", ">>=", ">>>", "=>", "==", "!=", "<=", ">=", "&&",
    "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<",
    ">>", "{", "}", "(", ")", "[", "]", ";", ",", ".", "<", ">", "+", "-", "*", "/", "%", "&",
    "|", "^", "!", "~", "?", ":", "=",
];

/// Keywords after which `/` starts a regex literal rather than division.
const NON_OPERAND_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "case", "do", "else",
    "yield", "await", "throw",
];

fn lex(src: &str, start: SourcePosition) -> Result<Vec<Token>, ParseError> {
    let mut cursor = Cursor::new(src, start);
    let mut tokens: Vec<Token> = Vec::new();
    let mut pending_doc: Option<String> = None;

    loop {
        cursor.skip_whitespace();
        if cursor.starts_with("//") {
            cursor.eat_while(|ch| ch != '\n');
            continue;
        }
        if cursor.starts_with("/*") {
            let is_doc = cursor.starts_with("/**") && !cursor.starts_with("/**/");
            let start_offset = cursor.rest();
            let mut len = 0;
            cursor.eat_str("/*");
            len += 2;
            while !cursor.is_eof() && !cursor.starts_with("*/") {
                if let Some(ch) = cursor.bump() {
                    len += ch.len_utf8();
                }
            }
            if !cursor.eat_str("*/") {
                return Err(ParseError {
                    message: "unterminated block comment".to_string(),
                    position: cursor.position(),
                });
            }
            len += 2;
            if is_doc {
                pending_doc = Some(start_offset[..len].to_string());
            }
            continue;
        }
        if cursor.is_eof() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(cursor.position(), cursor.position()),
                doc: pending_doc.take(),
            });
            return Ok(tokens);
        }

        let token_start = cursor.position();
        let kind = lex_token(&mut cursor, tokens.last())?;
        tokens.push(Token {
            kind,
            span: Span::new(token_start, cursor.position()),
            doc: pending_doc.take(),
        });
    }
}

fn lex_token(cursor: &mut Cursor, previous: Option<&Token>) -> Result<TokenKind, ParseError> {
    let Some(ch) = cursor.peek() else {
        return Ok(TokenKind::Eof);
    };

    if ch == '"' || ch == '\'' {
        return lex_string(cursor, ch);
    }
    if ch == '`' {
        return lex_template(cursor);
    }
    if ch.is_ascii_digit() || (ch == '.' && cursor.peek_second().is_some_and(|c| c.is_ascii_digit()))
    {
        return Ok(lex_number(cursor));
    }
    if ch.is_alphabetic() || ch == '_' || ch == '$' {
        let word = cursor
            .eat_while(|c| c.is_alphanumeric() || c == '_' || c == '$')
            .to_string();
        return Ok(TokenKind::Ident(word));
    }
    if ch == '/' && regex_allowed(previous) {
        return lex_regex(cursor);
    }

    for punct in PUNCTS {
        if cursor.eat_str(punct) {
            return Ok(TokenKind::Punct(punct));
        }
    }

    Err(ParseError {
        message: format!("unexpected character `{ch}`"),
        position: cursor.position(),
    })
}

fn regex_allowed(previous: Option<&Token>) -> bool {
    match previous.map(|token| &token.kind) {
        None => true,
        Some(TokenKind::Ident(word)) => NON_OPERAND_KEYWORDS.contains(&word.as_str()),
        Some(TokenKind::Punct(p)) => !matches!(*p, ")" | "]"),
        Some(TokenKind::Str(_) | TokenKind::Num(_) | TokenKind::Template | TokenKind::Regex) => {
            false
        }
        Some(TokenKind::Eof) => false,
    }
}

fn lex_string(cursor: &mut Cursor, quote: char) -> Result<TokenKind, ParseError> {
    cursor.bump();
    let mut value = String::new();
    loop {
        match cursor.bump() {
            None => {
                return Err(ParseError {
                    message: "unterminated string literal".to_string(),
                    position: cursor.position(),
                })
            }
            Some('\\') => {
                let escaped = cursor.bump().ok_or_else(|| ParseError {
                    message: "unterminated string escape".to_string(),
                    position: cursor.position(),
                })?;
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    other => value.push(other),
                }
            }
            Some(ch) if ch == quote => return Ok(TokenKind::Str(value)),
            Some(ch) => value.push(ch),
        }
    }
}

fn lex_template(cursor: &mut Cursor) -> Result<TokenKind, ParseError> {
    cursor.bump();
    loop {
        match cursor.peek() {
            None => {
                return Err(ParseError {
                    message: "unterminated template literal".to_string(),
                    position: cursor.position(),
                })
            }
            Some('\\') => {
                cursor.bump();
                cursor.bump();
            }
            Some('`') => {
                cursor.bump();
                return Ok(TokenKind::Template);
            }
            Some('$') if cursor.starts_with("${") => {
                cursor.eat_str("${");
                let mut depth = 1usize;
                while depth > 0 {
                    match cursor.bump() {
                        None => {
                            return Err(ParseError {
                                message: "unterminated template substitution".to_string(),
                                position: cursor.position(),
                            })
                        }
                        Some('{') => depth += 1,
                        Some('}') => depth -= 1,
                        Some(_) => {}
                    }
                }
            }
            Some(_) => {
                cursor.bump();
            }
        }
    }
}

fn lex_number(cursor: &mut Cursor) -> TokenKind {
    let mut raw = String::new();
    let mut previous = '\0';
    while let Some(ch) = cursor.peek() {
        let take = ch.is_ascii_alphanumeric()
            || ch == '.'
            || ((ch == '+' || ch == '-') && matches!(previous, 'e' | 'E'));
        if !take {
            break;
        }
        raw.push(ch);
        previous = ch;
        cursor.bump();
    }
    TokenKind::Num(raw)
}

fn lex_regex(cursor: &mut Cursor) -> Result<TokenKind, ParseError> {
    cursor.bump();
    let mut in_class = false;
    loop {
        match cursor.bump() {
            None | Some('\n') => {
                return Err(ParseError {
                    message: "unterminated regular expression".to_string(),
                    position: cursor.position(),
                })
            }
            Some('\\') => {
                cursor.bump();
            }
            Some('[') => in_class = true,
            Some(']') => in_class = false,
            Some('/') if !in_class => break,
            Some(_) => {}
        }
    }
    cursor.eat_while(|ch| ch.is_ascii_alphabetic());
    Ok(TokenKind::Regex)
}

/// Parses a script starting at `start` (non-zero when the script is inline
/// in a markup document).
pub fn parse(src: &str, start: SourcePosition) -> Result<Program, ParseError> {
    let tokens = lex(src, start)?;
    let mut parser = Parser { tokens, index: 0 };
    let mut statements = Vec::new();
    while !parser.at_eof() {
        statements.push(parser.parse_stmt()?);
    }
    Ok(Program { statements })
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn next_token(&self) -> Option<&Token> {
        self.tokens.get(self.index + 1)
    }

    fn at_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn cur_start(&self) -> SourcePosition {
        self.current().span.start
    }

    fn prev_end(&self) -> SourcePosition {
        if self.index == 0 {
            self.current().span.start
        } else {
            self.tokens[self.index - 1].span.end
        }
    }

    fn span_from(&self, start: SourcePosition) -> Span {
        Span::new(start, self.prev_end())
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.current().kind.clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        kind
    }

    fn take_doc(&mut self) -> Option<Annotation> {
        self.tokens[self.index]
            .doc
            .take()
            .map(|text| Annotation::parse(&text))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.cur_start(),
        }
    }

    fn at_punct(&self, punct: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Punct(p) if *p == punct)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), ParseError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{punct}`")))
        }
    }

    fn at_kw(&self, word: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(text) if text == word)
    }

    fn eat_kw(&mut self, word: &str) -> bool {
        if self.at_kw(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn next_is_name(&self) -> bool {
        matches!(
            self.next_token().map(|token| &token.kind),
            Some(TokenKind::Ident(_) | TokenKind::Str(_) | TokenKind::Num(_))
        )
    }

    // ---------------------------------------------------------------------
    // Statements

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let doc = self.take_doc();
        let start = self.cur_start();

        if self.eat_punct(";") {
            return Ok(Stmt::Empty(self.span_from(start)));
        }
        if self.at_punct("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.at_kw("var") || self.at_kw("let") || self.at_kw("const") {
            return self.parse_var(doc);
        }
        if self.at_kw("function") {
            let function = self.parse_function(doc)?;
            return Ok(Stmt::Function(function));
        }
        if self.at_kw("class") {
            let class = self.parse_class(doc)?;
            return Ok(Stmt::Class(class));
        }
        if self.eat_kw("return") {
            let value = if self.at_punct(";") || self.at_punct("}") || self.at_eof() {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.eat_punct(";");
            return Ok(Stmt::Return(ReturnStmt {
                value,
                span: self.span_from(start),
            }));
        }
        if self.eat_kw("throw") {
            let value = self.parse_expression()?;
            self.eat_punct(";");
            return Ok(Stmt::Throw(ThrowStmt {
                value,
                span: self.span_from(start),
            }));
        }
        if self.eat_kw("if") {
            let condition = self.parse_parenthesized()?;
            let then_branch = Box::new(self.parse_stmt()?);
            let else_branch = if self.eat_kw("else") {
                Some(Box::new(self.parse_stmt()?))
            } else {
                None
            };
            return Ok(Stmt::If(IfStmt {
                condition,
                then_branch,
                else_branch,
                span: self.span_from(start),
            }));
        }
        if self.eat_kw("for") {
            self.skip_parenthesized()?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::For(LoopStmt {
                body,
                span: self.span_from(start),
            }));
        }
        if self.eat_kw("while") {
            self.skip_parenthesized()?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::While(LoopStmt {
                body,
                span: self.span_from(start),
            }));
        }
        if self.eat_kw("do") {
            let body = Box::new(self.parse_stmt()?);
            if !self.eat_kw("while") {
                return Err(self.error("expected `while` after do-loop body"));
            }
            self.skip_parenthesized()?;
            self.eat_punct(";");
            return Ok(Stmt::While(LoopStmt {
                body,
                span: self.span_from(start),
            }));
        }
        if self.eat_kw("switch") {
            self.skip_parenthesized()?;
            self.skip_braced()?;
            return Ok(Stmt::Opaque(self.span_from(start)));
        }
        if self.eat_kw("try") {
            let block = self.parse_block()?;
            let handler = if self.eat_kw("catch") {
                if self.at_punct("(") {
                    self.skip_parenthesized()?;
                }
                Some(self.parse_block()?)
            } else {
                None
            };
            let finalizer = if self.eat_kw("finally") {
                Some(self.parse_block()?)
            } else {
                None
            };
            return Ok(Stmt::Try(TryStmt {
                block,
                handler,
                finalizer,
                span: self.span_from(start),
            }));
        }
        if self.eat_kw("break") || self.eat_kw("continue") {
            if let TokenKind::Ident(_) = self.current().kind {
                self.advance();
            }
            self.eat_punct(";");
            return Ok(Stmt::Empty(self.span_from(start)));
        }

        let expr = self.parse_expression()?;
        self.eat_punct(";");
        Ok(Stmt::Expr(ExprStmt {
            expr,
            doc,
            span: self.span_from(start),
        }))
    }

    fn parse_var(&mut self, doc: Option<Annotation>) -> Result<Stmt, ParseError> {
        let start = self.cur_start();
        let kind = match self.advance() {
            TokenKind::Ident(word) if word == "var" => VarKind::Var,
            TokenKind::Ident(word) if word == "let" => VarKind::Let,
            _ => VarKind::Const,
        };

        let mut declarators = Vec::new();
        loop {
            let decl_start = self.cur_start();
            let name = match self.advance() {
                TokenKind::Ident(name) => name,
                _ => return Err(self.error("expected a binding name")),
            };
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator {
                name,
                init,
                span: self.span_from(decl_start),
            });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_punct(";");

        Ok(Stmt::Var(VarDecl {
            kind,
            declarators,
            doc,
            span: self.span_from(start),
        }))
    }

    fn parse_block(&mut self) -> Result<BlockStmt, ParseError> {
        let start = self.cur_start();
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        while !self.at_punct("}") {
            if self.at_eof() {
                return Err(self.error("unterminated block"));
            }
            statements.push(self.parse_stmt()?);
        }
        self.expect_punct("}")?;
        Ok(BlockStmt {
            statements,
            span: self.span_from(start),
        })
    }

    fn parse_function(&mut self, doc: Option<Annotation>) -> Result<FunctionDecl, ParseError> {
        let start = self.cur_start();
        self.advance(); // `function`
        self.eat_punct("*");
        let name = match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?.statements;
        Ok(FunctionDecl {
            name,
            params,
            body,
            doc,
            span: self.span_from(start),
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.at_punct(")") {
            if self.at_eof() {
                return Err(self.error("unterminated parameter list"));
            }
            self.eat_punct("...");
            let start = self.cur_start();
            match self.advance() {
                TokenKind::Ident(name) => {
                    if self.eat_punct("=") {
                        // Default value; parsed and discarded.
                        self.parse_assignment()?;
                    }
                    params.push(Param {
                        name,
                        span: self.span_from(start),
                    });
                }
                _ => return Err(self.error("expected a parameter name")),
            }
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    fn parse_class(&mut self, doc: Option<Annotation>) -> Result<ClassDecl, ParseError> {
        let start = self.cur_start();
        self.advance(); // `class`
        let name = match &self.current().kind {
            TokenKind::Ident(name) if name != "extends" => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let superclass = if self.eat_kw("extends") {
            Some(Box::new(self.parse_postfix()?))
        } else {
            None
        };

        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !self.at_punct("}") {
            if self.at_eof() {
                return Err(self.error("unterminated class body"));
            }
            if self.eat_punct(";") {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.expect_punct("}")?;

        Ok(ClassDecl {
            name,
            superclass,
            members,
            doc,
            span: self.span_from(start),
        })
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, ParseError> {
        let doc = self.take_doc();
        let start = self.cur_start();

        let is_static = self.at_kw("static")
            && (self.next_is_name()
                || matches!(
                    self.next_token().map(|token| &token.kind),
                    Some(TokenKind::Punct("*" | "["))
                ));
        if is_static {
            self.advance();
        }
        if self.at_kw("async") && self.next_is_name() {
            self.advance();
        }
        self.eat_punct("*");

        let mut kind = MemberKind::Method;
        if (self.at_kw("get") || self.at_kw("set")) && self.next_is_name() {
            kind = if self.at_kw("get") {
                MemberKind::Getter
            } else {
                MemberKind::Setter
            };
            self.advance();
        }

        let name = self.parse_member_name()?;

        if self.at_punct("(") {
            if kind == MemberKind::Method && !is_static && name == "constructor" {
                kind = MemberKind::Constructor;
            }
            let params = self.parse_params()?;
            let body = self.parse_block()?.statements;
            Ok(ClassMember {
                kind,
                is_static,
                name,
                params,
                body,
                value: None,
                doc,
                span: self.span_from(start),
            })
        } else {
            let value = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            self.eat_punct(";");
            Ok(ClassMember {
                kind: MemberKind::Field,
                is_static,
                name,
                params: Vec::new(),
                body: Vec::new(),
                value,
                doc,
                span: self.span_from(start),
            })
        }
    }

    fn parse_member_name(&mut self) -> Result<String, ParseError> {
        if self.eat_punct("[") {
            let expr = self.parse_assignment()?;
            self.expect_punct("]")?;
            return Ok(expr
                .dotted_name()
                .or_else(|| expr.as_string().map(str::to_string))
                .unwrap_or_else(|| "<computed>".to_string()));
        }
        match self.advance() {
            TokenKind::Ident(name) => Ok(name),
            TokenKind::Str(value) => Ok(value),
            TokenKind::Num(raw) => Ok(raw),
            _ => Err(self.error("expected a member name")),
        }
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, ParseError> {
        self.expect_punct("(")?;
        let expr = self.parse_expression()?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    fn skip_parenthesized(&mut self) -> Result<(), ParseError> {
        self.expect_punct("(")?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_eof() {
                return Err(self.error("unterminated parenthesized group"));
            }
            if self.at_punct("(") {
                depth += 1;
            } else if self.at_punct(")") {
                depth -= 1;
            }
            self.advance();
        }
        Ok(())
    }

    fn skip_braced(&mut self) -> Result<(), ParseError> {
        self.expect_punct("{")?;
        let mut depth = 1usize;
        while depth > 0 {
            if self.at_eof() {
                return Err(self.error("unterminated braced group"));
            }
            if self.at_punct("{") {
                depth += 1;
            } else if self.at_punct("}") {
                depth -= 1;
            }
            self.advance();
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Expressions

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur_start();
        let mut expr = self.parse_assignment()?;
        while self.eat_punct(",") {
            let right = self.parse_assignment()?;
            expr = Expr::Binary(BinaryExpr {
                op: ",",
                left: Box::new(expr),
                right: Box::new(right),
                span: self.span_from(start),
            });
        }
        Ok(expr)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let start = self.cur_start();
        let left = self.parse_conditional()?;

        let op = match &self.current().kind {
            TokenKind::Punct(p @ ("=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^="
            | "<<=" | ">>=" | ">>>=" | "**=")) => Some(*p),
            _ => None,
        };
        if let Some(op) = op {
            if !matches!(left, Expr::Ident(_) | Expr::Member(_)) {
                return Err(self.error("invalid assignment target"));
            }
            self.advance();
            let value = self.parse_assignment()?;
            return Ok(Expr::Assign(AssignExpr {
                op,
                target: Box::new(left),
                value: Box::new(value),
                span: self.span_from(start),
            }));
        }
        Ok(left)
    }

    /// Commits to an arrow function only after token lookahead confirms one,
    /// so it never consumes input on the failure path.
    fn try_parse_arrow(&mut self) -> Result<Option<Expr>, ParseError> {
        let start = self.cur_start();

        if let TokenKind::Ident(_) = &self.current().kind {
            if matches!(
                self.next_token().map(|token| &token.kind),
                Some(TokenKind::Punct("=>"))
            ) {
                let name = match self.advance() {
                    TokenKind::Ident(name) => name,
                    _ => unreachable!("checked above"),
                };
                let param_span = self.span_from(start);
                self.expect_punct("=>")?;
                let body = self.parse_arrow_body()?;
                return Ok(Some(Expr::Arrow(Box::new(ArrowFunction {
                    params: vec![Param {
                        name,
                        span: param_span,
                    }],
                    body,
                    span: self.span_from(start),
                }))));
            }
            return Ok(None);
        }

        if !self.at_punct("(") {
            return Ok(None);
        }
        // Scan ahead for `) =>`.
        let mut depth = 0usize;
        let mut index = self.index;
        loop {
            match self.tokens.get(index).map(|token| &token.kind) {
                Some(TokenKind::Punct("(")) => depth += 1,
                Some(TokenKind::Punct(")")) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(TokenKind::Eof) | None => return Ok(None),
                _ => {}
            }
            index += 1;
        }
        if !matches!(
            self.tokens.get(index + 1).map(|token| &token.kind),
            Some(TokenKind::Punct("=>"))
        ) {
            return Ok(None);
        }

        let params = self.parse_params()?;
        self.expect_punct("=>")?;
        let body = self.parse_arrow_body()?;
        Ok(Some(Expr::Arrow(Box::new(ArrowFunction {
            params,
            body,
            span: self.span_from(start),
        }))))
    }

    fn parse_arrow_body(&mut self) -> Result<ArrowBody, ParseError> {
        if self.at_punct("{") {
            Ok(ArrowBody::Block(self.parse_block()?.statements))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.parse_assignment()?)))
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur_start();
        let test = self.parse_binary(1)?;
        if self.eat_punct("?") {
            let consequent = self.parse_assignment()?;
            self.expect_punct(":")?;
            let alternate = self.parse_assignment()?;
            return Ok(Expr::Conditional(ConditionalExpr {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
                span: self.span_from(start),
            }));
        }
        Ok(test)
    }

    fn binary_op(&self) -> Option<(&'static str, u8)> {
        let op = match &self.current().kind {
            TokenKind::Punct(p) => *p,
            TokenKind::Ident(word) if word == "instanceof" => "instanceof",
            TokenKind::Ident(word) if word == "in" => "in",
            _ => return None,
        };
        let precedence = match op {
            "??" | "||" => 1,
            "&&" => 2,
            "|" => 3,
            "^" => 4,
            "&" => 5,
            "==" | "!=" | "===" | "!==" => 6,
            "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 7,
            "<<" | ">>" | ">>>" => 8,
            "+" | "-" => 9,
            "*" | "/" | "%" => 10,
            "**" => 11,
            _ => return None,
        };
        Some((op, precedence))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let start = self.cur_start();
        let mut left = self.parse_unary()?;
        while let Some((op, precedence)) = self.binary_op() {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            left = Expr::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span: self.span_from(start),
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur_start();
        let op = match &self.current().kind {
            TokenKind::Punct(p @ ("!" | "~" | "+" | "-" | "++" | "--")) => Some(*p),
            TokenKind::Ident(word) if word == "typeof" => Some("typeof"),
            TokenKind::Ident(word) if word == "void" => Some("void"),
            TokenKind::Ident(word) if word == "delete" => Some("delete"),
            TokenKind::Ident(word) if word == "await" => Some("await"),
            TokenKind::Ident(word) if word == "yield" => Some("yield"),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryExpr {
                op,
                operand: Box::new(operand),
                span: self.span_from(start),
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur_start();
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_punct(".") || self.eat_punct("?.") {
                let property = match self.advance() {
                    TokenKind::Ident(name) => name,
                    _ => return Err(self.error("expected a property name after `.`")),
                };
                expr = Expr::Member(MemberExpr {
                    object: Box::new(expr),
                    property,
                    span: self.span_from(start),
                });
            } else if self.eat_punct("[") {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                let property = index
                    .as_string()
                    .map(str::to_string)
                    .unwrap_or_else(|| "<computed>".to_string());
                expr = Expr::Member(MemberExpr {
                    object: Box::new(expr),
                    property,
                    span: self.span_from(start),
                });
            } else if self.at_punct("(") {
                let args = self.parse_args()?;
                expr = Expr::Call(CallExpr {
                    callee: Box::new(expr),
                    args,
                    span: self.span_from(start),
                });
            } else if matches!(self.current().kind, TokenKind::Template) {
                let span = self.current().span;
                self.advance();
                expr = Expr::Call(CallExpr {
                    callee: Box::new(expr),
                    args: vec![Expr::Template(span)],
                    span: self.span_from(start),
                });
            } else if self.at_punct("++") || self.at_punct("--") {
                let op = match self.advance() {
                    TokenKind::Punct(p) => p,
                    _ => unreachable!("checked above"),
                };
                expr = Expr::Unary(UnaryExpr {
                    op,
                    operand: Box::new(expr),
                    span: self.span_from(start),
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.at_punct(")") {
            if self.at_eof() {
                return Err(self.error("unterminated argument list"));
            }
            self.eat_punct("...");
            args.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur_start();

        match &self.current().kind {
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => self.parse_array(),
            TokenKind::Punct("{") => self.parse_object(),
            TokenKind::Str(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::String(StringLit {
                    value,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Num(raw) => {
                let raw = raw.clone();
                self.advance();
                Ok(Expr::Number(NumberLit {
                    raw,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Template | TokenKind::Regex => {
                self.advance();
                Ok(Expr::Template(self.span_from(start)))
            }
            TokenKind::Ident(word) => match word.as_str() {
                "function" => {
                    let function = self.parse_function(None)?;
                    Ok(Expr::Function(Box::new(function)))
                }
                "class" => {
                    let class = self.parse_class(None)?;
                    Ok(Expr::Class(Box::new(class)))
                }
                "new" => {
                    self.advance();
                    let mut callee = self.parse_primary()?;
                    while self.eat_punct(".") {
                        let property = match self.advance() {
                            TokenKind::Ident(name) => name,
                            _ => return Err(self.error("expected a property name after `.`")),
                        };
                        callee = Expr::Member(MemberExpr {
                            object: Box::new(callee),
                            property,
                            span: self.span_from(start),
                        });
                    }
                    let args = if self.at_punct("(") {
                        self.parse_args()?
                    } else {
                        Vec::new()
                    };
                    Ok(Expr::New(CallExpr {
                        callee: Box::new(callee),
                        args,
                        span: self.span_from(start),
                    }))
                }
                "this" => {
                    self.advance();
                    Ok(Expr::This(self.span_from(start)))
                }
                "true" | "false" => {
                    let value = word == "true";
                    self.advance();
                    Ok(Expr::Bool(BoolLit {
                        value,
                        span: self.span_from(start),
                    }))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Null(self.span_from(start)))
                }
                _ => {
                    let name = word.clone();
                    self.advance();
                    Ok(Expr::Ident(Ident {
                        name,
                        span: self.span_from(start),
                    }))
                }
            },
            TokenKind::Punct(p) => Err(self.error(format!("unexpected token `{p}`"))),
            TokenKind::Eof => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur_start();
        self.expect_punct("[")?;
        let mut items = Vec::new();
        while !self.at_punct("]") {
            if self.at_eof() {
                return Err(self.error("unterminated array literal"));
            }
            if self.eat_punct(",") {
                continue;
            }
            self.eat_punct("...");
            items.push(self.parse_assignment()?);
        }
        self.expect_punct("]")?;
        Ok(Expr::Array(ArrayLit {
            items,
            span: self.span_from(start),
        }))
    }

    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let start = self.cur_start();
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.at_punct("}") {
            if self.at_eof() {
                return Err(self.error("unterminated object literal"));
            }
            if self.eat_punct(",") {
                continue;
            }
            let doc = self.take_doc();
            let prop_start = self.cur_start();

            if self.eat_punct("...") {
                self.parse_assignment()?;
                continue;
            }

            // `get name() {}` / `set name(v) {}` accessors.
            if (self.at_kw("get") || self.at_kw("set")) && self.next_is_name() {
                self.advance();
                let key_start = self.cur_start();
                let key = self.parse_member_name()?;
                let key_span = self.span_from(key_start);
                let params = self.parse_params()?;
                let body = self.parse_block()?.statements;
                let function_span = self.span_from(prop_start);
                properties.push(ObjectProperty {
                    key,
                    key_span,
                    value: Expr::Function(Box::new(FunctionDecl {
                        name: None,
                        params,
                        body,
                        doc: None,
                        span: function_span,
                    })),
                    is_method: true,
                    doc,
                    span: self.span_from(prop_start),
                });
                continue;
            }

            if self.at_kw("async") && self.next_is_name() {
                self.advance();
            }
            self.eat_punct("*");

            let key_start = self.cur_start();
            let key = self.parse_member_name()?;
            let key_span = self.span_from(key_start);

            let (value, is_method) = if self.at_punct("(") {
                let params = self.parse_params()?;
                let body = self.parse_block()?.statements;
                let function_span = self.span_from(prop_start);
                (
                    Expr::Function(Box::new(FunctionDecl {
                        name: Some(key.clone()),
                        params,
                        body,
                        doc: None,
                        span: function_span,
                    })),
                    true,
                )
            } else if self.eat_punct(":") {
                (self.parse_assignment()?, false)
            } else {
                (
                    Expr::Ident(Ident {
                        name: key.clone(),
                        span: key_span,
                    }),
                    false,
                )
            };

            properties.push(ObjectProperty {
                key,
                key_span,
                value,
                is_method,
                doc,
                span: self.span_from(prop_start),
            });
        }
        self.expect_punct("}")?;
        Ok(Expr::Object(ObjectLit {
            properties,
            span: self.span_from(start),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::ast::js::{ArrowBody, Expr, MemberKind, Stmt, VarKind};
    use crate::source::SourcePosition;

    fn parse_ok(src: &str) -> crate::ast::js::Program {
        parse(src, SourcePosition::default()).expect("should parse")
    }

    #[test]
    fn parses_class_declaration_with_members() {
        let program = parse_ok(
            "class XFoo extends Polymer.Element {\n  static get is() { return 'x-foo'; }\n  constructor() { this.a = 1; }\n  _render() {}\n}",
        );
        let Stmt::Class(class) = &program.statements[0] else {
            panic!("expected a class statement");
        };
        assert_eq!(class.name.as_deref(), Some("XFoo"));
        assert_eq!(
            class.superclass.as_ref().unwrap().dotted_name().as_deref(),
            Some("Polymer.Element")
        );
        assert_eq!(class.members.len(), 3);
        assert_eq!(class.members[1].kind, MemberKind::Constructor);
        assert_eq!(
            class.static_getter_value("is").unwrap().as_string(),
            Some("x-foo")
        );
    }

    #[test]
    fn parses_var_kinds_and_initializers() {
        let program = parse_ok("var a = class {};\nlet b;\nconst c = (s) => class extends s {};");
        let Stmt::Var(var_a) = &program.statements[0] else {
            panic!("expected var");
        };
        assert_eq!(var_a.kind, VarKind::Var);
        assert!(matches!(
            var_a.declarators[0].init,
            Some(Expr::Class(_))
        ));
        let Stmt::Var(var_c) = &program.statements[2] else {
            panic!("expected const");
        };
        assert_eq!(var_c.kind, VarKind::Const);
        let Some(Expr::Arrow(arrow)) = &var_c.declarators[0].init else {
            panic!("expected arrow initializer");
        };
        assert!(matches!(arrow.body, ArrowBody::Expr(_)));
    }

    #[test]
    fn parses_namespaced_assignment() {
        let program = parse_ok("Foo.Bar.Baz = class {};");
        let Stmt::Expr(stmt) = &program.statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Assign(assign) = &stmt.expr else {
            panic!("expected assignment");
        };
        assert_eq!(assign.target.dotted_name().as_deref(), Some("Foo.Bar.Baz"));
    }

    #[test]
    fn parses_custom_elements_define_call() {
        let program = parse_ok("customElements.define('x-foo', XFoo);");
        let Stmt::Expr(stmt) = &program.statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Call(call) = &stmt.expr else {
            panic!("expected call");
        };
        assert_eq!(
            call.callee.dotted_name().as_deref(),
            Some("customElements.define")
        );
        assert_eq!(call.args[0].as_string(), Some("x-foo"));
    }

    #[test]
    fn attaches_doc_comments_to_statements() {
        let program = parse_ok("/** @polymerBehavior */\nFoo.Behavior = {};\nvar x = 1;");
        let doc = program.statements[0].doc().expect("doc expected");
        assert!(doc.has_tag("polymerBehavior"));
        assert!(program.statements[1].doc().is_none());
    }

    #[test]
    fn object_literals_support_methods_getters_and_docs() {
        let program = parse_ok(
            "x = {\n  /** a prop */\n  alpha: 1,\n  beta() { return 2; },\n  get gamma() { return 3; },\n  shorthand,\n};",
        );
        let Stmt::Expr(stmt) = &program.statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Assign(assign) = &stmt.expr else {
            panic!("expected assignment");
        };
        let Expr::Object(object) = assign.value.as_ref() else {
            panic!("expected object literal");
        };
        assert_eq!(object.properties.len(), 4);
        assert_eq!(
            object.properties[0].doc.as_ref().unwrap().description,
            "a prop"
        );
        assert!(object.properties[1].is_method);
        assert!(object.properties[2].is_method);
        assert!(!object.properties[3].is_method);
    }

    #[test]
    fn template_and_regex_literals_are_opaque() {
        let program = parse_ok("const re = /ab[/]c/g;\nconst t = `x ${1 + 2} y`;\nhtml`<div></div>`;");
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn control_flow_statements_parse() {
        parse_ok(
            "for (let i = 0; i < 3; i++) { work(i); }\nwhile (ready()) { spin(); }\nswitch (x) { case 1: break; default: break; }\ntry { risky(); } catch (e) { handle(e); } finally { done(); }",
        );
    }

    #[test]
    fn inline_scripts_report_offset_positions() {
        let program = parse(
            "var x = 1;",
            SourcePosition::new(5, 8),
        )
        .unwrap();
        let span = program.statements[0].span();
        assert_eq!((span.start.line, span.start.column), (5, 8));
    }

    #[test]
    fn syntax_errors_fail_with_position() {
        let error = parse("class {", SourcePosition::default()).unwrap_err();
        assert!(error.message.contains("unterminated class body"));
    }
}
