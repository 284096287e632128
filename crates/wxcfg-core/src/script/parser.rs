//! Recursive-descent parser producing [`Node`] trees.
//!
//! Tolerant by construction: anything that is not structurally interesting
//! (labels, `break`, module declarations, unknown punctuation) is kept as an
//! opaque node rather than rejected. Only unbalanced brackets and premature
//! end of input are errors.

use super::lexer::{tokenize, Token, TokenKind};
use super::{Node, NodeKind, Span};
use crate::error::{Error, Result};

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

const UNARY_KEYWORDS: &[&str] = &["typeof", "void", "delete", "await"];

/// Deepest statement or expression nesting accepted before giving up
const MAX_NESTING: usize = 200;

pub(super) fn parse(src: &str) -> Result<Node> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        last_end: 0,
        depth: 0,
    };
    let mut body = Vec::new();
    while !parser.at_eof() {
        body.push(parser.statement()?);
    }
    Ok(Node::new(NodeKind::Program(body), Span::new(0, src.len())))
}

fn binary_precedence(op: &str) -> Option<u8> {
    Some(match op {
        "??" => 1,
        "||" => 2,
        "&&" => 3,
        "|" => 4,
        "^" => 5,
        "&" => 6,
        "==" | "!=" | "===" | "!==" => 7,
        "<" | ">" | "<=" | ">=" | "instanceof" | "in" => 8,
        "<<" | ">>" | ">>>" => 9,
        "+" | "-" => 10,
        "*" | "/" | "%" => 11,
        "**" => 12,
        _ => return None,
    })
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    last_end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    // ---- token access ----

    fn token(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn text_of(&self, token: &Token) -> &'a str {
        self.src.get(token.start..token.end).unwrap_or_default()
    }

    fn text(&self) -> &'a str {
        self.text_of(self.token(0))
    }

    fn at_eof(&self) -> bool {
        self.token(0).kind == TokenKind::Eof
    }

    fn is_punct(&self, punct: &str) -> bool {
        self.token(0).kind == TokenKind::Punct && self.text() == punct
    }

    fn is_punct_at(&self, offset: usize, punct: &str) -> bool {
        let token = self.token(offset);
        token.kind == TokenKind::Punct && self.text_of(token) == punct
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.token(0).kind == TokenKind::Ident && self.text() == keyword
    }

    fn is_ident_at(&self, offset: usize) -> bool {
        self.token(offset).kind == TokenKind::Ident
    }

    fn starts_let_declaration(&self) -> bool {
        self.is_ident_at(1) || self.is_punct_at(1, "[") || self.is_punct_at(1, "{")
    }

    fn starts_async_function(&self) -> bool {
        self.text_of(self.token(1)) == "function" && !self.token(1).newline_before
    }

    fn start(&self) -> usize {
        self.token(0).start
    }

    fn bump(&mut self) -> Token {
        let token = self.token(0).clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.last_end = token.end;
        }
        token
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{}'", punct)))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = self.token(0);
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", self.text_of(token))
        };
        Error::script_syntax(token.start, format!("{}, found {}", expected, found))
    }

    /// Run `f` one nesting level deeper, failing once [`MAX_NESTING`] is exceeded
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(Error::script_syntax(self.start(), "nesting too deep"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn node(&self, kind: NodeKind, start: usize) -> Node {
        Node::new(kind, Span::new(start, self.last_end))
    }

    /// Index of the token closing the bracket opened at `offset`
    fn matching_close(&self, offset: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = self.pos + offset;
        while let Some(token) = self.tokens.get(i) {
            if token.kind == TokenKind::Punct {
                match self.text_of(token) {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(i - self.pos);
                        }
                    }
                    _ => {}
                }
            } else if token.kind == TokenKind::Eof {
                return None;
            }
            i += 1;
        }
        None
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Node> {
        self.nested(Self::plain_statement)
    }

    fn plain_statement(&mut self) -> Result<Node> {
        let start = self.start();
        if self.is_punct("{") {
            return self.block();
        }
        if self.eat_punct(";") {
            return Ok(self.node(NodeKind::Empty, start));
        }
        if self.token(0).kind == TokenKind::Ident {
            if let Some(node) = self.keyword_statement()? {
                return Ok(node);
            }
            if self.is_punct_at(1, ":") {
                self.bump();
                self.bump();
                let body = self.statement()?;
                return Ok(self.node(NodeKind::Labeled(Box::new(body)), start));
            }
        }

        let expr = self.expression()?;
        self.eat_punct(";");
        Ok(self.node(NodeKind::ExpressionStatement(Box::new(expr)), start))
    }

    fn keyword_statement(&mut self) -> Result<Option<Node>> {
        let start = self.start();
        let node = match self.text() {
            "var" | "const" => self.variable_declaration(true)?,
            "let" if self.starts_let_declaration() => self.variable_declaration(true)?,
            "function" => self.function()?,
            "async" if self.starts_async_function() => self.function()?,
            "class" => self.class()?,
            "if" => {
                self.bump();
                let test = self.parenthesized()?;
                let consequent = self.statement()?;
                let alternate = if self.eat_keyword("else") {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                self.node(
                    NodeKind::If {
                        test: Box::new(test),
                        consequent: Box::new(consequent),
                        alternate,
                    },
                    start,
                )
            }
            "for" => {
                self.bump();
                self.eat_keyword("await");
                let head = self.for_head()?;
                let body = self.statement()?;
                self.node(
                    NodeKind::Loop {
                        head,
                        body: Box::new(body),
                    },
                    start,
                )
            }
            "while" => {
                self.bump();
                let test = self.parenthesized()?;
                let body = self.statement()?;
                self.node(
                    NodeKind::Loop {
                        head: vec![test],
                        body: Box::new(body),
                    },
                    start,
                )
            }
            "do" => {
                self.bump();
                let body = self.statement()?;
                if !self.eat_keyword("while") {
                    return Err(self.unexpected("expected 'while'"));
                }
                let test = self.parenthesized()?;
                self.eat_punct(";");
                self.node(
                    NodeKind::Loop {
                        head: vec![test],
                        body: Box::new(body),
                    },
                    start,
                )
            }
            "return" => {
                self.bump();
                let argument = if self.ends_statement() {
                    None
                } else {
                    Some(Box::new(self.expression()?))
                };
                self.eat_punct(";");
                self.node(NodeKind::Return(argument), start)
            }
            "throw" => {
                self.bump();
                let argument = self.expression()?;
                self.eat_punct(";");
                self.node(NodeKind::Throw(Box::new(argument)), start)
            }
            "try" => self.try_statement()?,
            "switch" => self.switch_statement()?,
            "break" | "continue" => {
                self.bump();
                if self.is_ident_at(0) && !self.token(0).newline_before {
                    self.bump();
                }
                self.eat_punct(";");
                self.node(NodeKind::Opaque, start)
            }
            "debugger" => {
                self.bump();
                self.eat_punct(";");
                self.node(NodeKind::Opaque, start)
            }
            "export" => {
                self.bump();
                self.eat_keyword("default");
                if self.is_punct("{") || self.is_punct("*") {
                    self.skip_module_clause();
                    self.node(NodeKind::Opaque, start)
                } else {
                    self.statement()?
                }
            }
            "import" if !self.is_punct_at(1, "(") && !self.is_punct_at(1, ".") => {
                self.skip_module_clause();
                self.node(NodeKind::Opaque, start)
            }
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    fn ends_statement(&self) -> bool {
        self.at_eof() || self.is_punct(";") || self.is_punct("}") || self.token(0).newline_before
    }

    /// Skips an import/export clause up to its module specifier or semicolon
    fn skip_module_clause(&mut self) {
        while !self.at_eof() && !self.is_punct(";") {
            let token = self.bump();
            if matches!(token.kind, TokenKind::Str(_)) {
                break;
            }
        }
        self.eat_punct(";");
    }

    fn block(&mut self) -> Result<Node> {
        let start = self.start();
        self.expect_punct("{")?;
        let body = self.statements_until_close()?;
        self.expect_punct("}")?;
        Ok(self.node(NodeKind::Block(body), start))
    }

    fn statements_until_close(&mut self) -> Result<Vec<Node>> {
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("expected '}'"));
            }
            body.push(self.statement()?);
        }
        Ok(body)
    }

    fn parenthesized(&mut self) -> Result<Node> {
        self.expect_punct("(")?;
        let expr = self.expression()?;
        self.expect_punct(")")?;
        Ok(expr)
    }

    fn variable_declaration(&mut self, consume_semicolon: bool) -> Result<Node> {
        let start = self.start();
        self.bump();
        let mut declarators = Vec::new();
        loop {
            let decl_start = self.start();
            let binding = self.binding()?;
            let init = if self.eat_punct("=") {
                Some(Box::new(self.assignment()?))
            } else {
                None
            };
            declarators.push(self.node(
                NodeKind::Declarator {
                    binding: Box::new(binding),
                    init,
                },
                decl_start,
            ));
            if !self.eat_punct(",") {
                break;
            }
        }
        if consume_semicolon {
            self.eat_punct(";");
        }
        Ok(self.node(NodeKind::VariableDeclaration(declarators), start))
    }

    fn binding(&mut self) -> Result<Node> {
        if self.is_punct("{") || self.is_punct("[") {
            return self.primary();
        }
        let start = self.start();
        if !self.is_ident_at(0) {
            return Err(self.unexpected("expected binding name"));
        }
        let name = self.bump();
        Ok(self.node(NodeKind::Identifier(self.text_of(&name).to_string()), start))
    }

    fn for_head(&mut self) -> Result<Vec<Node>> {
        self.expect_punct("(")?;
        let mut head = Vec::new();
        while !self.eat_punct(")") {
            if self.at_eof() {
                return Err(self.unexpected("expected ')'"));
            }
            if self.eat_punct(";") {
                continue;
            }
            let is_declaration = self.is_keyword("var")
                || self.is_keyword("const")
                || (self.is_keyword("let") && self.starts_let_declaration());
            if is_declaration {
                head.push(self.variable_declaration(false)?);
            } else if self.is_keyword("of") || self.is_keyword("in") {
                self.bump();
            } else {
                head.push(self.expression()?);
            }
        }
        Ok(head)
    }

    fn try_statement(&mut self) -> Result<Node> {
        let start = self.start();
        self.bump();
        let block = self.block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat_keyword("catch") {
            if self.eat_punct("(") {
                param = Some(Box::new(self.binding()?));
                self.expect_punct(")")?;
            }
            handler = Some(Box::new(self.block()?));
        }
        let finalizer = if self.eat_keyword("finally") {
            Some(Box::new(self.block()?))
        } else {
            None
        };
        Ok(self.node(
            NodeKind::Try {
                block: Box::new(block),
                param,
                handler,
                finalizer,
            },
            start,
        ))
    }

    fn switch_statement(&mut self) -> Result<Node> {
        let start = self.start();
        self.bump();
        let discriminant = self.parenthesized()?;
        self.expect_punct("{")?;
        let mut cases = Vec::new();
        while !self.eat_punct("}") {
            let case_start = self.start();
            let test = if self.eat_keyword("case") {
                Some(Box::new(self.expression()?))
            } else if self.eat_keyword("default") {
                None
            } else {
                return Err(self.unexpected("expected 'case' or 'default'"));
            };
            self.expect_punct(":")?;
            let mut body = Vec::new();
            while !self.is_keyword("case") && !self.is_keyword("default") && !self.is_punct("}") {
                if self.at_eof() {
                    return Err(self.unexpected("expected '}'"));
                }
                body.push(self.statement()?);
            }
            cases.push(self.node(NodeKind::Case { test, body }, case_start));
        }
        Ok(self.node(
            NodeKind::Switch {
                discriminant: Box::new(discriminant),
                cases,
            },
            start,
        ))
    }

    // ---- functions and classes ----

    fn function(&mut self) -> Result<Node> {
        let start = self.start();
        self.eat_keyword("async");
        if !self.eat_keyword("function") {
            return Err(self.unexpected("expected 'function'"));
        }
        self.eat_punct("*");
        let name = if self.is_ident_at(0) {
            let token = self.bump();
            Some(self.text_of(&token).to_string())
        } else {
            None
        };
        let params = self.params()?;
        let body = self.block()?;
        Ok(self.node(
            NodeKind::Function {
                name,
                params,
                body: Box::new(body),
            },
            start,
        ))
    }

    fn params(&mut self) -> Result<Vec<Node>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            if self.at_eof() {
                return Err(self.unexpected("expected ')'"));
            }
            params.push(self.spread_or_assignment()?);
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        Ok(params)
    }

    /// Arrow function starting at the current token, if there is one
    fn arrow(&mut self) -> Result<Option<Node>> {
        let start = self.start();
        let is_async = self.is_keyword("async")
            && !self.token(1).newline_before
            && (self.is_ident_at(1) || self.is_punct_at(1, "("));
        let head = usize::from(is_async);

        let params_end = if self.is_ident_at(head) && self.is_punct_at(head + 1, "=>") {
            head
        } else if self.is_punct_at(head, "(") {
            match self.matching_close(head) {
                Some(close) if self.is_punct_at(close + 1, "=>") => close,
                _ => return Ok(None),
            }
        } else {
            return Ok(None);
        };

        if is_async {
            self.bump();
        }
        let params = if params_end == head && self.is_ident_at(0) {
            vec![self.binding()?]
        } else {
            self.params()?
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            self.block()?
        } else {
            self.assignment()?
        };
        Ok(Some(self.node(
            NodeKind::Function {
                name: None,
                params,
                body: Box::new(body),
            },
            start,
        )))
    }

    fn class(&mut self) -> Result<Node> {
        let start = self.start();
        self.bump();
        let name = if self.is_ident_at(0) && !self.is_keyword("extends") {
            let token = self.bump();
            Some(self.text_of(&token).to_string())
        } else {
            None
        };
        let superclass = if self.eat_keyword("extends") {
            Some(Box::new(self.call_member(true)?))
        } else {
            None
        };

        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !self.eat_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("expected '}'"));
            }
            if self.eat_punct(";") {
                continue;
            }
            if self.is_keyword("static") && self.is_punct_at(1, "{") {
                self.bump();
                members.push(self.block()?);
                continue;
            }
            members.push(self.property(true)?);
        }
        Ok(self.node(
            NodeKind::Class {
                name,
                superclass,
                members,
            },
            start,
        ))
    }

    // ---- expressions ----

    fn expression(&mut self) -> Result<Node> {
        let start = self.start();
        let first = self.assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(",") {
            items.push(self.assignment()?);
        }
        Ok(self.node(NodeKind::Sequence(items), start))
    }

    fn spread_or_assignment(&mut self) -> Result<Node> {
        let start = self.start();
        if self.eat_punct("...") {
            let argument = self.assignment()?;
            return Ok(self.node(NodeKind::Spread(Box::new(argument)), start));
        }
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Node> {
        self.nested(Self::plain_assignment)
    }

    fn plain_assignment(&mut self) -> Result<Node> {
        if let Some(arrow) = self.arrow()? {
            return Ok(arrow);
        }

        let start = self.start();
        if self.is_keyword("yield") {
            self.bump();
            self.eat_punct("*");
            let argument = if self.ends_expression() {
                None
            } else {
                Some(Box::new(self.assignment()?))
            };
            return Ok(self.node(
                NodeKind::Unary {
                    operator: "yield".to_string(),
                    argument,
                },
                start,
            ));
        }

        let left = self.conditional()?;
        if self.token(0).kind == TokenKind::Punct && ASSIGNMENT_OPERATORS.contains(&self.text()) {
            let operator = self.text().to_string();
            self.bump();
            let right = self.assignment()?;
            return Ok(self.node(
                NodeKind::Assignment {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            ));
        }
        Ok(left)
    }

    fn ends_expression(&self) -> bool {
        self.ends_statement()
            || [")", "]", ",", ":"].iter().any(|p| self.is_punct(p))
    }

    fn conditional(&mut self) -> Result<Node> {
        let start = self.start();
        let test = self.binary(1)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect_punct(":")?;
        let alternate = self.assignment()?;
        Ok(self.node(
            NodeKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            start,
        ))
    }

    fn binary_operator(&self) -> Option<(&'a str, u8)> {
        let token = self.token(0);
        match token.kind {
            TokenKind::Punct | TokenKind::Ident => {
                let op = self.text_of(token);
                binary_precedence(op).map(|prec| (op, prec))
            }
            _ => None,
        }
    }

    fn binary(&mut self, min_prec: u8) -> Result<Node> {
        let start = self.start();
        let mut left = self.unary()?;
        while let Some((op, prec)) = self.binary_operator() {
            if prec < min_prec {
                break;
            }
            self.bump();
            // `**` is right-associative
            let next_min = if op == "**" { prec } else { prec + 1 };
            let right = self.nested(|p| p.binary(next_min))?;
            left = self.node(
                NodeKind::Binary {
                    operator: op.to_string(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Node> {
        let start = self.start();
        let token = self.token(0);
        let text = self.text();
        let is_prefix = match token.kind {
            TokenKind::Punct => matches!(text, "!" | "~" | "+" | "-"),
            TokenKind::Ident => UNARY_KEYWORDS.contains(&text),
            _ => false,
        };
        if is_prefix {
            self.bump();
            let argument = self.nested(Self::unary)?;
            return Ok(self.node(
                NodeKind::Unary {
                    operator: text.to_string(),
                    argument: Some(Box::new(argument)),
                },
                start,
            ));
        }
        if self.is_punct("++") || self.is_punct("--") {
            self.bump();
            let argument = self.nested(Self::unary)?;
            return Ok(self.node(
                NodeKind::Update {
                    operator: text.to_string(),
                    prefix: true,
                    argument: Box::new(argument),
                },
                start,
            ));
        }

        let expr = self.call_member(false)?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.token(0).newline_before {
            let operator = self.text().to_string();
            self.bump();
            return Ok(self.node(
                NodeKind::Update {
                    operator,
                    prefix: false,
                    argument: Box::new(expr),
                },
                start,
            ));
        }
        Ok(expr)
    }

    /// Member accesses and calls; `no_call` stops before the first call,
    /// as needed for `new` callees and `extends` clauses
    fn call_member(&mut self, no_call: bool) -> Result<Node> {
        let start = self.start();
        let mut expr = if self.is_keyword("new") {
            self.new_expression()?
        } else {
            self.primary()?
        };

        loop {
            if self.eat_punct(".") {
                let property = self.property_name()?;
                expr = self.member(expr, property, false, start);
            } else if self.is_punct("?.") {
                if no_call {
                    break;
                }
                self.bump();
                if self.is_punct("(") {
                    let arguments = self.arguments()?;
                    expr = self.call(expr, arguments, start);
                } else if self.eat_punct("[") {
                    let property = self.expression()?;
                    self.expect_punct("]")?;
                    expr = self.member(expr, property, true, start);
                } else {
                    let property = self.property_name()?;
                    expr = self.member(expr, property, false, start);
                }
            } else if self.eat_punct("[") {
                let property = self.expression()?;
                self.expect_punct("]")?;
                expr = self.member(expr, property, true, start);
            } else if self.is_punct("(") && !no_call {
                let arguments = self.arguments()?;
                expr = self.call(expr, arguments, start);
            } else if self.token(0).kind == TokenKind::Template {
                let template_start = self.start();
                self.bump();
                let template = self.node(NodeKind::Template, template_start);
                expr = self.call(expr, vec![template], start);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn new_expression(&mut self) -> Result<Node> {
        let start = self.start();
        self.bump();
        if self.eat_punct(".") {
            // new.target
            self.property_name()?;
            return Ok(self.node(NodeKind::Opaque, start));
        }
        let callee = self.call_member(true)?;
        let arguments = if self.is_punct("(") {
            self.arguments()?
        } else {
            Vec::new()
        };
        Ok(self.node(
            NodeKind::New {
                callee: Box::new(callee),
                arguments,
            },
            start,
        ))
    }

    fn member(&self, object: Node, property: Node, computed: bool, start: usize) -> Node {
        self.node(
            NodeKind::Member {
                object: Box::new(object),
                property: Box::new(property),
                computed,
            },
            start,
        )
    }

    fn call(&self, callee: Node, arguments: Vec<Node>, start: usize) -> Node {
        self.node(
            NodeKind::Call {
                callee: Box::new(callee),
                arguments,
            },
            start,
        )
    }

    fn property_name(&mut self) -> Result<Node> {
        let start = self.start();
        if !self.is_ident_at(0) {
            return Err(self.unexpected("expected property name"));
        }
        let token = self.bump();
        Ok(self.node(NodeKind::Identifier(self.text_of(&token).to_string()), start))
    }

    fn arguments(&mut self) -> Result<Vec<Node>> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        while !self.eat_punct(")") {
            if self.at_eof() {
                return Err(self.unexpected("expected ')'"));
            }
            arguments.push(self.spread_or_assignment()?);
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        Ok(arguments)
    }

    fn primary(&mut self) -> Result<Node> {
        let start = self.start();
        let token = self.token(0).clone();
        match &token.kind {
            TokenKind::Ident => match self.text() {
                "function" => self.function(),
                "async" if self.starts_async_function() => self.function(),
                "class" => self.class(),
                "true" | "false" | "null" => {
                    self.bump();
                    Ok(self.node(NodeKind::Literal, start))
                }
                name => {
                    self.bump();
                    Ok(self.node(NodeKind::Identifier(name.to_string()), start))
                }
            },
            TokenKind::Str(value) => {
                self.bump();
                Ok(self.node(NodeKind::StringLiteral(value.clone()), start))
            }
            TokenKind::Number | TokenKind::Regex => {
                self.bump();
                Ok(self.node(NodeKind::Literal, start))
            }
            TokenKind::Template => {
                self.bump();
                Ok(self.node(NodeKind::Template, start))
            }
            TokenKind::Punct => match self.text() {
                "(" => self.parenthesized(),
                "[" => self.array(),
                "{" => self.object(),
                ")" | "]" | "}" => Err(self.unexpected("expected expression")),
                _ => {
                    self.bump();
                    Ok(self.node(NodeKind::Opaque, start))
                }
            },
            TokenKind::Eof => Err(self.unexpected("expected expression")),
        }
    }

    fn array(&mut self) -> Result<Node> {
        let start = self.start();
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.eat_punct("]") {
            if self.at_eof() {
                return Err(self.unexpected("expected ']'"));
            }
            // Holes
            if self.eat_punct(",") {
                continue;
            }
            elements.push(self.spread_or_assignment()?);
            if !self.is_punct("]") {
                self.expect_punct(",")?;
            }
        }
        Ok(self.node(NodeKind::Array(elements), start))
    }

    fn object(&mut self) -> Result<Node> {
        let start = self.start();
        self.expect_punct("{")?;
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
            if self.at_eof() {
                return Err(self.unexpected("expected '}'"));
            }
            if self.is_punct("...") {
                entries.push(self.spread_or_assignment()?);
            } else {
                entries.push(self.property(false)?);
            }
            if !self.is_punct("}") {
                self.expect_punct(",")?;
            }
        }
        Ok(self.node(NodeKind::Object(entries), start))
    }

    /// Object literal property, or class member when `in_class`
    fn property(&mut self, in_class: bool) -> Result<Node> {
        let start = self.start();

        // Modifiers only count when something other than a key delimiter follows
        loop {
            let modifier = self.is_keyword("get")
                || self.is_keyword("set")
                || self.is_keyword("async")
                || (in_class && self.is_keyword("static"));
            let delimits = ["(", ",", ":", "}", "=", ";"]
                .iter()
                .any(|p| self.is_punct_at(1, p));
            if modifier && !delimits && !self.token(1).newline_before {
                self.bump();
            } else {
                break;
            }
        }
        self.eat_punct("*");

        let key_start = self.start();
        let (key, computed) = if self.eat_punct("[") {
            let key = self.assignment()?;
            self.expect_punct("]")?;
            (key, true)
        } else {
            let token = self.bump();
            let kind = match &token.kind {
                TokenKind::Ident => NodeKind::Identifier(self.text_of(&token).to_string()),
                TokenKind::Str(value) => NodeKind::StringLiteral(value.clone()),
                TokenKind::Number => NodeKind::Literal,
                _ => {
                    return Err(Error::script_syntax(
                        token.start,
                        format!("expected property key, found '{}'", self.text_of(&token)),
                    ))
                }
            };
            (self.node(kind, key_start), false)
        };

        let value = if self.is_punct("(") {
            let method_start = self.start();
            let params = self.params()?;
            let body = self.block()?;
            Some(self.node(
                NodeKind::Function {
                    name: None,
                    params,
                    body: Box::new(body),
                },
                method_start,
            ))
        } else if !in_class && self.eat_punct(":") {
            Some(self.assignment()?)
        } else if self.eat_punct("=") {
            // Class field initializer, or default inside a destructuring pattern
            Some(self.assignment()?)
        } else {
            None
        };
        if in_class {
            self.eat_punct(";");
        }

        Ok(self.node(
            NodeKind::Property {
                key: Box::new(key),
                value: value.map(Box::new),
                computed,
            },
            start,
        ))
    }
}
