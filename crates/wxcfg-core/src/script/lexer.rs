//! JavaScript tokenizer.
//!
//! Only as precise as needed to split a compiled runtime script into tokens
//! with byte spans: comments are dropped, template literals and regular
//! expressions come out as single opaque tokens, and keywords are ordinary
//! identifiers left for the parser to interpret.
//!
//! Whether a `/` opens a regular expression depends on what precedes it, so
//! the lexer follows bracket nesting and remembers whether each `(` and `{`
//! belongs to a statement or to an expression.

use crate::error::{Error, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1, take_while_m_n},
    character::complete::{anychar, char, one_of, satisfy},
    combinator::{map, map_res, not, opt, recognize, value, verify},
    multi::{fold_many0, many0_count, many1_count},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// Kind of a lexical token
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Identifier or keyword
    Ident,
    /// String literal with its cooked value
    Str(String),
    /// Numeric literal
    Number,
    /// Template literal, substitutions included
    Template,
    /// Regular expression literal
    Regex,
    /// Operator or punctuation
    Punct,
    /// End of input
    Eof,
}

/// A token and where it sits in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// A line terminator precedes this token
    pub(crate) newline_before: bool,
}

/// Punctuators, longest first so the first match is the longest
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

/// Keywords after which a `/` starts a regular expression
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Keywords whose parenthesized head is followed by a statement
const HEAD_KEYWORDS: &[&str] = &["if", "while", "for", "with", "catch", "switch"];

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>> {
    Lexer::new(src).run()
}

// ---- token grammars ----

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_inline_space(c: char) -> bool {
    !is_line_terminator(c) && (c.is_whitespace() || c == '\u{feff}')
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    c == '$' || c == '_' || c == '\u{200c}' || c == '\u{200d}' || c.is_alphanumeric()
}

fn hashbang(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("#!"), take_while(|c: char| !is_line_terminator(c))))(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), take_while(|c: char| !is_line_terminator(c))))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn trivia(input: &str) -> IResult<&str, &str> {
    alt((
        take_while1(is_line_terminator),
        take_while1(is_inline_space),
        line_comment,
        block_comment,
    ))(input)
}

#[derive(Debug, Clone)]
enum Fragment<'a> {
    Literal(&'a str),
    Escaped(char),
    LineContinuation,
}

fn code_point(code: u32) -> char {
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn hex_code<'a>(min: usize, max: usize) -> impl FnMut(&'a str) -> IResult<&'a str, u32> {
    move |input: &'a str| {
        map_res(
            take_while_m_n(min, max, |c: char| c.is_ascii_hexdigit()),
            |digits: &str| u32::from_str_radix(digits, 16),
        )(input)
    }
}

fn unicode_code(input: &str) -> IResult<&str, u32> {
    let braced = delimited(char('{'), hex_code(1, 6), char('}'));
    let (rest, code) = alt((braced, hex_code(4, 4)))(input)?;
    if !(0xD800..0xDC00).contains(&code) {
        return Ok((rest, code));
    }
    // Surrogate pairs arrive as two escapes
    let low_surrogate = verify(hex_code(4, 4), |low: &u32| (0xDC00..0xE000).contains(low));
    match preceded(tag("\\u"), low_surrogate)(rest) {
        Ok((rest, low)) => Ok((rest, 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00))),
        Err(_) => Ok((rest, code)),
    }
}

fn escape(input: &str) -> IResult<&str, Fragment<'_>> {
    alt((
        value(
            Fragment::LineContinuation,
            alt((tag("\r\n"), tag("\n"), tag("\r"), tag("\u{2028}"), tag("\u{2029}"))),
        ),
        map(
            alt((
                value('\n', char('n')),
                value('\t', char('t')),
                value('\r', char('r')),
                value('\u{8}', char('b')),
                value('\u{c}', char('f')),
                value('\u{b}', char('v')),
                value('\0', terminated(char('0'), not(satisfy(|c: char| c.is_ascii_digit())))),
                map(preceded(char('x'), hex_code(2, 2)), code_point),
                map(preceded(char('u'), unicode_code), code_point),
                anychar,
            )),
            Fragment::Escaped,
        ),
    ))(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    move |input: &'a str| {
        let literal = take_while1(move |c: char| c != quote && c != '\\' && c != '\n' && c != '\r');
        let fragment = alt((map(literal, Fragment::Literal), preceded(char('\\'), escape)));
        let cooked = fold_many0(fragment, String::new, |mut acc: String, fragment| {
            match fragment {
                Fragment::Literal(text) => acc.push_str(text),
                Fragment::Escaped(c) => acc.push(c),
                Fragment::LineContinuation => {}
            }
            acc
        });
        delimited(char(quote), cooked, char(quote))(input)
    }
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((quoted('"'), quoted('\'')))(input)
}

fn template(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('`'),
        many0_count(alt((
            recognize(pair(char('\\'), anychar)),
            substitution,
            take_while1(|c: char| c != '`' && c != '\\' && c != '$'),
            tag("$"),
        ))),
        char('`'),
    ))(input)
}

fn substitution(input: &str) -> IResult<&str, &str> {
    recognize(delimited(tag("${"), many0_count(embedded_code), char('}')))(input)
}

/// A piece of code inside a template substitution, braces balanced
fn embedded_code(input: &str) -> IResult<&str, &str> {
    alt((
        template,
        recognize(string_literal),
        line_comment,
        block_comment,
        recognize(delimited(char('{'), many0_count(embedded_code), char('}'))),
        take_while1(|c: char| !matches!(c, '`' | '\'' | '"' | '{' | '}' | '/')),
        tag("/"),
    ))(input)
}

fn digits(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_digit() || c == '_')(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    let radix = recognize(tuple((
        char('0'),
        one_of("xXoObB"),
        take_while1(|c: char| c.is_ascii_hexdigit() || c == '_'),
    )));
    let mantissa = alt((
        recognize(pair(digits, opt(pair(char('.'), opt(digits))))),
        recognize(pair(char('.'), digits)),
    ));
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digits));
    let decimal = recognize(pair(mantissa, opt(exponent)));
    recognize(pair(alt((radix, decimal)), opt(char('n'))))(input)
}

fn identifier_escape(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        tag("\\u"),
        alt((delimited(char('{'), hex_code(1, 6), char('}')), hex_code(4, 4))),
    ))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((recognize(satisfy(is_ident_start)), identifier_escape)),
        many0_count(alt((recognize(satisfy(is_ident_part)), identifier_escape))),
    ))(input)
}

fn private_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('#'), identifier))(input)
}

fn regex_escape(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('\\'), satisfy(|c| !is_line_terminator(c))))(input)
}

fn regex_class(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('['),
        many0_count(alt((
            regex_escape,
            take_while1(|c: char| c != ']' && c != '\\' && !is_line_terminator(c)),
        ))),
        char(']'),
    ))(input)
}

fn regex(input: &str) -> IResult<&str, &str> {
    let body = many1_count(alt((
        regex_escape,
        regex_class,
        take_while1(|c: char| !matches!(c, '/' | '\\' | '[') && !is_line_terminator(c)),
    )));
    recognize(tuple((char('/'), body, char('/'), take_while(is_ident_part))))(input)
}

fn punctuator(input: &str) -> IResult<&str, &str> {
    let len = match PUNCTUATORS.iter().find(|p| input.starts_with(**p)) {
        // `a?.5:b` is a conditional, not optional chaining
        Some(&"?.") if input.as_bytes().get(2).is_some_and(u8::is_ascii_digit) => 1,
        Some(p) => p.len(),
        None => input.chars().next().map_or(0, char::len_utf8),
    };
    if len == 0 {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Eof,
        )));
    }
    Ok((&input[len..], &input[..len]))
}

// ---- bracket context ----

/// What a `(` opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paren {
    /// Head of `if`, `while`, `for`, `with`, `catch` or `switch`
    Head,
    /// Parameter list of a function
    Params { declaration: bool },
    Expr,
}

/// What a `{` opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    /// Block statement or declaration body; closing it ends a statement
    Block,
    /// Body of a function or class expression; holds statements but closes
    /// an expression
    Body,
    /// Object literal
    Expr,
}

#[derive(Debug, Default)]
struct Context {
    parens: Vec<Paren>,
    braces: Vec<Brace>,
    closed_paren: Option<Paren>,
    closed_brace: Option<Brace>,
    pending_function: Option<bool>,
    pending_class: Option<bool>,
}

/// The previous token, as far as context decisions care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev<'a> {
    Start,
    Punct(&'a str),
    Ident(&'a str),
    Literal,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    newline_before: bool,
    context: Context,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            tokens: Vec::new(),
            newline_before: false,
            context: Context::default(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        if let Ok((rest, _)) = hashbang(self.src) {
            self.pos = self.src.len() - rest.len();
        }

        loop {
            self.skip_trivia()?;
            let rest = self.rest();
            let Some(first) = rest.chars().next() else {
                self.push(TokenKind::Eof, 0);
                return Ok(self.tokens);
            };
            let second = rest[first.len_utf8()..].chars().next();

            let (kind, len) = match first {
                '"' | '\'' => {
                    let (cooked, len) = self.lex(string_literal, "unterminated string literal")?;
                    (TokenKind::Str(cooked), len)
                }
                '`' => {
                    let (_, len) = self.lex(template, "unterminated template literal")?;
                    (TokenKind::Template, len)
                }
                '0'..='9' => (TokenKind::Number, self.lex(number, "malformed number")?.1),
                '.' if second.is_some_and(|c| c.is_ascii_digit()) => {
                    (TokenKind::Number, self.lex(number, "malformed number")?.1)
                }
                '/' if self.regex_allowed() => {
                    let (_, len) = self.lex(regex, "unterminated regular expression")?;
                    (TokenKind::Regex, len)
                }
                // Private class member names lex as identifiers
                '#' if private_name(rest).is_ok() => {
                    (TokenKind::Ident, self.lex(private_name, "invalid private name")?.1)
                }
                c if is_ident_start(c) || rest.starts_with("\\u") => {
                    (TokenKind::Ident, self.lex(identifier, "invalid identifier")?.1)
                }
                _ => (TokenKind::Punct, self.lex(punctuator, "unexpected character")?.1),
            };
            self.push(kind, len);
        }
    }

    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or_default()
    }

    /// Runs `parser` at the current position, returning its output and length
    fn lex<O>(
        &self,
        mut parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
        failure: &str,
    ) -> Result<(O, usize)> {
        let rest = self.rest();
        match parser(rest) {
            Ok((after, output)) => Ok((output, rest.len() - after.len())),
            Err(_) => Err(Error::script_syntax(self.pos, failure)),
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let rest = self.rest();
            match trivia(rest) {
                Ok((after, text)) => {
                    if text.contains(is_line_terminator) {
                        self.newline_before = true;
                    }
                    self.pos += rest.len() - after.len();
                }
                Err(_) if rest.starts_with("/*") => {
                    return Err(Error::script_syntax(self.pos, "unterminated block comment"));
                }
                Err(_) => return Ok(()),
            }
        }
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let start = self.pos;
        let end = start + len;
        let text = self.src.get(start..end).unwrap_or_default();
        self.track(&kind, text);
        self.tokens.push(Token {
            kind,
            start,
            end,
            newline_before: self.newline_before,
        });
        self.pos = end;
        self.newline_before = false;
    }

    fn prev(&self) -> Prev<'a> {
        let Some(token) = self.tokens.last() else {
            return Prev::Start;
        };
        let text = self.src.get(token.start..token.end).unwrap_or_default();
        match token.kind {
            TokenKind::Punct => Prev::Punct(text),
            TokenKind::Ident => Prev::Ident(text),
            _ => Prev::Literal,
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.prev() {
            Prev::Start => true,
            Prev::Punct(")") => self.context.closed_paren == Some(Paren::Head),
            Prev::Punct("}") => self.context.closed_brace == Some(Brace::Block),
            Prev::Punct("]" | "++" | "--") => false,
            Prev::Punct(_) => true,
            Prev::Ident(word) => REGEX_PRECEDING_KEYWORDS.contains(&word),
            Prev::Literal => false,
        }
    }

    /// A statement may begin right after `prev`
    fn at_statement_start(&self, prev: Prev<'_>) -> bool {
        match prev {
            Prev::Start | Prev::Punct(";") => true,
            Prev::Punct("{") => {
                matches!(self.context.braces.last(), Some(Brace::Block | Brace::Body))
            }
            Prev::Punct("}") => self.context.closed_brace == Some(Brace::Block),
            Prev::Punct(")") => self.context.closed_paren == Some(Paren::Head),
            Prev::Ident(word) => matches!(word, "else" | "do"),
            _ => false,
        }
    }

    /// A `function` or `class` keyword after `prev` starts a declaration
    fn declaration_position(&self, prev: Prev<'_>) -> bool {
        match prev {
            Prev::Ident("export" | "default" | "async") => true,
            // Automatic semicolon insertion ends the previous statement
            Prev::Literal | Prev::Ident(_) | Prev::Punct(")" | "]" | "}")
                if self.newline_before =>
            {
                true
            }
            _ => self.at_statement_start(prev),
        }
    }

    fn brace_kind(&mut self, prev: Prev<'_>) -> Brace {
        if let Some(declaration) = self.context.pending_class.take() {
            return if declaration { Brace::Block } else { Brace::Body };
        }
        match prev {
            Prev::Punct(")") => match self.context.closed_paren {
                Some(Paren::Head | Paren::Params { declaration: true }) => Brace::Block,
                _ => Brace::Body,
            },
            Prev::Punct("=>") => Brace::Body,
            Prev::Ident("try" | "finally" | "else" | "do") => Brace::Block,
            _ if self.at_statement_start(prev) => Brace::Block,
            _ => Brace::Expr,
        }
    }

    /// Updates the bracket context with the token about to be pushed
    fn track(&mut self, kind: &TokenKind, text: &str) {
        let prev = self.prev();
        match (kind, text) {
            (TokenKind::Punct, "(") => {
                let paren = match self.context.pending_function.take() {
                    Some(declaration) => Paren::Params { declaration },
                    None if matches!(prev, Prev::Ident(word) if HEAD_KEYWORDS.contains(&word)) => {
                        Paren::Head
                    }
                    None => Paren::Expr,
                };
                self.context.parens.push(paren);
            }
            (TokenKind::Punct, ")") => {
                self.context.closed_paren = Some(self.context.parens.pop().unwrap_or(Paren::Expr));
            }
            (TokenKind::Punct, "{") => {
                let brace = self.brace_kind(prev);
                self.context.braces.push(brace);
            }
            (TokenKind::Punct, "}") => {
                self.context.closed_brace = Some(self.context.braces.pop().unwrap_or(Brace::Block));
            }
            (TokenKind::Ident, "function") => {
                self.context.pending_function = Some(self.declaration_position(prev));
            }
            (TokenKind::Ident, "class") => {
                self.context.pending_class = Some(self.declaration_position(prev));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src)
            .unwrap()
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| src[t.start..t.end].to_string())
            .collect()
    }

    fn kind_of(src: &str, text: &str) -> TokenKind {
        tokenize(src)
            .unwrap()
            .into_iter()
            .find(|t| src[t.start..t.end].starts_with(text))
            .map(|t| t.kind)
            .unwrap()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            texts("__wxAppCode__['a.json'] = {\"x\": 1};"),
            vec!["__wxAppCode__", "[", "'a.json'", "]", "=", "{", "\"x\"", ":", "1", "}", ";"]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(texts("#!/usr/bin/env node\na /* b */ c // d\ne"), vec!["a", "c", "e"]);
    }

    #[test]
    fn test_newline_flag() {
        let tokens = tokenize("a\nb /*\n*/ c").unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(tokens[2].newline_before);
    }

    #[test]
    fn test_string_cooking() {
        let tokens = tokenize(r#"'a\'b' "A\x42\n" '\u{1F600}' "😀" "\uD83D\uDE00""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str("a'b".into()));
        assert_eq!(tokens[1].kind, TokenKind::Str("AB\n".into()));
        assert_eq!(tokens[2].kind, TokenKind::Str("\u{1F600}".into()));
        assert_eq!(tokens[3].kind, TokenKind::Str("\u{1F600}".into()));
        assert_eq!(tokens[4].kind, TokenKind::Str("\u{1F600}".into()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            texts("0x1F 1_000 .5 1e-3 10n 1..toString"),
            vec!["0x1F", "1_000", ".5", "1e-3", "10n", "1.", ".", "toString"]
        );
    }

    #[test]
    fn test_regex_versus_division() {
        let tokens = tokenize("x = a / b; y = /a}b/g.test(s)").unwrap();
        assert_eq!(tokens[3].kind, TokenKind::Punct);
        assert_eq!(tokens[8].kind, TokenKind::Regex);
    }

    #[test]
    fn test_regex_after_statement_heads_and_blocks() {
        assert_eq!(kind_of(r#"if (x) /"/.test(y);"#, "/\""), TokenKind::Regex);
        assert_eq!(kind_of("while (a) /'/g.exec(s)", "/'"), TokenKind::Regex);
        assert_eq!(kind_of("function f() {}\n/'/.test(y)", "/'"), TokenKind::Regex);
        assert_eq!(kind_of("if (a) { b() } /'/g.exec(s)", "/'"), TokenKind::Regex);
        assert_eq!(kind_of("try {} finally {} /x/", "/x"), TokenKind::Regex);
        assert_eq!(kind_of("class A {}\n/x/.test(s)", "/x"), TokenKind::Regex);
    }

    #[test]
    fn test_division_after_expressions() {
        assert_eq!(kind_of("x = f(a) / 2", "/"), TokenKind::Punct);
        assert_eq!(kind_of("x = {a: 1} / 2", "/"), TokenKind::Punct);
        assert_eq!(kind_of("x = function () {} / 2", "/"), TokenKind::Punct);
        assert_eq!(kind_of("x = a[0] / 2", "/"), TokenKind::Punct);
        assert_eq!(kind_of("x = (() => {}) / 2", "/"), TokenKind::Punct);
    }

    #[test]
    fn test_template_is_one_token() {
        assert_eq!(
            texts("f(`a ${ {b: `c${d}`}.b } e`)"),
            vec!["f", "(", "`a ${ {b: `c${d}`}.b } e`", ")"]
        );
    }

    #[test]
    fn test_longest_punctuator() {
        assert_eq!(texts("a >>>= b ?? c?.d"), vec!["a", ">>>=", "b", "??", "c", "?.", "d"]);
        assert_eq!(texts("a?.5:b"), vec!["a", "?", ".5", ":", "b"]);
    }

    #[test]
    fn test_private_and_escaped_identifiers() {
        assert_eq!(texts("this.#n = \\u0061b"), vec!["this", ".", "#n", "=", "\\u0061b"]);
    }

    #[test]
    fn test_unterminated_literals() {
        assert!(tokenize("'abc").is_err());
        assert!(tokenize("`abc").is_err());
        assert!(tokenize("/* abc").is_err());
        assert!(tokenize("x = /abc").is_err());
    }
}
