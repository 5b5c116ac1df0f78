//! Token tree for JavaScript/TypeScript sources with embedded markup
//!
//! The tree is just deep enough for tagging: bracket groups nest, markup
//! elements are parsed in full, everything else stays a flat run of
//! tokens. Whether `/` starts a regular expression and `<` starts an element
//! is decided from the previous token in the same group.

/// Byte range in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Paren,
    Bracket,
    Brace,
}

impl Delimiter {
    fn close(self) -> char {
        match self {
            Delimiter::Paren => ')',
            Delimiter::Bracket => ']',
            Delimiter::Brace => '}',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident(String),
    Punct(&'static str),
    /// String literal with its raw contents between the quotes
    Str(String),
    Num,
    /// Template literal; each substitution is its own token run
    Template(Vec<Vec<Token>>),
    Regex,
    Group(Delimiter, Vec<Token>),
    Element(Box<JsxElement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_punct(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == text)
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.ident() == Some(text)
    }

    pub fn group(&self, delimiter: Delimiter) -> Option<&[Token]> {
        match &self.kind {
            TokenKind::Group(d, tokens) if *d == delimiter => Some(tokens.as_slice()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsxNameKind {
    /// `div`, `my-widget`, `Card`
    Identifier,
    /// `Motion.div`
    Member,
    /// `svg:rect`
    Namespaced,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxName {
    pub text: String,
    pub kind: JsxNameKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttrValue {
    Str(String),
    Expr(Vec<Token>),
    Element(Box<JsxElement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttribute {
    Named {
        name: String,
        value: Option<JsxAttrValue>,
        span: Span,
    },
    Spread {
        tokens: Vec<Token>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxChild {
    Text(Span),
    Expr(Vec<Token>),
    Element(JsxElement),
}

/// A markup element or fragment
#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
    /// From `<` to the end of the closing tag
    pub span: Span,
    /// `None` for `<>…</>`
    pub name: Option<JsxName>,
    pub attributes: Vec<JsxAttribute>,
    pub children: Vec<JsxChild>,
    pub self_closing: bool,
}

impl JsxElement {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| matches!(a, JsxAttribute::Named { name: n, .. } if n == name))
    }
}

/// A parse failure at a byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

type ParseResult<T> = std::result::Result<T, SyntaxError>;

/// Longest first so that greedy matching works
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "+", "-", "*", "/", "%", "<", ">", "=", "!", "&", "|", "^",
    "~", "?", ":", ";", ",", ".", "@",
];

/// Keywords after which an operand, not an operator, follows
const OPERAND_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await", "default",
];

/// Parse a whole source file into a token run
pub fn parse(source: &str, jsx: bool) -> ParseResult<Vec<Token>> {
    let mut parser = Parser {
        src: source,
        pos: 0,
        jsx,
    };
    parser.parse_run(None)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    jsx: bool,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\u{200c}' || c == '\u{200d}'
}

fn is_jsx_name_char(c: char) -> bool {
    is_ident_char(c) || c == '-'
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, skip: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(skip)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn starts_with(&self, text: &str) -> bool {
        self.src[self.pos..].starts_with(text)
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> ParseResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.pos;
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => return Err(SyntaxError::new(start, "Unterminated comment")),
                    }
                }
                // Hashbang
                Some('#') if self.pos == 0 && self.peek_at(1) == Some('!') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Tokens up to `close` (consumed), or to the end of input
    fn parse_run(&mut self, close: Option<(char, usize)>) -> ParseResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let Some(c) = self.peek() else {
                return match close {
                    Some((close, open_at)) => Err(SyntaxError::new(
                        open_at,
                        format!("Unterminated group, expected `{}`", close),
                    )),
                    None => Ok(tokens),
                };
            };
            if close.map(|(c, _)| c) == Some(c) {
                self.bump();
                return Ok(tokens);
            }
            let kind = match c {
                ')' | ']' | '}' => {
                    return Err(SyntaxError::new(start, format!("Unexpected token `{}`", c)));
                }
                '(' => self.parse_group(Delimiter::Paren)?,
                '[' => self.parse_group(Delimiter::Bracket)?,
                '{' => self.parse_group(Delimiter::Brace)?,
                '"' | '\'' => self.parse_string(c)?,
                '`' => self.parse_template()?,
                '0'..='9' => self.parse_number(),
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.parse_number(),
                '#' if self.peek_at(1).is_some_and(is_ident_start) => {
                    self.bump();
                    self.parse_ident()
                }
                c if is_ident_start(c) || c == '\\' => self.parse_ident(),
                '/' if operand_expected(&tokens) => self.parse_regex()?,
                '<' if self.jsx && operand_expected(&tokens) && self.looks_like_element() => {
                    TokenKind::Element(Box::new(self.parse_element()?))
                }
                _ => self.parse_punct()?,
            };
            tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
            });
        }
    }

    fn parse_group(&mut self, delimiter: Delimiter) -> ParseResult<TokenKind> {
        let open_at = self.pos;
        self.bump();
        let tokens = self.parse_run(Some((delimiter.close(), open_at)))?;
        Ok(TokenKind::Group(delimiter, tokens))
    }

    fn parse_string(&mut self, quote: char) -> ParseResult<TokenKind> {
        let start = self.pos;
        self.bump();
        let content_start = self.pos;
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => {
                    let value = self.src[content_start..self.pos - 1].to_string();
                    return Ok(TokenKind::Str(value));
                }
                Some('\n') | None => {
                    return Err(SyntaxError::new(start, "Unterminated string constant"));
                }
                Some(_) => {}
            }
        }
    }

    fn parse_template(&mut self) -> ParseResult<TokenKind> {
        let start = self.pos;
        self.bump();
        let mut substitutions = Vec::new();
        loop {
            match self.peek() {
                None => return Err(SyntaxError::new(start, "Unterminated template")),
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('`') => {
                    self.bump();
                    return Ok(TokenKind::Template(substitutions));
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    let open_at = self.pos;
                    self.pos += 2;
                    substitutions.push(self.parse_run(Some(('}', open_at)))?);
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn parse_number(&mut self) -> TokenKind {
        let hex = self.starts_with("0x") || self.starts_with("0X");
        while let Some(c) = self.peek() {
            if is_ident_char(c) || c == '.' {
                self.bump();
                if !hex && (c == 'e' || c == 'E') && matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
            } else {
                break;
            }
        }
        TokenKind::Num
    }

    fn parse_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\\' {
                // Unicode escape inside an identifier
                self.bump();
                self.bump();
            } else if is_ident_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Ident(self.src[start..self.pos].to_string())
    }

    fn parse_regex(&mut self) -> ParseResult<TokenKind> {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some('\n') | None => {
                    return Err(SyntaxError::new(start, "Unterminated regular expression"));
                }
                Some(_) => {}
            }
        }
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        Ok(TokenKind::Regex)
    }

    fn parse_punct(&mut self) -> ParseResult<TokenKind> {
        let rest = &self.src[self.pos..];
        match PUNCTUATORS.iter().copied().find(|p| rest.starts_with(*p)) {
            Some(p) => {
                self.pos += p.len();
                Ok(TokenKind::Punct(p))
            }
            None => {
                let c = self.peek().unwrap_or_default();
                Err(SyntaxError::new(self.pos, format!("Unexpected character `{}`", c)))
            }
        }
    }

    /// At `<`: an element follows unless this is a generic parameter list
    /// such as `<T,>` or `<T extends U>`
    fn looks_like_element(&self) -> bool {
        let rest = &self.src[self.pos + 1..];
        let after = rest.trim_start();
        match after.chars().next() {
            Some('>') => true,
            Some(c) if is_ident_start(c) => {
                let name_len = after
                    .char_indices()
                    .find(|(_, c)| !is_jsx_name_char(*c) && *c != '.' && *c != ':')
                    .map(|(i, _)| i)
                    .unwrap_or(after.len());
                let tail = after[name_len..].trim_start();
                !(tail.starts_with(',')
                    || (tail.starts_with("extends")
                        && tail[7..].starts_with(|c: char| c.is_whitespace())))
            }
            _ => false,
        }
    }

    // --- markup ---

    fn parse_element(&mut self) -> ParseResult<JsxElement> {
        let start = self.pos;
        self.bump();
        self.skip_trivia()?;

        if self.eat('>') {
            let children = self.parse_children(start, None)?;
            return Ok(JsxElement {
                span: Span::new(start, self.pos),
                name: None,
                attributes: Vec::new(),
                children,
                self_closing: false,
            });
        }

        let name = self.parse_jsx_name()?;
        self.skip_type_arguments()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_trivia()?;
            let attr_start = self.pos;
            match self.peek() {
                None => return Err(SyntaxError::new(start, "Unterminated JSX contents")),
                Some('/') => {
                    self.bump();
                    self.skip_trivia()?;
                    if !self.eat('>') {
                        return Err(SyntaxError::new(self.pos, "Expected `>` after `/`"));
                    }
                    return Ok(JsxElement {
                        span: Span::new(start, self.pos),
                        name: Some(name),
                        attributes,
                        children: Vec::new(),
                        self_closing: true,
                    });
                }
                Some('>') => {
                    self.bump();
                    let children = self.parse_children(start, Some(&name))?;
                    return Ok(JsxElement {
                        span: Span::new(start, self.pos),
                        name: Some(name),
                        attributes,
                        children,
                        self_closing: false,
                    });
                }
                Some('{') => {
                    self.bump();
                    self.skip_trivia()?;
                    if !self.starts_with("...") {
                        return Err(SyntaxError::new(self.pos, "Expected `...` in spread attribute"));
                    }
                    self.pos += 3;
                    let tokens = self.parse_run(Some(('}', attr_start)))?;
                    attributes.push(JsxAttribute::Spread {
                        tokens,
                        span: Span::new(attr_start, self.pos),
                    });
                }
                Some(c) if is_ident_start(c) => {
                    let name = self.take_while(|c| is_jsx_name_char(c) || c == ':');
                    self.skip_trivia()?;
                    let value = if self.eat('=') {
                        self.skip_trivia()?;
                        Some(self.parse_attribute_value()?)
                    } else {
                        None
                    };
                    attributes.push(JsxAttribute::Named {
                        name,
                        value,
                        span: Span::new(attr_start, self.pos),
                    });
                }
                Some(c) => {
                    return Err(SyntaxError::new(
                        self.pos,
                        format!("Unexpected character `{}` in JSX tag", c),
                    ));
                }
            }
        }
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&accept) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn parse_jsx_name(&mut self) -> ParseResult<JsxName> {
        let start = self.pos;
        if !self.peek().is_some_and(is_ident_start) {
            return Err(SyntaxError::new(start, "Expected a JSX element name"));
        }
        let mut kind = JsxNameKind::Identifier;
        self.take_while(is_jsx_name_char);
        loop {
            match self.peek() {
                Some('.') if self.peek_at(1).is_some_and(is_ident_start) => {
                    kind = JsxNameKind::Member;
                    self.bump();
                    self.take_while(is_jsx_name_char);
                }
                Some(':') if self.peek_at(1).is_some_and(is_ident_start) => {
                    kind = JsxNameKind::Namespaced;
                    self.bump();
                    self.take_while(is_jsx_name_char);
                }
                _ => break,
            }
        }
        Ok(JsxName {
            text: self.src[start..self.pos].to_string(),
            kind,
            span: Span::new(start, self.pos),
        })
    }

    /// `<Select<Option> …>`: skip the balanced type argument list
    fn skip_type_arguments(&mut self) -> ParseResult<()> {
        let checkpoint = self.pos;
        self.skip_trivia()?;
        if self.peek() != Some('<') {
            self.pos = checkpoint;
            return Ok(());
        }
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(SyntaxError::new(start, "Unterminated type arguments"))
    }

    fn parse_attribute_value(&mut self) -> ParseResult<JsxAttrValue> {
        let start = self.pos;
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                match self.src[self.pos..].find(quote) {
                    Some(len) => {
                        let value = self.src[self.pos..self.pos + len].to_string();
                        self.pos += len + 1;
                        Ok(JsxAttrValue::Str(value))
                    }
                    None => Err(SyntaxError::new(start, "Unterminated string constant")),
                }
            }
            Some('{') => {
                self.bump();
                Ok(JsxAttrValue::Expr(self.parse_run(Some(('}', start)))?))
            }
            Some('<') => Ok(JsxAttrValue::Element(Box::new(self.parse_element()?))),
            _ => Err(SyntaxError::new(
                start,
                "JSX value should be either an expression or a quoted JSX text",
            )),
        }
    }

    /// Children up to and including the matching closing tag
    fn parse_children(
        &mut self,
        element_start: usize,
        name: Option<&JsxName>,
    ) -> ParseResult<Vec<JsxChild>> {
        let mut children = Vec::new();
        loop {
            let start = self.pos;
            match self.peek() {
                None => return Err(SyntaxError::new(element_start, "Unterminated JSX contents")),
                Some('<') => {
                    let after = self.src[self.pos + 1..].trim_start();
                    if after.starts_with('/') {
                        self.close_element(name)?;
                        return Ok(children);
                    }
                    children.push(JsxChild::Element(self.parse_element()?));
                }
                Some('{') => {
                    self.bump();
                    children.push(JsxChild::Expr(self.parse_run(Some(('}', start)))?));
                }
                Some(_) => {
                    while !matches!(self.peek(), None | Some('<') | Some('{')) {
                        self.bump();
                    }
                    children.push(JsxChild::Text(Span::new(start, self.pos)));
                }
            }
        }
    }

    fn close_element(&mut self, name: Option<&JsxName>) -> ParseResult<()> {
        let start = self.pos;
        self.bump();
        self.skip_trivia()?;
        self.bump();
        self.skip_trivia()?;
        let closing = if self.peek().is_some_and(is_ident_start) {
            Some(self.parse_jsx_name()?.text)
        } else {
            None
        };
        self.skip_trivia()?;
        if !self.eat('>') {
            return Err(SyntaxError::new(self.pos, "Expected `>` in closing tag"));
        }
        let expected = name.map(|n| n.text.as_str());
        if closing.as_deref() != expected {
            let message = match expected {
                Some(expected) => format!("Expected corresponding JSX closing tag for <{}>", expected),
                None => "Expected corresponding closing tag for JSX fragment".to_string(),
            };
            return Err(SyntaxError::new(start, message));
        }
        Ok(())
    }
}

/// Call `visit` on `tokens` and on every token run nested inside it
pub fn for_each_run<'t>(tokens: &'t [Token], visit: &mut impl FnMut(&'t [Token])) {
    visit(tokens);
    for token in tokens {
        match &token.kind {
            TokenKind::Group(_, inner) => for_each_run(inner, visit),
            TokenKind::Template(parts) => {
                for part in parts {
                    for_each_run(part, visit);
                }
            }
            TokenKind::Element(element) => for_each_element_run(element, visit),
            _ => {}
        }
    }
}

fn for_each_element_run<'t>(element: &'t JsxElement, visit: &mut impl FnMut(&'t [Token])) {
    for attribute in &element.attributes {
        match attribute {
            JsxAttribute::Named {
                value: Some(JsxAttrValue::Expr(tokens)),
                ..
            }
            | JsxAttribute::Spread { tokens, .. } => for_each_run(tokens, visit),
            JsxAttribute::Named {
                value: Some(JsxAttrValue::Element(inner)),
                ..
            } => for_each_element_run(inner, visit),
            JsxAttribute::Named { .. } => {}
        }
    }
    for child in &element.children {
        match child {
            JsxChild::Expr(tokens) => for_each_run(tokens, visit),
            JsxChild::Element(inner) => for_each_element_run(inner, visit),
            JsxChild::Text(_) => {}
        }
    }
}

/// Whether the next token is in operand position, judged by the previous one
fn operand_expected(tokens: &[Token]) -> bool {
    let Some(last) = tokens.last() else {
        return true;
    };
    match &last.kind {
        TokenKind::Punct(p) => !matches!(*p, "++" | "--"),
        TokenKind::Ident(word) => OPERAND_KEYWORDS.contains(&word.as_str()),
        TokenKind::Group(Delimiter::Brace, _) => true,
        _ => false,
    }
}
