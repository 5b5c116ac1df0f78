//! Variables bound to literals, and image component imports
//!
//! Both come from one pass over the token tree before tagging starts.
//! Scoping is ignored: a name declared anywhere in the file counts, and a
//! later declaration replaces an earlier one.

use super::lines::LineIndex;
use super::syntax::{Delimiter, Token, TokenKind, for_each_run};
use std::collections::{HashMap, HashSet};

/// Shape of a literal initializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Array,
    Object,
    /// String, number or boolean
    Primitive,
}

/// Variables whose initializer is a literal
#[derive(Debug, Clone, Default)]
pub struct VariableIndex {
    variables: HashMap<String, LiteralKind>,
}

impl VariableIndex {
    pub fn build(tokens: &[Token], lines: &LineIndex) -> Self {
        let mut index = Self::default();
        for_each_run(tokens, &mut |run| index.scan_run(run, lines));
        index
    }

    pub fn get(&self, name: &str) -> Option<LiteralKind> {
        self.variables.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn scan_run(&mut self, run: &[Token], lines: &LineIndex) {
        let mut i = 0;
        while i < run.len() {
            if matches!(run[i].ident(), Some("const" | "let" | "var")) {
                i = self.scan_declarators(run, i + 1, lines);
            } else {
                i += 1;
            }
        }
    }

    /// Read declarators starting at `i`; returns where scanning resumes
    fn scan_declarators(&mut self, run: &[Token], mut i: usize, lines: &LineIndex) -> usize {
        loop {
            // Destructuring patterns are not indexed
            let Some(name) = run.get(i).and_then(Token::ident) else {
                return i;
            };
            if name == "enum" {
                return i;
            }
            i += 1;
            if run.get(i).is_some_and(|t| t.is_punct("!")) {
                i += 1;
            }
            if run.get(i).is_some_and(|t| t.is_punct(":")) {
                i = skip_type_annotation(run, i + 1);
            }
            if !run.get(i).is_some_and(|t| t.is_punct("=")) {
                if run.get(i).is_some_and(|t| t.is_punct(",")) {
                    i += 1;
                    continue;
                }
                return i;
            }
            i += 1;
            i = match literal_initializer(run, i, lines) {
                Some((kind, next)) => {
                    self.variables.insert(name.to_string(), kind);
                    next
                }
                None => skip_expression(run, i),
            };
            if run.get(i).is_some_and(|t| t.is_punct(",")) {
                i += 1;
                continue;
            }
            return i;
        }
    }
}

/// Skip a type up to `=`, `,` or `;` outside angle brackets
fn skip_type_annotation(run: &[Token], mut i: usize) -> usize {
    let mut depth = 0i32;
    while let Some(token) = run.get(i) {
        match token.kind {
            TokenKind::Punct("<") => depth += 1,
            TokenKind::Punct(">") => depth -= 1,
            TokenKind::Punct(">>") => depth -= 2,
            TokenKind::Punct(">>>") => depth -= 3,
            TokenKind::Punct("=" | "," | ";") if depth <= 0 => return i,
            _ => {}
        }
        i += 1;
    }
    i
}

/// Skip an initializer up to the next `,`, `;` or declaration keyword
fn skip_expression(run: &[Token], mut i: usize) -> usize {
    while let Some(token) = run.get(i) {
        if token.is_punct(",")
            || token.is_punct(";")
            || matches!(token.ident(), Some("const" | "let" | "var"))
        {
            break;
        }
        i += 1;
    }
    i
}

/// The literal starting at `i`, if the initializer is nothing more than that
fn literal_initializer(run: &[Token], i: usize, lines: &LineIndex) -> Option<(LiteralKind, usize)> {
    let token = run.get(i)?;
    let kind = match &token.kind {
        TokenKind::Group(Delimiter::Bracket, _) => LiteralKind::Array,
        TokenKind::Group(Delimiter::Brace, _) => LiteralKind::Object,
        TokenKind::Str(_) | TokenKind::Num => LiteralKind::Primitive,
        TokenKind::Ident(word) if word == "true" || word == "false" => LiteralKind::Primitive,
        _ => return None,
    };
    let next = i + 1;
    match run.get(next) {
        None => Some((kind, next)),
        Some(t) if t.is_punct(";") || t.is_punct(",") => Some((kind, next)),
        // `as const`, `satisfies Shape`
        Some(t) if t.is_ident("as") || t.is_ident("satisfies") => {
            Some((kind, skip_expression(run, next)))
        }
        Some(t) if lines.spans_lines(token.span.end, t.span.start) && !continues(t) => {
            Some((kind, next))
        }
        Some(_) => None,
    }
}

/// Whether a token on the next line still extends the expression
fn continues(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Punct(_)
            | TokenKind::Template(_)
            | TokenKind::Group(Delimiter::Paren | Delimiter::Bracket, _)
    )
}

/// Local names bound by imports from any of `modules`
pub fn image_aliases(tokens: &[Token], modules: &[String]) -> HashSet<String> {
    let mut aliases = HashSet::new();
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_ident("import") {
            continue;
        }
        let Some(source_at) = tokens[i + 1..]
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Str(_)) || t.is_punct(";"))
            .map(|p| i + 1 + p)
        else {
            continue;
        };
        let TokenKind::Str(module) = &tokens[source_at].kind else {
            continue;
        };
        if !modules.iter().any(|m| m == module) {
            continue;
        }
        let clause = &tokens[i + 1..source_at];
        let clause = match clause.split_last() {
            Some((last, rest)) if last.is_ident("from") => rest,
            _ => continue,
        };
        collect_bindings(clause, &mut aliases);
    }
    aliases
}

fn collect_bindings(clause: &[Token], aliases: &mut HashSet<String>) {
    let mut clause = clause;
    if clause.first().is_some_and(|t| t.is_ident("type"))
        && clause.get(1).is_some_and(|t| !t.is_punct(","))
    {
        clause = &clause[1..];
    }
    let mut i = 0;
    while let Some(token) = clause.get(i) {
        match &token.kind {
            TokenKind::Ident(name) => {
                aliases.insert(name.clone());
            }
            TokenKind::Punct("*") => {
                // `* as Namespace`
                if let Some(name) = clause.get(i + 2).and_then(Token::ident) {
                    aliases.insert(name.to_string());
                }
                i += 2;
            }
            TokenKind::Group(Delimiter::Brace, specifiers) => {
                for specifier in specifiers.split(|t| t.is_punct(",")) {
                    if let Some(local) = specifier.last().and_then(Token::ident) {
                        aliases.insert(local.to_string());
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
}
