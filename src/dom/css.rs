//! Inline style declarations using cssparser
//!
//! Parses the contents of a `style` attribute into an ordered declaration
//! list, keeps `!important` priorities, and serializes back to attribute text.

use cssparser::{Delimiter, ParseError, Parser, ParserInput, Token};

/// A single `property: value` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// Ordered inline style of one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    declarations: Vec<Declaration>,
}

impl InlineStyle {
    /// Parse `style` attribute text. Malformed declarations are skipped.
    pub fn parse(text: &str) -> Self {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let mut style = InlineStyle::default();

        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }

            if let Ok(decl) = parser.try_parse(|p| parse_declaration(p)) {
                if !decl.value.is_empty() {
                    style.set(&decl.property, &decl.value, decl.important);
                }
            }
            skip_past_semicolon(&mut parser);
        }

        style
    }

    /// Get a property value
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    /// Whether a property carries `!important`
    pub fn is_important(&self, property: &str) -> bool {
        self.declarations
            .iter()
            .any(|d| d.property == property && d.important)
    }

    /// Set or replace a property, keeping its original position
    pub fn set(&mut self, property: &str, value: &str, important: bool) {
        let property = property.to_ascii_lowercase();
        match self.declarations.iter_mut().find(|d| d.property == property) {
            Some(existing) => {
                existing.value = value.to_string();
                existing.important = important;
            }
            None => self.declarations.push(Declaration {
                property,
                value: value.to_string(),
                important,
            }),
        }
    }

    /// Remove a property
    pub fn remove(&mut self, property: &str) -> bool {
        let before = self.declarations.len();
        self.declarations.retain(|d| d.property != property);
        before != self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Serialize back to attribute text
    pub fn to_css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|d| {
                if d.important {
                    format!("{}: {} !important", d.property, d.value)
                } else {
                    format!("{}: {}", d.property, d.value)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A resolved CSS length
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f32),
    Percent(f32),
}

/// Parse a single length token (`12px`, `50%`, or a bare `0`)
pub fn parse_length(value: &str) -> Option<Length> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let length = match parser.next().ok()? {
        Token::Dimension { value, unit, .. } if unit.eq_ignore_ascii_case("px") => {
            Length::Px(*value)
        }
        Token::Percentage { unit_value, .. } => Length::Percent(*unit_value * 100.0),
        Token::Number { value, .. } => Length::Px(*value),
        _ => return None,
    };
    parser.expect_exhausted().ok()?;
    Some(length)
}

/// Parse a pixel length, treating anything else as absent
pub fn parse_px(value: &str) -> Option<f32> {
    match parse_length(value)? {
        Length::Px(px) => Some(px),
        Length::Percent(_) => None,
    }
}

fn parse_declaration<'i>(parser: &mut Parser<'i, '_>) -> Result<Declaration, ParseError<'i, ()>> {
    let property = parser.expect_ident()?.to_ascii_lowercase();
    parser.expect_colon()?;
    let raw = parser.parse_until_before(Delimiter::Semicolon, |p| {
        let start = p.position();
        while p.next().is_ok() {}
        Ok::<_, ParseError<'i, ()>>(p.slice_from(start).trim().to_string())
    })?;
    let (value, important) = split_important(&raw);
    Ok(Declaration {
        property,
        value,
        important,
    })
}

fn split_important(raw: &str) -> (String, bool) {
    if let Some(bang) = raw.rfind('!') {
        if raw[bang + 1..].trim().eq_ignore_ascii_case("important") {
            return (raw[..bang].trim().to_string(), true);
        }
    }
    (raw.to_string(), false)
}

fn skip_past_semicolon(parser: &mut Parser<'_, '_>) {
    loop {
        match parser.next() {
            Ok(Token::Semicolon) => break,
            Err(_) => break,
            _ => continue,
        }
    }
}
