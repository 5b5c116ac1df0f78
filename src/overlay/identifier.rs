//! Element identifiers
//!
//! An identifier names a source location, `path:line:column`, optionally
//! followed by `@context` suffixes. Several live nodes may share one.

use std::fmt;

/// Source location decoded from an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId {
    pub file_path: String,
    pub line: u32,
    pub column: u32,
    /// Everything after the first `@`, e.g. `items` or `items@label`
    pub map_context: Option<String>,
}

impl ElementId {
    /// Decode `path:line:column[@ctx...]`
    ///
    /// The last two colon-separated segments are the column and line; each
    /// contributes its leading integer, so `4@items` reads as column 4.
    /// Everything before them is the path, which may itself contain colons.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 3 {
            return None;
        }
        let last = parts.pop()?;
        let column = leading_int(last)?;
        let line = leading_int(parts.pop()?)?;
        let map_context = last
            .split_once('@')
            .map(|(_, context)| context)
            .filter(|context| !context.is_empty())
            .map(str::to_string);
        Some(Self {
            file_path: parts.join(":"),
            line,
            column,
            map_context,
        })
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_path, self.line, self.column)?;
        if let Some(context) = &self.map_context {
            write!(f, "@{}", context)?;
        }
        Ok(())
    }
}

/// Leading decimal digits after optional whitespace, `None` when there are none
fn leading_int(segment: &str) -> Option<u32> {
    let trimmed = segment.trim_start();
    let digits = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_identifier() {
        let id = ElementId::parse("src/app/page.tsx:12:4").unwrap();
        assert_eq!(id.file_path, "src/app/page.tsx");
        assert_eq!(id.line, 12);
        assert_eq!(id.column, 4);
        assert_eq!(id.map_context, None);
    }

    #[test]
    fn test_parse_array_context() {
        let id = ElementId::parse("file:3:4@items").unwrap();
        assert_eq!((id.line, id.column), (3, 4));
        assert_eq!(id.map_context.as_deref(), Some("items"));
        assert_eq!(id.to_string(), "file:3:4@items");
    }

    #[test]
    fn test_parse_variable_context() {
        let id = ElementId::parse("file:3:4@var").unwrap();
        assert_eq!(id.map_context.as_deref(), Some("var"));
        assert_eq!(id.to_string(), "file:3:4@var");
        assert_eq!(ElementId::parse("file:3:4@").unwrap().to_string(), "file:3:4");
    }

    #[test]
    fn test_parse_context_suffix() {
        let id = ElementId::parse("src/app/page.tsx:20:8@items@label").unwrap();
        assert_eq!(id.line, 20);
        assert_eq!(id.column, 8);
        assert_eq!(id.map_context.as_deref(), Some("items@label"));
        assert_eq!(id.to_string(), "src/app/page.tsx:20:8@items@label");
    }

    #[test]
    fn test_parse_path_with_colon() {
        let id = ElementId::parse("C:\\work\\page.tsx:3:1").unwrap();
        assert_eq!(id.file_path, "C:\\work\\page.tsx");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(ElementId::parse("page.tsx:12"), None);
        assert_eq!(ElementId::parse("page.tsx:x:1"), None);
        assert_eq!(ElementId::parse("page.tsx:1:@a"), None);
        assert_eq!(ElementId::parse(""), None);
    }
}
