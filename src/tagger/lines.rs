//! Byte offset to line/column conversion

/// Line starts of a source text
///
/// Lines are 1-based. Columns are 0-based and counted in UTF-16 code units,
/// the unit JavaScript tooling and source maps use.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { source, starts }
    }

    /// `(line, column)` of a byte offset
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.starts[line];
        let column = self
            .source
            .get(start..offset)
            .map(|text| text.encode_utf16().count())
            .unwrap_or(0);
        (line + 1, column)
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Whether a line break lies between two offsets
    pub fn spans_lines(&self, from: usize, to: usize) -> bool {
        self.position(from).0 != self.position(to).0
    }
}
