//! Insertion buffer and revision 3 source maps
//!
//! Tagging only ever inserts text, so the map is built while splicing: every
//! original character except line breaks gets its own segment, and inserted
//! text is left unmapped.

use base64::alphabet;
use serde::{Deserialize, Serialize};

/// VLQ digits use the standard base64 alphabet
fn vlq_digits() -> &'static [u8] {
    alphabet::STANDARD.as_str().as_bytes()
}

/// Source map in the revision 3 JSON layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(default)]
    pub sources_content: Vec<Option<String>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

/// One decoded mapping, all fields absolute and 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_column: u32,
    pub source: u32,
    pub original_line: u32,
    pub original_column: u32,
}

impl SourceMap {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Segments per generated line
    pub fn decoded_mappings(&self) -> Vec<Vec<Segment>> {
        let mut state = [0i64; 4];
        self.mappings
            .split(';')
            .map(|line| {
                state[0] = 0;
                line.split(',')
                    .filter(|s| !s.is_empty())
                    .filter_map(|raw| {
                        let fields = decode_vlq(raw)?;
                        if fields.len() < 4 {
                            return None;
                        }
                        for (slot, delta) in state.iter_mut().zip(&fields) {
                            *slot += delta;
                        }
                        Some(Segment {
                            generated_column: state[0] as u32,
                            source: state[1] as u32,
                            original_line: state[2] as u32,
                            original_column: state[3] as u32,
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// Original `(line, column)` for a generated position; lines 1-based,
    /// columns 0-based
    pub fn original_position_for(&self, line: usize, column: usize) -> Option<(usize, usize)> {
        let lines = self.decoded_mappings();
        let segments = lines.get(line.checked_sub(1)?)?;
        segments
            .iter()
            .take_while(|s| s.generated_column as usize <= column)
            .last()
            .map(|s| (s.original_line as usize + 1, s.original_column as usize))
    }
}

/// Pending insertions into one source text
#[derive(Debug, Clone)]
pub struct EditBuffer<'a> {
    source: &'a str,
    insertions: Vec<(usize, String)>,
}

impl<'a> EditBuffer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            insertions: Vec::new(),
        }
    }

    /// Insert `text` before the character at byte `offset`; insertions at
    /// the same offset keep their order
    pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
        self.insertions.push((offset.min(self.source.len()), text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    /// Spliced code and its map back to `source_name`
    pub fn finish(mut self, file: Option<&str>, source_name: &str) -> (String, SourceMap) {
        self.insertions.sort_by_key(|(offset, _)| *offset);
        let extra: usize = self.insertions.iter().map(|(_, text)| text.len()).sum();
        let mut code = String::with_capacity(self.source.len() + extra);
        let mut mappings = String::new();
        let mut pending = self.insertions.iter().peekable();

        // Previous segment, for relative encoding
        let mut last_generated = 0i64;
        let mut last_line = 0i64;
        let mut last_column = 0i64;

        let mut line = 0i64;
        let mut generated = 0i64;
        let mut original = 0i64;
        let mut line_has_segment = false;

        for (offset, ch) in self.source.char_indices() {
            while let Some((_, text)) = pending.next_if(|(at, _)| *at <= offset) {
                code.push_str(text);
                generated += text.encode_utf16().count() as i64;
            }
            if ch == '\n' {
                code.push('\n');
                mappings.push(';');
                line += 1;
                generated = 0;
                original = 0;
                last_generated = 0;
                line_has_segment = false;
                continue;
            }
            if line_has_segment {
                mappings.push(',');
            }
            encode_vlq(&mut mappings, generated - last_generated);
            encode_vlq(&mut mappings, 0);
            encode_vlq(&mut mappings, line - last_line);
            encode_vlq(&mut mappings, original - last_column);
            last_generated = generated;
            last_line = line;
            last_column = original;
            line_has_segment = true;

            code.push(ch);
            generated += ch.len_utf16() as i64;
            original += ch.len_utf16() as i64;
        }
        for (_, text) in pending {
            code.push_str(text);
        }

        let map = SourceMap {
            version: 3,
            file: file.map(str::to_string),
            sources: vec![source_name.to_string()],
            sources_content: vec![Some(self.source.to_string())],
            names: Vec::new(),
            mappings,
        };
        (code, map)
    }
}

/// Append one base64 VLQ value
pub fn encode_vlq(out: &mut String, value: i64) {
    let mut rest = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (rest & 31) as usize;
        rest >>= 5;
        if rest > 0 {
            digit |= 32;
        }
        out.push(vlq_digits()[digit] as char);
        if rest == 0 {
            break;
        }
    }
}

/// Decode every VLQ value in a segment
pub fn decode_vlq(segment: &str) -> Option<Vec<i64>> {
    let mut values = Vec::new();
    let mut value = 0u64;
    let mut shift = 0u32;
    for byte in segment.bytes() {
        let digit = vlq_digits().iter().position(|b| *b == byte)? as u64;
        if shift > 60 {
            return None;
        }
        value |= (digit & 31) << shift;
        if digit & 32 != 0 {
            shift += 5;
            continue;
        }
        let magnitude = (value >> 1) as i64;
        values.push(if value & 1 == 1 { -magnitude } else { magnitude });
        value = 0;
        shift = 0;
    }
    (shift == 0).then_some(values)
}
