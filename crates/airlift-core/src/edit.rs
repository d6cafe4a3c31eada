//! Byte-span edits against original source text.
//!
//! Transformers collect [`SourceEdit`]s while walking the AST and apply
//! them in one pass at the end, so everything between edits is carried over
//! byte for byte.

use ruff_text_size::{TextRange, TextSize};

/// A single replacement of a byte range in the original source.
#[derive(Debug, Clone)]
pub struct SourceEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl SourceEdit {
    pub fn replace(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn delete(range: TextRange) -> Self {
        Self {
            range,
            replacement: String::new(),
        }
    }

    pub fn insert(at: TextSize, text: impl Into<String>) -> Self {
        Self {
            range: TextRange::empty(at),
            replacement: text.into(),
        }
    }
}

/// Apply edits to `source`, sorted by start offset. An edit that begins
/// inside an earlier edit's range is dropped: a deletion subsumes any edit
/// nested within it.
pub fn apply_edits(source: &str, mut edits: Vec<SourceEdit>) -> String {
    if edits.is_empty() {
        return source.to_owned();
    }

    edits.sort_by_key(|e| (e.range.start(), e.range.end()));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in edits {
        let start = usize::from(edit.range.start());
        let end = usize::from(edit.range.end());
        if start < cursor || end > source.len() {
            continue;
        }
        out.push_str(&source[cursor..start]);
        out.push_str(&edit.replacement);
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// 1-based line number of a byte offset, for issue messages.
pub fn line_of(source: &str, offset: TextSize) -> usize {
    let end = usize::from(offset).min(source.len());
    source[..end].bytes().filter(|b| *b == b'\n').count() + 1
}
