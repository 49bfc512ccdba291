use std::ops::Range;

use super::HlsError;

/// Collects span replacements against an immutable source text and applies
/// them in one pass.
///
/// Spans refer to the source text, so replacements can be registered in any
/// order and repeated literals never get confused with each other.
#[derive(Debug)]
pub struct PlaylistRewriter<'a> {
    source: &'a str,
    edits: Vec<(Range<usize>, String)>,
}

impl<'a> PlaylistRewriter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    pub fn replace(&mut self, span: Range<usize>, replacement: &str) -> Result<(), HlsError> {
        if span.start > span.end
            || span.end > self.source.len()
            || !self.source.is_char_boundary(span.start)
            || !self.source.is_char_boundary(span.end)
        {
            return Err(HlsError::InvalidPlaylist(format!(
                "rewrite span {span:?} is outside the playlist text"
            )));
        }
        if let Some((existing, _)) = self
            .edits
            .iter()
            .find(|(existing, _)| span.start < existing.end && existing.start < span.end)
        {
            return Err(HlsError::InvalidPlaylist(format!(
                "rewrite span {span:?} overlaps {existing:?}"
            )));
        }
        self.edits.push((span, replacement.to_string()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Applies every replacement right-to-left so earlier offsets stay valid.
    pub fn finish(mut self) -> String {
        self.edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        let mut output = self.source.to_string();
        for (span, replacement) in self.edits {
            output.replace_range(span, &replacement);
        }
        output
    }
}
