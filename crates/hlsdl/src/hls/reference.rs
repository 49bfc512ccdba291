//! Pattern-based discovery of playlist, key and segment references.
//!
//! Matching runs over the raw playlist text, not a parsed playlist: any line,
//! attribute value or comment containing something that looks like a file URL
//! with the wanted extension counts as a reference.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

pub const PLAYLIST_EXTENSION: &str = "m3u8";
pub const KEY_EXTENSION: &str = "key";
pub const SEGMENT_EXTENSION: &str = "ts";

static PLAYLIST_REGEX: LazyLock<Regex> =
    LazyLock::new(|| create_file_url_regex(PLAYLIST_EXTENSION, true).unwrap());
static KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| create_file_url_regex(KEY_EXTENSION, true).unwrap());
static SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| create_file_url_regex(SEGMENT_EXTENSION, true).unwrap());

/// Builds the file URL pattern for `ext`: an optional `http(s)://` prefix, a
/// lazily matched run of URL path characters, then `.ext`.
pub fn create_file_url_regex(ext: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(
        r"(https?://)?[\w:.\-/]+?\.{}",
        regex::escape(ext)
    ))
    .case_insensitive(case_insensitive)
    .build()
}

/// A matched reference and the byte span it occupies in the playlist text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub text: String,
    pub span: Range<usize>,
}

impl Reference {
    fn from_match(m: regex::Match<'_>) -> Self {
        Self {
            text: m.as_str().to_string(),
            span: m.range(),
        }
    }

    fn overlaps(&self, other: &Reference) -> bool {
        self.span.start < other.span.end && other.span.start < self.span.end
    }
}

/// Key and segment references of a media playlist, in textual order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistReferences {
    pub key: Option<Reference>,
    pub segments: Vec<Reference>,
}

impl PlaylistReferences {
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.segments.is_empty()
    }
}

/// First nested playlist pointer in `content`, if any.
pub fn find_nested_playlist(content: &str) -> Option<Reference> {
    PLAYLIST_REGEX.find(content).map(Reference::from_match)
}

pub fn find_key(content: &str) -> Option<Reference> {
    KEY_REGEX.find(content).map(Reference::from_match)
}

pub fn find_segments(content: &str) -> Vec<Reference> {
    SEGMENT_REGEX
        .find_iter(content)
        .map(Reference::from_match)
        .collect()
}

/// Extracts the key reference and every segment reference.
///
/// Segment matches overlapping the key span are dropped: that text belongs to
/// the key rewrite.
pub fn extract_references(content: &str) -> PlaylistReferences {
    let key = find_key(content);
    let mut segments = find_segments(content);
    if let Some(key) = &key {
        segments.retain(|segment| !segment.overlaps(key));
    }
    PlaylistReferences { key, segments }
}
