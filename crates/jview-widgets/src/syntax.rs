#![forbid(unsafe_code)]

//! Line-local JSON token coloring.
//!
//! Each formatted line is scanned on its own with one regex; there is no
//! lexer state carried between lines. This is enough for pretty-printed
//! output, where every token sits on one line. A string that spans lines
//! (impossible in valid formatted JSON, possible in arbitrary text) colors
//! incorrectly; that is accepted.
//!
//! Very long lines (minified documents) are cut to `max_chars` characters
//! plus ` …` before scanning, so one huge line cannot stall a frame. The cut
//! affects display only, never the underlying document.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Suffix appended to a line cut for highlighting.
pub const CLIP_SUFFIX: &str = " …";

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"("(?:\\.|[^"\\])*"\s*:)|("(?:\\.|[^"\\])*")|(-?\d+\.?\d*(?:[eE][+-]?\d+)?)|(\btrue\b|\bfalse\b)|(\bnull\b)"#,
    )
    .unwrap()
});

/// Token classes the highlighter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// An object key, quotes included, colon excluded.
    Key,
    String,
    Number,
    Boolean,
    Null,
}

/// A byte range of the display text and its token class, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    pub range: Range<usize>,
    pub kind: Option<TokenKind>,
}

/// One highlighted line.
///
/// Spans are contiguous and cover `display` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedLine<'a> {
    pub display: Cow<'a, str>,
    pub spans: Vec<TokenSpan>,
}

impl HighlightedLine<'_> {
    /// Whether the line was cut before highlighting.
    #[must_use]
    pub fn is_clipped(&self) -> bool {
        matches!(self.display, Cow::Owned(_))
    }

    /// `(text, kind)` pairs in display order.
    pub fn segments(&self) -> impl Iterator<Item = (&str, Option<TokenKind>)> + '_ {
        self.spans
            .iter()
            .map(|span| (&self.display[span.range.clone()], span.kind))
    }
}

/// Cut `text` to `max_chars` characters plus [`CLIP_SUFFIX`].
#[must_use]
pub fn clip_for_highlight(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}{CLIP_SUFFIX}", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

/// Tokenize one line.
#[must_use]
pub fn highlight_line(text: &str, max_chars: usize) -> HighlightedLine<'_> {
    let display = clip_for_highlight(text, max_chars);
    let spans = tokenize(&display);
    HighlightedLine { display, spans }
}

fn tokenize(text: &str) -> Vec<TokenSpan> {
    fn plain(spans: &mut Vec<TokenSpan>, range: Range<usize>) {
        if !range.is_empty() {
            spans.push(TokenSpan { range, kind: None });
        }
    }

    let mut spans = Vec::new();
    let mut last = 0;

    for caps in TOKEN_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        plain(&mut spans, last..whole.start());

        if let Some(key) = caps.get(1) {
            // Key includes the trailing `\s*:`; the colon and any space stay plain.
            let colon = key.as_str().rfind(':').map_or(key.end(), |i| key.start() + i);
            let quote_end = key.as_str()[..colon - key.start()]
                .trim_end()
                .len()
                + key.start();
            spans.push(TokenSpan {
                range: key.start()..quote_end,
                kind: Some(TokenKind::Key),
            });
            plain(&mut spans, quote_end..key.end());
        } else {
            let kind = if caps.get(2).is_some() {
                TokenKind::String
            } else if caps.get(3).is_some() {
                TokenKind::Number
            } else if caps.get(4).is_some() {
                TokenKind::Boolean
            } else {
                TokenKind::Null
            };
            spans.push(TokenSpan {
                range: whole.range(),
                kind: Some(kind),
            });
        }
        last = whole.end();
    }
    plain(&mut spans, last..text.len());
    spans
}

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    #[must_use]
    pub const fn hex(value: u32) -> Self {
        Self((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

/// Colors per token class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPalette {
    pub key: Rgb,
    pub string: Rgb,
    pub number: Rgb,
    pub boolean: Rgb,
    pub null: Rgb,
    pub gutter: Rgb,
}

impl TokenPalette {
    pub const DARK: Self = Self {
        key: Rgb::hex(0x7dd3fc),
        string: Rgb::hex(0x86efac),
        number: Rgb::hex(0xfda4af),
        boolean: Rgb::hex(0xc4b5fd),
        null: Rgb::hex(0x9ca3af),
        gutter: Rgb::hex(0x52525b),
    };

    pub const LIGHT: Self = Self {
        key: Rgb::hex(0x0369a1),
        string: Rgb::hex(0x15803d),
        number: Rgb::hex(0xbe123c),
        boolean: Rgb::hex(0x7c3aed),
        null: Rgb::hex(0x6b7280),
        gutter: Rgb::hex(0xa1a1aa),
    };

    #[must_use]
    pub const fn for_theme(light: bool) -> Self {
        if light { Self::LIGHT } else { Self::DARK }
    }

    #[must_use]
    pub const fn color(&self, kind: TokenKind) -> Rgb {
        match kind {
            TokenKind::Key => self.key,
            TokenKind::String => self.string,
            TokenKind::Number => self.number,
            TokenKind::Boolean => self.boolean,
            TokenKind::Null => self.null,
        }
    }
}

impl Default for TokenPalette {
    fn default() -> Self {
        Self::DARK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(String, Option<TokenKind>)> {
        highlight_line(text, 5000)
            .segments()
            .map(|(t, k)| (t.to_string(), k))
            .collect()
    }

    #[test]
    fn key_and_number() {
        assert_eq!(
            kinds(r#"  "a": 1,"#),
            [
                ("  ".to_string(), None),
                (r#""a""#.to_string(), Some(TokenKind::Key)),
                (":".to_string(), None),
                (" ".to_string(), None),
                ("1".to_string(), Some(TokenKind::Number)),
                (",".to_string(), None),
            ]
        );
    }

    #[test]
    fn space_before_colon_stays_plain() {
        let line = highlight_line(r#""k" : null"#, 5000);
        let segments: Vec<_> = line.segments().collect();
        assert_eq!(segments[0], (r#""k""#, Some(TokenKind::Key)));
        assert_eq!(segments[1], (" :", None));
        assert_eq!(segments.last(), Some(&("null", Some(TokenKind::Null))));
    }

    #[test]
    fn value_kinds() {
        let kinds: Vec<_> = kinds(r#"["s", -1.5e3, true, false, null]"#)
            .into_iter()
            .filter_map(|(_, k)| k)
            .collect();
        assert_eq!(
            kinds,
            [
                TokenKind::String,
                TokenKind::Number,
                TokenKind::Boolean,
                TokenKind::Boolean,
                TokenKind::Null
            ]
        );
    }

    #[test]
    fn escaped_quote_inside_string() {
        let spans = kinds(r#""a\"b": "c\\""#);
        assert_eq!(spans[0], (r#""a\"b""#.to_string(), Some(TokenKind::Key)));
        assert_eq!(spans.last().unwrap().1, Some(TokenKind::String));
    }

    #[test]
    fn spans_cover_display() {
        let line = highlight_line(r#"{"x": [1, "two", null]} trailing"#, 5000);
        let rebuilt: String = line.segments().map(|(t, _)| t).collect();
        assert_eq!(rebuilt, line.display);
        assert!(!line.is_clipped());
    }

    #[test]
    fn long_lines_are_cut_for_display() {
        let text = "1".repeat(6000);
        let line = highlight_line(&text, 5000);
        assert!(line.is_clipped());
        assert!(line.display.ends_with(CLIP_SUFFIX));
        assert_eq!(line.display.chars().count(), 5000 + 2);
    }

    #[test]
    fn clip_counts_characters() {
        assert_eq!(clip_for_highlight("ééé", 2), "éé …");
        assert_eq!(clip_for_highlight("ééé", 3), "ééé");
    }

    #[test]
    fn palettes() {
        assert_eq!(TokenPalette::DARK.key, Rgb(0x7d, 0xd3, 0xfc));
        assert_eq!(TokenPalette::for_theme(true).color(TokenKind::Number), Rgb::hex(0xbe123c));
    }
}
