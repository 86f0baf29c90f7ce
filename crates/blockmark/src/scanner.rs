//! Line scanning for paired block tags.
//!
//! Finds the closing tag of a block whose name may appear nested inside its
//! own body. The scan is a value object ([`ScanState`]) passed through each
//! step, so an attempt can be restarted or inspected at any line.

use crate::pattern::{TagEvent, TagPatterns};

/// Lines of the text being converted, with a scan cursor.
#[derive(Debug, Clone)]
pub struct TextDocument<'a> {
    lines: Vec<&'a str>,
    cursor: usize,
}

impl<'a> TextDocument<'a> {
    /// Split text into lines (`\n` or `\r\n`).
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            cursor: 0,
        }
    }

    /// Index of the line under the cursor.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The line under the cursor, or `None` once all lines are consumed.
    #[must_use]
    pub fn current(&self) -> Option<&'a str> {
        self.line(self.cursor)
    }

    /// A line by index.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    /// Lines in `start..end`.
    #[must_use]
    pub fn lines(&self, start: usize, end: usize) -> &[&'a str] {
        let end = end.min(self.lines.len());
        &self.lines[start.min(end)..end]
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the text has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Move the cursor to `line`.
    pub fn seek(&mut self, line: usize) {
        self.cursor = line.min(self.lines.len());
    }

    /// Move the cursor to the next line.
    pub fn advance(&mut self) {
        self.seek(self.cursor + 1);
    }
}

/// State of one block match attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanState {
    /// Line currently being scanned.
    pub cursor: usize,
    /// Open same-name tags, including the block's own opening tag.
    pub nesting_depth: usize,
    /// Body text collected so far, one entry per line.
    pub accumulated_lines: Vec<String>,
}

/// Result of feeding one line segment to a [`ScanState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStep {
    /// The block is still open; continue with the next line.
    Open(ScanState),
    /// The terminating close tag was found on the current line.
    Closed(ScanState),
}

impl ScanState {
    /// Start a scan at the block's opening line.
    #[must_use]
    pub fn begin(cursor: usize) -> Self {
        Self {
            cursor,
            nesting_depth: 1,
            accumulated_lines: Vec::new(),
        }
    }

    /// Feed the segment of the current line that belongs to the body.
    ///
    /// Nested opening tags raise the depth, closing tags lower it, in the order
    /// they appear. Self-closing tags leave it unchanged. The tag that brings the
    /// depth to zero terminates the block; only text before it is collected.
    #[must_use]
    pub fn step(mut self, segment: &str, patterns: &TagPatterns) -> ScanStep {
        for event in patterns.events(segment) {
            match event {
                TagEvent::Open { .. } => self.nesting_depth += 1,
                TagEvent::SelfClosing { .. } => {}
                TagEvent::Close { at } => {
                    self.nesting_depth = self.nesting_depth.saturating_sub(1);
                    if self.nesting_depth == 0 {
                        self.accumulated_lines.push(segment[..at].to_owned());
                        return ScanStep::Closed(self);
                    }
                }
            }
        }

        self.accumulated_lines.push(segment.to_owned());
        ScanStep::Open(self)
    }

    /// Move to the next line.
    #[must_use]
    pub fn next_line(mut self) -> Self {
        self.cursor += 1;
        self
    }

    /// Collected body text, newline-joined and trimmed.
    #[must_use]
    pub fn content(&self) -> String {
        self.accumulated_lines.join("\n").trim().to_owned()
    }
}

/// A block body located by [`scan_body`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedBody {
    /// Index of the line holding the terminating close tag.
    pub end_line: usize,
    /// Body text between the tags, trimmed.
    pub content: String,
}

/// Scan for the close tag of a block opened on `start_line`.
///
/// `first_segment` is the remainder of the opening line after its `>`.
/// Returns `None` if the document ends before the block is closed.
#[must_use]
pub fn scan_body(
    doc: &TextDocument<'_>,
    start_line: usize,
    first_segment: &str,
    patterns: &TagPatterns,
) -> Option<ScannedBody> {
    let mut state = match ScanState::begin(start_line).step(first_segment, patterns) {
        ScanStep::Closed(state) => return Some(state.into_body()),
        ScanStep::Open(state) => state,
    };

    loop {
        state = state.next_line();
        let line = doc.line(state.cursor)?;
        state = match state.step(line, patterns) {
            ScanStep::Closed(state) => return Some(state.into_body()),
            ScanStep::Open(state) => state,
        };
    }
}

impl ScanState {
    fn into_body(self) -> ScannedBody {
        ScannedBody {
            end_line: self.cursor,
            content: self.content(),
        }
    }
}
