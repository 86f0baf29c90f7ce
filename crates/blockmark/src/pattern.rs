//! Tag pattern construction.
//!
//! Builds the start/end matchers for a block tag name: `<Name ...>` and `</Name>`.

use regex::Regex;

/// Start and end matchers for a single tag name.
///
/// The tag name is escaped, so it is always matched literally. Matching is
/// case-insensitive.
///
/// # Example
///
/// ```
/// use blockmark::TagPatterns;
///
/// let patterns = TagPatterns::for_tag("Note");
/// assert!(patterns.start.is_match("<Note>"));
/// assert!(patterns.start.is_match("<note title=\"x\">"));
/// assert!(!patterns.start.is_match("<NoteTaking>"));
/// assert!(patterns.end.is_match("</Note >"));
/// ```
#[derive(Debug, Clone)]
pub struct TagPatterns {
    /// Matches `<name` followed by whitespace, `>`, `/>` or end of input.
    ///
    /// Capture group 1 is the tag name itself.
    pub start: Regex,
    /// Matches `</name` + optional whitespace + `>`.
    pub end: Regex,
}

impl TagPatterns {
    /// Build matchers for a tag name.
    #[must_use]
    pub fn for_tag(name: &str) -> Self {
        let escaped = regex::escape(name);
        Self {
            start: compile(&format!(r"(?i)<({escaped})(?:\s|/>|>|$)")),
            end: compile(&format!(r"(?i)</{escaped}\s*>")),
        }
    }

    /// Match an opening tag at the start of a line (after indentation).
    pub(crate) fn open_at_line_start(&self, line: &str) -> Option<OpenTag> {
        let indent = line.len() - line.trim_start().len();
        let caps = self.start.captures(line)?;
        let whole = caps.get(0)?;
        if whole.start() != indent {
            return None;
        }
        let name = caps.get(1)?;
        Some(OpenTag {
            start: whole.start(),
            name_end: name.end(),
        })
    }

    /// All opening and closing occurrences in `segment`, in positional order.
    pub(crate) fn events(&self, segment: &str) -> Vec<TagEvent> {
        let mut events: Vec<TagEvent> = self
            .start
            .captures_iter(segment)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                let self_closing = find_tag_close(&segment[name.end()..])
                    .is_some_and(|close| close.self_closing);
                Some(if self_closing {
                    TagEvent::SelfClosing { at: whole.start() }
                } else {
                    TagEvent::Open { at: whole.start() }
                })
            })
            .collect();

        events.extend(
            self.end
                .find_iter(segment)
                .map(|m| TagEvent::Close { at: m.start() }),
        );
        events.sort_by_key(TagEvent::position);
        events
    }
}

/// Compile a pattern built from an escaped tag name.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("pattern built from an escaped tag name is valid")
}

/// Opening tag located on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpenTag {
    /// Byte offset of `<`.
    pub start: usize,
    /// Byte offset just past the tag name.
    pub name_end: usize,
}

/// A tag occurrence inside a scanned line segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagEvent {
    /// `<name ...>` that expects a matching close.
    Open { at: usize },
    /// `<name .../>`.
    SelfClosing { at: usize },
    /// `</name>`.
    Close { at: usize },
}

impl TagEvent {
    fn position(&self) -> usize {
        match *self {
            Self::Open { at } | Self::SelfClosing { at } | Self::Close { at } => at,
        }
    }
}

/// End of an opening tag's attribute section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TagClose {
    /// Byte offset where the attribute string ends (before `/>` or `>`).
    pub props_end: usize,
    /// Byte offset just past the closing `>`.
    pub after: usize,
    /// Whether the tag ends with `/>`.
    pub self_closing: bool,
}

/// Find the `>` that closes an opening tag.
///
/// `s` starts right after the tag name. A `>` inside a quoted value or a
/// `{...}` expression does not close the tag.
pub(crate) fn find_tag_close(s: &str) -> Option<TagClose> {
    let mut quote: Option<char> = None;
    let mut braces = 0usize;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '{' => braces += 1,
            '}' => braces = braces.saturating_sub(1),
            '>' if braces == 0 => {
                let self_closing = s[..i].ends_with('/');
                let props_end = if self_closing { i - 1 } else { i };
                return Some(TagClose {
                    props_end,
                    after: i + 1,
                    self_closing,
                });
            }
            _ => {}
        }
    }

    None
}
