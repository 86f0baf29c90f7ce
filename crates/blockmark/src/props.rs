//! Block attribute encoding and decoding.
//!
//! Parses and renders the `key="value"` attribute syntax carried on a block's
//! opening tag: `<Slug key="value" other='x' count={3}>`.

/// Insertion-ordered mapping of attribute name to value.
///
/// # Example
///
/// ```
/// use blockmark::PropsMap;
///
/// let props = PropsMap::decode(r#"title="Hello World" level='2'"#);
/// assert_eq!(props.get("title"), Some("Hello World"));
/// assert_eq!(props.get("level"), Some("2"));
/// assert_eq!(props.encode(), r#"title="Hello World" level="2""#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropsMap {
    entries: Vec<(String, String)>,
}

impl PropsMap {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute.
    ///
    /// Replacing an existing name keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Get an attribute value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse an attribute string.
    ///
    /// Accepts `key="value"` (with `\"`, `\\`, `\n` and `\r` escapes),
    /// `key='value'`, `key={expression}` and bare `key=value`. Malformed
    /// tokens are skipped.
    #[must_use]
    pub fn decode(props: &str) -> Self {
        let mut map = Self::new();
        let mut remaining = props.trim();

        while !remaining.is_empty() {
            remaining = remaining.trim_start();

            match parse_attribute(remaining) {
                Attribute::Parsed { key, value, rest } => {
                    map.insert(key, value);
                    remaining = rest;
                }
                Attribute::Skip(rest) => remaining = rest,
                Attribute::Unterminated => break,
            }
        }

        map
    }

    /// Render as an attribute string.
    ///
    /// Values are always double-quoted. An empty mapping renders as an empty
    /// string.
    #[must_use]
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!(r#"{key}="{}""#, escape_value(value)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropsMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for PropsMap {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Result of parsing one token.
enum Attribute<'a> {
    Parsed {
        key: &'a str,
        value: String,
        rest: &'a str,
    },
    /// Not an attribute; continue from `rest`.
    Skip(&'a str),
    /// A quoted value or expression never closes; nothing more can be read.
    Unterminated,
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '$')
}

/// Whether `name` can be written as an attribute name and read back unchanged.
pub(crate) fn is_attribute_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_key_char)
}

/// Parse a single attribute from the start of `s`.
fn parse_attribute(s: &str) -> Attribute<'_> {
    let key_end = s.find(|c: char| !is_key_char(c)).unwrap_or(s.len());

    if key_end == 0 {
        // Skip one unrecognized character
        let skip = s.chars().next().map_or(s.len(), char::len_utf8);
        return Attribute::Skip(&s[skip..]);
    }

    let key = &s[..key_end];
    let Some(after_eq) = s[key_end..].trim_start().strip_prefix('=') else {
        // Bare name without a value
        return Attribute::Skip(&s[key_end..]);
    };
    let after_eq = after_eq.trim_start();

    let parsed = if let Some(quoted) = after_eq.strip_prefix('"') {
        read_double_quoted(quoted)
    } else if let Some(quoted) = after_eq.strip_prefix('\'') {
        quoted
            .find('\'')
            .map(|end| (quoted[..end].to_owned(), &quoted[end + 1..]))
    } else if let Some(expr) = after_eq.strip_prefix('{') {
        read_expression(expr)
    } else {
        let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
        if end == 0 {
            return Attribute::Skip(after_eq);
        }
        Some((after_eq[..end].to_owned(), &after_eq[end..]))
    };

    match parsed {
        Some((value, rest)) => Attribute::Parsed { key, value, rest },
        None => Attribute::Unterminated,
    }
}

/// Read a double-quoted value; `s` starts after the opening quote.
fn read_double_quoted(s: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = s.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &s[i + 1..])),
            '\\' => match chars.next() {
                Some((_, next @ ('"' | '\\'))) => value.push(next),
                Some((_, 'n')) => value.push('\n'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, next)) => {
                    value.push('\\');
                    value.push(next);
                }
                None => value.push('\\'),
            },
            _ => value.push(c),
        }
    }

    None
}

/// Read a `{...}` expression; `s` starts after the opening brace.
///
/// Braces are balanced and quoted strings inside the expression are skipped.
fn read_expression(s: &str) -> Option<(String, &str)> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
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
            '"' | '\'' | '`' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((s[..i].trim().to_owned(), &s[i + 1..]));
                }
            }
            _ => {}
        }
    }

    None
}

/// Escape a value for a double-quoted attribute.
///
/// Line breaks are escaped too: an opening tag must stay on one line.
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '"' => escaped.push_str(r#"\""#),
            '\n' => escaped.push_str(r"\n"),
            '\r' => escaped.push_str(r"\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}
