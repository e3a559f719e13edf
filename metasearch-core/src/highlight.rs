//! Query highlighting inside provider-supplied HTML fragments.
//!
//! Fragments are parsed with [`scraper`] and re-serialized by walking the
//! tree. Only text leaves are searched; tag names, attribute values and
//! comments pass through untouched, and a match never spans two elements.
//! A fragment in which nothing matches is returned byte-for-byte.

use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Node};

use crate::types::SearchResult;

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text is raw: written verbatim and never marked.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "xmp",
];

/// Elements whose text is escaped but still shown literally, so never marked.
const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "title"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Markup,
    Escaped,
    Raw,
}

impl TextMode {
    fn for_element(name: &str) -> Self {
        if RAW_TEXT_ELEMENTS.contains(&name) {
            Self::Raw
        } else if ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&name) {
            Self::Escaped
        } else {
            Self::Markup
        }
    }
}

const MARK_OPEN: &str = "<mark>";
const MARK_CLOSE: &str = "</mark>";

/// A case-insensitive pattern derived from query text.
///
/// Every non-alphanumeric character of the query is dropped; the remaining
/// characters must appear in order, with any run of non-word characters or
/// underscores allowed between them. `"foo bar"` therefore matches
/// `"foobar"`, `"foo bar"` and `"foo-bar"` as single spans.
#[derive(Debug, Clone)]
pub struct HighlightPattern {
    regex: Regex,
}

impl HighlightPattern {
    /// Derive a pattern from query text.
    ///
    /// Returns `None` when the query has no alphanumeric characters; callers
    /// treat that as "highlight nothing".
    pub fn from_query(query: &str) -> Option<Self> {
        let stripped: Vec<String> = query
            .chars()
            .filter(|c| c.is_alphanumeric())
            .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
            .collect();
        if stripped.is_empty() {
            return None;
        }

        let source = stripped.join(r"[\W_]*");
        match RegexBuilder::new(&source).case_insensitive(true).build() {
            Ok(regex) => Some(Self { regex }),
            Err(e) => {
                tracing::warn!(error = %e, "highlight pattern rejected");
                None
            }
        }
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Wrap every match of `pattern` inside the text of `fragment` in `<mark>`.
///
/// Element boundaries are never moved, merged or dropped. If no text node
/// matches, the input is returned unchanged.
pub fn highlight(fragment: &str, pattern: &HighlightPattern) -> String {
    if fragment.is_empty() {
        return String::new();
    }

    let document = Html::parse_fragment(fragment);
    let mut out = String::with_capacity(fragment.len() + 32);
    let marks = write_children(document.root_element(), pattern, TextMode::Markup, &mut out);

    if marks == 0 {
        fragment.to_owned()
    } else {
        out
    }
}

/// Highlight a result's title and snippet in place.
///
/// Empty fields are left alone.
pub fn highlight_result(result: &mut SearchResult, pattern: &HighlightPattern) {
    if !result.title.is_empty() {
        result.title = highlight(&result.title, pattern);
    }
    if let Some(snippet) = result.snippet.as_mut().filter(|s| !s.is_empty()) {
        *snippet = highlight(snippet, pattern);
    }
}

/// Serialize the children of `element`, returning how many marks were inserted.
fn write_children(
    element: ElementRef<'_>,
    pattern: &HighlightPattern,
    mode: TextMode,
    out: &mut String,
) -> usize {
    let mut marks = 0;
    for child in element.children() {
        match child.value() {
            Node::Text(text) => match mode {
                TextMode::Markup => marks += write_text(text, pattern, out),
                TextMode::Escaped => escape_into(text, false, out),
                TextMode::Raw => out.push_str(text),
            },
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    marks += write_element(child_element, pattern, out);
                }
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            _ => {}
        }
    }
    marks
}

fn write_element(element: ElementRef<'_>, pattern: &HighlightPattern, out: &mut String) -> usize {
    let value = element.value();
    let name = value.name();

    out.push('<');
    out.push_str(name);
    for (attr, attr_value) in &value.attrs {
        out.push(' ');
        if let Some(prefix) = &attr.prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&attr.local);
        out.push_str("=\"");
        escape_into(attr_value, true, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return 0;
    }

    let marks = write_children(element, pattern, TextMode::for_element(name), out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
    marks
}

fn write_text(text: &str, pattern: &HighlightPattern, out: &mut String) -> usize {
    let mut marks = 0;
    let mut last = 0;
    for m in pattern.regex.find_iter(text) {
        escape_into(&text[last..m.start()], false, out);
        out.push_str(MARK_OPEN);
        escape_into(m.as_str(), false, out);
        out.push_str(MARK_CLOSE);
        last = m.end();
        marks += 1;
    }
    escape_into(&text[last..], false, out);
    marks
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
