//! Plain-terminal rendering of result groups.
//!
//! Result titles and snippets are HTML fragments. Tags are dropped, and
//! highlighter marks become terminal emphasis (or `*asterisks*` when color
//! is off).

use std::fmt::Write as _;

use chrono::{FixedOffset, TimeZone};
use metasearch_core::{ProviderDescriptor, ResultGroup, SortMode, rank};
use scraper::{ElementRef, Html, Node};

const EMPHASIS_ON: &str = "\x1b[1;33m";
const EMPHASIS_OFF: &str = "\x1b[0m";

/// Visible characters kept from a snippet.
const SNIPPET_CHARS: usize = 240;

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "blockquote", "br", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "li", "ol", "p", "pre", "table", "td", "th", "tr", "ul",
];

struct TextWriter {
    out: String,
    remaining: Option<usize>,
    truncated: bool,
    color: bool,
}

impl TextWriter {
    fn text(&mut self, text: &str) {
        for c in text.chars() {
            match self.remaining {
                Some(0) => {
                    self.truncated = true;
                    return;
                }
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            self.out.push(c);
        }
    }

    fn children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            if self.truncated {
                return;
            }
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(value) => {
                    let name = value.name();
                    if matches!(name, "script" | "style") {
                        continue;
                    }
                    let Some(child_element) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if name == "mark" {
                        self.out.push_str(if self.color { EMPHASIS_ON } else { "*" });
                        self.children(child_element);
                        self.out.push_str(if self.color { EMPHASIS_OFF } else { "*" });
                    } else if BLOCK_ELEMENTS.contains(&name) {
                        self.out.push(' ');
                        self.children(child_element);
                        self.out.push(' ');
                    } else {
                        self.children(child_element);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Render an HTML fragment as one line of terminal text.
///
/// `limit` caps the number of visible characters; a truncated line ends in `…`.
pub fn fragment_to_terminal(fragment: &str, color: bool, limit: Option<usize>) -> String {
    let document = Html::parse_fragment(fragment);
    let mut writer = TextWriter {
        out: String::with_capacity(fragment.len()),
        remaining: limit,
        truncated: false,
        color,
    };
    writer.children(document.root_element());

    let mut line = writer.out.split_whitespace().collect::<Vec<_>>().join(" ");
    if writer.truncated {
        line.push('…');
    }
    line
}

/// The zone result dates are shown in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateZone {
    /// The machine's local zone.
    #[default]
    Local,
    /// A fixed UTC offset such as `-05:00`.
    Fixed(FixedOffset),
}

impl DateZone {
    /// Parse an offset like `+02:00` or `-0500`.
    pub fn parse(offset: &str) -> Option<Self> {
        offset.trim().parse::<FixedOffset>().ok().map(Self::Fixed)
    }
}

/// How groups are drawn in the terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStyle {
    /// ANSI emphasis for highlights; `*asterisks*` otherwise.
    pub color: bool,
    /// Zone for calendar dates.
    pub zone: DateZone,
}

/// Format a Unix timestamp as e.g. `November 20, 2017` in `tz`.
pub fn format_date_in<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.with_timezone(tz).format("%B %-d, %Y").to_string())
}

/// Format a Unix timestamp as a calendar date in `zone`.
pub fn format_date(timestamp: i64, zone: DateZone) -> Option<String> {
    match zone {
        DateZone::Local => format_date_in(timestamp, &chrono::Local),
        DateZone::Fixed(offset) => format_date_in(timestamp, &offset),
    }
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
/// 365.25 days.
const YEAR: u64 = 31_557_600;
const MONTH: u64 = YEAR / 12;

/// Describe how long ago `timestamp` was, relative to `now`: `3 days ago`,
/// `1 week ago`, or `in 2 hours` for future times.
pub fn relative_age(timestamp: i64, now: i64) -> String {
    let diff = now.saturating_sub(timestamp);
    let seconds = diff.unsigned_abs();
    if seconds < 10 {
        return if diff < 0 { "right now" } else { "just now" }.to_owned();
    }

    let (count, unit) = match seconds {
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < WEEK => (s / DAY, "day"),
        s if s < MONTH => (s / WEEK, "week"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };
    let plural = if count == 1 { "" } else { "s" };
    if diff < 0 {
        format!("in {count} {unit}{plural}")
    } else {
        format!("{count} {unit}{plural} ago")
    }
}

/// Render one published group: a header line, then its results in `mode` order.
pub fn render_group(
    group: &ResultGroup,
    descriptor: Option<&ProviderDescriptor>,
    mode: SortMode,
    style: RenderStyle,
) -> String {
    render_group_at(group, descriptor, mode, style, chrono::Utc::now().timestamp())
}

/// [`render_group`] with ages measured from `now` (Unix seconds).
pub fn render_group_at(
    group: &ResultGroup,
    descriptor: Option<&ProviderDescriptor>,
    mode: SortMode,
    style: RenderStyle,
    now: i64,
) -> String {
    let color = style.color;
    let name = descriptor.map_or(group.provider_id.as_str(), |d| d.name.as_str());
    let count = match group.results.len() {
        0 => "no results".to_owned(),
        1 => "1 result".to_owned(),
        n => format!("{n} results"),
    };
    // Precision loss is irrelevant for display.
    #[allow(clippy::cast_precision_loss)]
    let seconds = group.elapsed_ms as f64 / 1000.0;

    let mut out = String::new();
    let _ = writeln!(out, "{name}: {count} ({seconds:.2}s)");

    for (index, result) in rank(&group.results, mode).into_iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}",
            index + 1,
            fragment_to_terminal(&result.title, color, None)
        );
        let _ = writeln!(out, "     {}", result.url);
        if let Some(snippet) = result.snippet.as_deref() {
            let line = fragment_to_terminal(snippet, color, Some(SNIPPET_CHARS));
            if !line.is_empty() {
                let _ = writeln!(out, "     {line}");
            }
        }
        if let Some(modified) = result.modified {
            if let Some(date) = format_date(modified, style.zone) {
                let _ = writeln!(out, "     Modified {date} ({})", relative_age(modified, now));
            }
        }
        if let Some(comments) = &result.comments {
            for comment in comments {
                let body = fragment_to_terminal(&comment.body, color, Some(SNIPPET_CHARS));
                let _ = writeln!(out, "     > {}: {body}", comment.author);
            }
        }
    }
    out
}
