//! Turning a free-text completion into a single search keyword.
//!
//! The "one bare keyword" contract lives only in the prompt wording, so
//! the reply is parsed defensively:
//! 1. Trim surrounding whitespace
//! 2. Keep the first non-empty line (later lines are dropped with a warning)
//! 3. Drop a leading `Keyword:` / `Title:` label
//! 4. Strip matching wrapping quotes and a trailing period
//!
//! An empty result is a decode failure of the completion.

use domain::{ClientError, ClientResult, Keyword};
use tracing::warn;

const QUOTE_PAIRS: [(char, char); 6] = [
    ('"', '"'),
    ('\'', '\''),
    ('“', '”'),
    ('‘', '’'),
    ('「', '」'),
    ('『', '』'),
];

const LABELS: [&str; 2] = ["keyword", "title"];

/// Parse a raw completion into a keyword
pub fn parse_keyword(raw: &str) -> ClientResult<Keyword> {
    let mut lines = raw.lines().map(str::trim).filter(|line| !line.is_empty());

    let first = lines
        .next()
        .ok_or_else(|| ClientError::Decode("completion was empty".into()))?;

    let dropped = lines.count();
    if dropped > 0 {
        warn!("Completion had {} extra line(s); using only the first", dropped);
    }

    // A period may sit on either side of the closing quote
    let cleaned = trim_period(strip_quotes(trim_period(strip_label(first))));

    Keyword::new(cleaned).ok_or_else(|| {
        ClientError::Decode(format!("completion {:?} did not contain a keyword", raw))
    })
}

fn strip_label(line: &str) -> &str {
    if let Some((label, rest)) = line.split_once(':') {
        if LABELS.contains(&label.trim().to_lowercase().as_str()) {
            return rest.trim();
        }
    }
    line
}

/// `!` and `?` are kept: they belong to titles like "Airplane!"
fn trim_period(text: &str) -> &str {
    text.trim_end_matches(['.', '。']).trim_end()
}

fn strip_quotes(text: &str) -> &str {
    for (open, close) in QUOTE_PAIRS {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            return inner.trim();
        }
    }
    text
}
