//! # SQL Extraction
//!
//! Turns raw model output into a single SQL statement. Models wrap their SQL in
//! markdown fences, prepend a sentence, or append an explanation, so extraction
//! is a staged text filter rather than a SQL parser:
//!
//! 1. take the interior of a ```` ```sql ```` block if there is one,
//! 2. otherwise drop all fence markers and stray backticks,
//! 3. cut at the first narrative marker (`explanation`, `example`, ...),
//! 4. drop blank and full-line comment lines,
//! 5. cut after the last `;`,
//! 6. trim, and give up unless some line opens with a statement keyword.
//!
//! Every stage is a plain function so it can be tested on its own.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static SQL_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```sql\s*(.*?)```").unwrap());

/// Any fenced block: group 1 is the first-line word (a language tag or the
/// start of the SQL itself), group 2 the rest of the body.
static ANY_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:([A-Za-z0-9_+-]*)[ \t]*\r?\n)?(.*?)```").unwrap()
});

static NARRATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(explanation|assumption|example|schema|structure)\b").unwrap()
});

const STATEMENT_KEYWORDS: &str = "select|with|insert|update|delete|create|drop|alter|truncate";

/// A line that opens with a statement keyword. Prose that merely mentions
/// one ("I cannot create a query...") does not count.
static STATEMENT_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?im)^[ \t]*\(?[ \t]*({STATEMENT_KEYWORDS})\b")).unwrap()
});

static KEYWORD_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^({STATEMENT_KEYWORDS})$")).unwrap());

/// Extracts a single SQL statement from raw model output.
///
/// Never fails: an empty string means no usable SQL could be isolated.
pub fn extract_sql(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let candidate = match fenced_sql_block(raw) {
        Some(block) => block.to_string(),
        None => strip_fences(raw),
    };
    let candidate = truncate_at_narrative(&candidate);
    let candidate = drop_noise_lines(candidate);
    let candidate = truncate_at_terminator(candidate.trim());
    let candidate = candidate.trim();

    if !has_statement_keyword(candidate) {
        debug!("No SQL statement keyword left after cleaning model output.");
        return String::new();
    }
    candidate.to_string()
}

/// Returns the interior of the first ```` ```sql ```` block (label is case-insensitive).
pub fn fenced_sql_block(raw: &str) -> Option<&str> {
    SQL_FENCE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Removes fence markers (keeping block contents) and any leftover backticks.
///
/// A first-line word is dropped as a language tag unless it is itself a
/// statement keyword, as in ```` ```SELECT\n* FROM t;``` ````.
pub fn strip_fences(raw: &str) -> String {
    ANY_FENCE_RE
        .replace_all(raw, |caps: &Captures| {
            let body = caps.get(2).map_or("", |m| m.as_str());
            match caps.get(1).map(|m| m.as_str()) {
                Some(word) if KEYWORD_ONLY_RE.is_match(word) => format!("{word}\n{body}"),
                _ => body.to_string(),
            }
        })
        .replace('`', "")
}

/// Cuts the text at the first narrative marker word.
pub fn truncate_at_narrative(text: &str) -> &str {
    match NARRATIVE_RE.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

/// Drops blank lines and lines starting with `--` or `#`, joining the rest with `\n`.
pub fn drop_noise_lines(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.is_empty() || trimmed.starts_with("--") || trimmed.starts_with('#'))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keeps everything up to and including the last `;`, if there is one.
pub fn truncate_at_terminator(text: &str) -> &str {
    match text.rfind(';') {
        Some(idx) => &text[..=idx],
        None => text,
    }
}

fn has_statement_keyword(text: &str) -> bool {
    STATEMENT_KEYWORD_RE.is_match(text)
}
