//! Log sanitization for patient feature values.
//!
//! Raw form values (age, oxygen saturation, symptom flags) must never reach a
//! log sink. This module redacts:
//! - `NAME=value`, `NAME: value` and `"NAME": value` pairs for every schema field
//! - Debug renderings of whole feature vectors
//! - Email addresses and phone numbers that slip into free-text fields
//!
//! Field names and verdicts survive, so a log line still says which field
//! failed validation without saying what was entered.
//!
//! # Performance
//!
//! `sanitize()` caps the input size (see `LUNGRISK_SANITIZE_MAX_BYTES`).

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FEATURE_COLUMNS;

static PATTERNS: OnceLock<RedactionPatterns> = OnceLock::new();

/// Defaults to 16 KiB; override via `LUNGRISK_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const REDACTED: &str = "[REDACTED]";

struct Redaction {
    regex: Regex,
    replacement: String,
}

struct RedactionPatterns {
    set: RegexSet,
    rules: Vec<Redaction>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("LUNGRISK_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// `NAME<sep>value` for any schema field, quoted or not.
fn feature_pair_pattern() -> String {
    let names = FEATURE_COLUMNS
        .iter()
        .map(|f| regex::escape(f.as_str()))
        .collect::<Vec<_>>()
        .join("|");
    format!(r#"(?i)\b(?P<name>{names})\b(?P<sep>"?\s*[:=]\s*"?)(?P<value>[^\s",}}\]]+)"#)
}

fn get_patterns() -> &'static RedactionPatterns {
    PATTERNS.get_or_init(|| {
        let rules: Vec<(String, String)> = vec![
            (feature_pair_pattern(), format!("${{name}}${{sep}}{REDACTED}")),
            // FeatureRecord / Vec<f64> debug output
            (
                r"\b(?P<field>values|features|scaled)(?P<sep>\s*[:=]\s*)\[[^\]]*\]".to_string(),
                format!("${{field}}${{sep}}{REDACTED}"),
            ),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b"
                    .to_string(),
                "[REDACTED-EMAIL]".to_string(),
            ),
            (
                r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s][0-9]{3}[-.\s][0-9]{4}\b".to_string(),
                "[REDACTED-PHONE]".to_string(),
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| p.as_str())).expect("Valid regex set");
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| Redaction {
                regex: Regex::new(&pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        RedactionPatterns { set, rules }
    })
}

/// Redact feature values and contact details from a string.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let rule = &patterns.rules[idx];
        result = rule
            .regex
            .replace_all(&result, rule.replacement.as_str())
            .into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string carries anything [`sanitize`] would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes each formatted log
/// line before it reaches the underlying sink.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M: Clone> Clone for SanitizingMakeWriter<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A single line with no newline must not grow without bound.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}
