//! Verification code extraction from message text.
//!
//! Extraction runs in two stages. If the mailbox's platform has a
//! [`PlatformRule`](crate::rules::PlatformRule), its keyword gate is checked
//! against subject+body and its patterns are tried in priority order against
//! the cleaned body. Platforms known to use pure numeric codes never fall
//! back to generic patterns; everything else does.
//!
//! Every candidate — the first capture group of a match, with internal
//! separators stripped — must pass [`is_valid_code`] before it is accepted.
//!
//! # Example
//!
//! ```
//! use codewatch::extract::extract_code;
//! use codewatch::rules::RuleBook;
//!
//! let rules = RuleBook::with_defaults();
//! let code = extract_code(
//!     "Su código de inicio de sesión es 2 8 0 4.",
//!     "Código de Netflix",
//!     rules.get("netflix"),
//! );
//! assert_eq!(code.as_deref(), Some("2804"));
//! ```

use crate::rules::PlatformRule;
use crate::validate::{is_valid_code, strip_separators};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Generic fallback patterns, in priority order: labeled digit codes, labeled
/// alphanumeric codes, then a bare 4-8 digit run as last resort.
///
/// The alphanumeric pattern accepts letter-only captures; the validator
/// rejects any candidate without a digit, so the accepted set is unchanged.
static GENERIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:c[oó]digo|code|verification code|código de verificación)[:\s]+(\d{4,8})",
        r"(?i)(?:c[oó]digo|code|verification code)[:\s]+([A-Z0-9]{4,8})",
        r"\b(\d{4,8})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid generic pattern"))
    .collect()
});

/// Removes ASCII control characters that HTML-to-text conversion and broken
/// encodings leave behind (0x00-0x08, 0x0B-0x0C, 0x0E-0x1F, 0x7F).
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            !matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
        })
        .collect()
}

/// Returns `true` if at least one keyword appears in the text
/// (case-insensitive substring). An empty keyword list always passes.
fn contains_allowed_keyword(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

/// Extracts a verification code from a message body.
///
/// The subject participates in the keyword gate only; pattern matching runs
/// on the cleaned body. Returns `None` when the message is ineligible (gated
/// out by keywords) or when no candidate validates.
#[must_use]
pub fn extract_code(body: &str, subject: &str, rule: Option<&PlatformRule>) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    if let Some(rule) = rule {
        let gate_text = format!("{subject} {body}");
        if !contains_allowed_keyword(&gate_text, &rule.keywords) {
            debug!("message gated out: no allowed keyword in subject+body");
            return None;
        }
    }

    let cleaned = clean_text(body);

    if let Some(rule) = rule {
        if let Some(code) = extract_with_rule(&cleaned, rule) {
            return Some(code);
        }
        // Numeric-only platforms never fall back to generic patterns;
        // accepting alphanumeric junk there is worse than finding nothing.
        if rule.numeric_only {
            debug!("no valid code via platform patterns, generic fallback disabled");
            return None;
        }
    }

    extract_generic(&cleaned, rule)
}

/// Tries the platform's patterns in priority order, every match of each.
fn extract_with_rule(text: &str, rule: &PlatformRule) -> Option<String> {
    for (i, pattern) in rule.patterns.iter().enumerate() {
        for caps in pattern.captures_iter(text) {
            let Some(raw) = caps.get(1) else { continue };
            let candidate = strip_separators(raw.as_str());
            trace!(pattern = i, raw = raw.as_str(), %candidate, "platform pattern candidate");
            if is_valid_code(&candidate, Some(rule)) {
                debug!(pattern = i, %candidate, "platform pattern matched");
                return Some(candidate);
            }
        }
    }
    None
}

/// Tries the generic fallback patterns.
fn extract_generic(text: &str, rule: Option<&PlatformRule>) -> Option<String> {
    for (i, pattern) in GENERIC_PATTERNS.iter().enumerate() {
        for caps in pattern.captures_iter(text) {
            let Some(raw) = caps.get(1) else { continue };
            let candidate = raw.as_str().trim().to_string();
            if is_valid_code(&candidate, rule) {
                debug!(pattern = i, %candidate, "generic pattern matched");
                return Some(candidate);
            }
        }
    }
    None
}
