//! Per-platform extraction rules.
//!
//! Verification emails from streaming services follow platform-specific
//! conventions: known sender addresses, a small vocabulary of subjects, and
//! characteristic ways of formatting the code (labeled, visually spaced out,
//! or bare digits). A [`PlatformRule`] captures those conventions; a
//! [`RuleBook`] maps lowercased platform labels to rules.
//!
//! New platforms are added by registering data, not by branching code:
//!
//! ```
//! use codewatch::rules::{PlatformRule, RuleBook};
//!
//! let mut rules = RuleBook::with_defaults();
//! rules.register(
//!     "prime",
//!     PlatformRule::numeric(&["account-update@primevideo.com"], &[r"\b(\d{6})\b"], &[6]),
//! );
//! assert!(rules.get("PRIME").is_some());
//! ```

use regex::Regex;
use std::collections::HashMap;

/// Extraction rule for one platform.
///
/// Immutable for the process lifetime once registered in a [`RuleBook`].
#[derive(Debug, Clone)]
pub struct PlatformRule {
    /// Allowed sender address fragments (case-insensitive substring match).
    pub senders: Vec<String>,
    /// Keyword gate: if non-empty, at least one keyword must appear in
    /// subject+body (case-insensitive) before any pattern is tried.
    pub keywords: Vec<String>,
    /// Extraction patterns in priority order. The first capture group of each
    /// match is the candidate code.
    pub patterns: Vec<Regex>,
    /// Whether this platform only ever sends pure numeric codes.
    pub numeric_only: bool,
    /// Accepted code lengths after separator stripping. Empty means any.
    pub code_lengths: Vec<usize>,
}

impl PlatformRule {
    /// Builds a numeric-only rule without a keyword gate.
    ///
    /// Most platforms fit this shape: a fixed sender list, one or more digit
    /// patterns, and a known code length.
    ///
    /// # Panics
    ///
    /// Panics if any pattern is not a valid regex. Rules are static
    /// configuration; an invalid pattern is a programming error.
    #[must_use]
    pub fn numeric(senders: &[&str], patterns: &[&str], code_lengths: &[usize]) -> Self {
        Self {
            senders: senders.iter().map(ToString::to_string).collect(),
            keywords: Vec::new(),
            patterns: compile_patterns(patterns),
            numeric_only: true,
            code_lengths: code_lengths.to_vec(),
        }
    }

    /// Adds a keyword gate to the rule.
    #[must_use]
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(ToString::to_string).collect();
        self
    }
}

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid platform pattern"))
        .collect()
}

/// Registry of platform rules keyed by lowercased label.
///
/// # Example
///
/// ```
/// use codewatch::rules::RuleBook;
///
/// let rules = RuleBook::with_defaults();
/// assert!(rules.get("netflix").is_some());
/// assert!(rules.get("Netflix").is_some()); // labels are case-insensitive
/// assert!(rules.get("unknown").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleBook {
    rules: HashMap<String, PlatformRule>,
}

impl RuleBook {
    /// Creates an empty rule book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a rule book with the built-in platform rules.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut book = Self::new();
        book.register("netflix", netflix_rule());
        book.register(
            "disney",
            PlatformRule::numeric(&["disneyplus@mail.disneyplus.com"], &[r"\b(\d{6})\b"], &[6]),
        );
        book.register(
            "hbo",
            PlatformRule::numeric(&["no-reply@hbomax.com"], &[r"\b(\d{6})\b"], &[6]),
        );
        book
    }

    /// Registers (or replaces) a rule under the given platform label.
    pub fn register(&mut self, label: impl AsRef<str>, rule: PlatformRule) {
        self.rules.insert(label.as_ref().to_lowercase(), rule);
    }

    /// Looks up a rule by platform label (case-insensitive).
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&PlatformRule> {
        self.rules.get(&label.to_lowercase())
    }

    /// Looks up a rule for an optional platform label.
    #[must_use]
    pub fn for_platform(&self, label: Option<&str>) -> Option<&PlatformRule> {
        label.and_then(|l| self.get(l))
    }

    /// Returns the number of registered platforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no platforms are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Netflix sends its codes labeled, visually spaced out for legibility, or
/// bare, so the rule carries three patterns in decreasing specificity. The
/// keyword gate keeps marketing mail from the same senders out of the
/// candidate set.
fn netflix_rule() -> PlatformRule {
    PlatformRule::numeric(
        &["info@account.netflix.com", "info@mailer.netflix.com"],
        &[
            // "código"/"code" label followed by digits, possibly separated
            r"(?i)(?:c[oó]digo|code|verification\s*code)[:\s]*([0-9][\s\x{A0}]*[0-9][\s\x{A0}]*[0-9][\s\x{A0}]*[0-9](?:[\s\x{A0}]*[0-9])*)",
            // digits spaced out with whitespace/NBSP/tabs (4+ digits)
            r"(?i)(?:^|[^a-záéíóúñ])([0-9][\s\x{A0}\t]+[0-9][\s\x{A0}\t]+[0-9][\s\x{A0}\t]+[0-9](?:[\s\x{A0}\t]+[0-9])*)(?:[^0-9]|$)",
            // bare 4-8 digit run, last resort
            r"\b(\d{4,8})\b",
        ],
        &[4, 6, 8],
    )
    .with_keywords(&[
        "login",
        "sesión",
        "sesion",
        "restablecer",
        "password",
        "contraseña",
        "hogar",
        "household",
        "ubicación",
        "red wifi",
        "actualizar",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_known_platforms() {
        let rules = RuleBook::with_defaults();
        assert_eq!(rules.len(), 3);
        for label in ["netflix", "disney", "hbo"] {
            assert!(rules.get(label).is_some(), "missing rule for {label}");
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let rules = RuleBook::with_defaults();
        assert!(rules.get("NETFLIX").is_some());
        assert!(rules.get("Disney").is_some());
        assert!(rules.for_platform(Some("hBo")).is_some());
        assert!(rules.for_platform(None).is_none());
    }

    #[test]
    fn test_netflix_rule_shape() {
        let rules = RuleBook::with_defaults();
        let netflix = rules.get("netflix").unwrap();
        assert!(netflix.numeric_only);
        assert_eq!(netflix.code_lengths, vec![4, 6, 8]);
        assert_eq!(netflix.patterns.len(), 3);
        assert!(!netflix.keywords.is_empty());
        assert_eq!(netflix.senders.len(), 2);
    }

    #[test]
    fn test_register_custom_platform() {
        let mut rules = RuleBook::new();
        assert!(rules.is_empty());

        rules.register(
            "Prime",
            PlatformRule::numeric(&["no-reply@primevideo.com"], &[r"\b(\d{6})\b"], &[6]),
        );

        let rule = rules.get("prime").expect("registered under lowercase key");
        assert_eq!(rule.senders, vec!["no-reply@primevideo.com"]);
        assert!(rule.keywords.is_empty());
    }

    #[test]
    fn test_register_overrides_builtin() {
        let mut rules = RuleBook::with_defaults();
        rules.register(
            "disney",
            PlatformRule::numeric(&["custom@disney.example"], &[r"\b(\d{4})\b"], &[4]),
        );
        assert_eq!(rules.get("disney").unwrap().code_lengths, vec![4]);
    }
}
