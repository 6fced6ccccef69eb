//! Candidate code validation.
//!
//! Regex extraction over email bodies produces false positives: years from
//! dates, round marketing numbers, and short natural-language words that a
//! loose pattern happens to capture. [`is_valid_code`] is the single gate
//! every candidate passes through before it is accepted as a verification
//! code. It is a pure function and has no dependency on IMAP or network code.

use crate::rules::PlatformRule;
use regex::Regex;
use std::sync::LazyLock;

/// Minimum accepted code length after trimming.
const MIN_CODE_LEN: usize = 4;

/// 4-digit years in the 2000s, a common false positive from dates in bodies.
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^20\d{2}$").expect("valid year pattern"));

/// Round numbers that show up in marketing copy and are never codes.
const COMMON_GENERIC_NUMBERS: &[&str] = &[
    "1000", "2000", "3000", "4000", "5000", "1234", "4321", "0000",
];

/// Natural-language words (mostly Spanish) that loose patterns mis-capture,
/// plus platform names.
const BLACKLIST_WORDS: &[&str] = &[
    "para",
    "inicio",
    "sesion",
    "login",
    "enlace",
    "click",
    "haga",
    "este",
    "tiene",
    "donde",
    "esta",
    "está",
    "pero",
    "como",
    "pueden",
    "será",
    "sera",
    "nuevo",
    "cuenta",
    "aqui",
    "aquí",
    "desde",
    "ahora",
    "más",
    "mas",
    "información",
    "informacion",
    "ayuda",
    "servicio",
    "usar",
    "dispositivo",
    "puede",
    "hacer",
    "netflix",
    "disney",
    "correo",
    "email",
];

/// Strips the separators emails insert inside spaced-out codes:
/// whitespace, non-breaking space (U+00A0), and tabs.
pub(crate) fn strip_separators(candidate: &str) -> String {
    candidate
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect()
}

/// Decides whether a candidate string is an acceptable verification code.
///
/// Checks are applied in order; any failure rejects:
///
/// 1. trimmed length must be at least 4
/// 2. numeric-only platforms: the separator-stripped value must be pure
///    digits and, if the rule constrains lengths, of an accepted length
/// 3. not a 4-digit year in the 2000s
/// 4. not a common round number
/// 5. not a blacklisted natural-language word
/// 6. not purely alphabetic; must contain at least one digit
///
/// # Example
///
/// ```
/// use codewatch::validate::is_valid_code;
///
/// assert!(is_valid_code("482913", None));
/// assert!(!is_valid_code("2024", None)); // year
/// assert!(!is_valid_code("para", None)); // blacklisted word
/// assert!(!is_valid_code("123", None)); // too short
/// ```
#[must_use]
pub fn is_valid_code(candidate: &str, rule: Option<&PlatformRule>) -> bool {
    let trimmed = candidate.trim();
    let lower = trimmed.to_lowercase();

    if trimmed.chars().count() < MIN_CODE_LEN {
        return false;
    }

    if let Some(rule) = rule {
        if rule.numeric_only {
            let stripped = strip_separators(trimmed);
            if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
                return false;
            }
            if !rule.code_lengths.is_empty() && !rule.code_lengths.contains(&stripped.len()) {
                return false;
            }
        }
    }

    if YEAR_PATTERN.is_match(trimmed) {
        return false;
    }

    if COMMON_GENERIC_NUMBERS.contains(&trimmed) {
        return false;
    }

    if BLACKLIST_WORDS.contains(&lower.as_str()) {
        return false;
    }

    if trimmed.chars().all(char::is_alphabetic) {
        return false;
    }

    // A real code always carries at least one digit.
    trimmed.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::PlatformRule;

    fn numeric_rule(lengths: &[usize]) -> PlatformRule {
        PlatformRule::numeric(&[], &[r"\b(\d{4,8})\b"], lengths)
    }

    #[test]
    fn test_accepts_plain_numeric_codes() {
        for code in ["2804", "482913", "12345678"] {
            assert!(is_valid_code(code, None), "{code} should be valid");
        }
    }

    #[test]
    fn test_rejects_short_candidates() {
        assert!(!is_valid_code("123", None));
        assert!(!is_valid_code("  42  ", None));
        assert!(!is_valid_code("", None));
    }

    #[test]
    fn test_rejects_years() {
        for year in ["2000", "2024", "2026", "2099"] {
            assert!(!is_valid_code(year, None), "{year} should be rejected");
        }
        // 1999 is not a 2000s year; it passes the year check
        assert!(is_valid_code("1999", None));
    }

    #[test]
    fn test_rejects_common_generic_numbers() {
        for n in COMMON_GENERIC_NUMBERS {
            assert!(!is_valid_code(n, None), "{n} should be rejected");
        }
    }

    #[test]
    fn test_rejects_blacklisted_words() {
        for word in ["para", "PARA", "login", "Netflix", "información"] {
            assert!(!is_valid_code(word, None), "{word} should be rejected");
        }
    }

    #[test]
    fn test_rejects_purely_alphabetic() {
        assert!(!is_valid_code("abcdef", None));
        assert!(!is_valid_code("código", None));
    }

    #[test]
    fn test_accepts_alphanumeric_without_rule() {
        assert!(is_valid_code("A1B2C3", None));
        assert!(is_valid_code("XK42ZP", None));
    }

    #[test]
    fn test_numeric_only_rejects_alphanumeric() {
        let rule = numeric_rule(&[6]);
        assert!(!is_valid_code("A1B2C3", Some(&rule)));
        assert!(is_valid_code("123456", Some(&rule)));
    }

    #[test]
    fn test_numeric_only_length_constraint() {
        let rule = numeric_rule(&[4, 6, 8]);
        assert!(is_valid_code("2804", Some(&rule)));
        assert!(is_valid_code("987654", Some(&rule)));
        assert!(is_valid_code("98765432", Some(&rule)));
        assert!(!is_valid_code("98765", Some(&rule)));
        assert!(!is_valid_code("9876543", Some(&rule)));
    }

    #[test]
    fn test_empty_length_set_accepts_any_numeric_length() {
        let rule = numeric_rule(&[]);
        assert!(is_valid_code("98765", Some(&rule)));
    }

    #[test]
    fn test_separator_stripping_before_numeric_check() {
        let rule = numeric_rule(&[6]);
        // NBSP-separated digits count as a 6-digit numeric code
        assert!(is_valid_code("1\u{a0}2\u{a0}3\u{a0}4\u{a0}5\u{a0}6", Some(&rule)));
        assert!(is_valid_code("1 2 3 4 5 6", Some(&rule)));
        assert!(is_valid_code("1\t2\t3\t4\t5\t6", Some(&rule)));
    }

    #[test]
    fn test_strip_separators() {
        assert_eq!(strip_separators("1 2\t3\u{a0}4"), "1234");
        assert_eq!(strip_separators("987654"), "987654");
    }
}
