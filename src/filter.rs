//! Sender eligibility filtering.
//!
//! Runs before any pattern matching: a message from the wrong sender is never
//! considered for a mailbox, even if it is chronologically the newest in the
//! fetch window.

use crate::rules::PlatformRule;

/// Decides whether a message sender is eligible for a mailbox's platform.
///
/// - With a rule that lists senders, the sender display string must contain
///   one of them (case-insensitive substring).
/// - With a platform label but no rule (or a rule without senders), the
///   sender must contain the label itself.
/// - Without a platform label, every sender is eligible.
///
/// # Example
///
/// ```
/// use codewatch::filter::sender_is_allowed;
/// use codewatch::rules::RuleBook;
///
/// let rules = RuleBook::with_defaults();
/// let netflix = rules.get("netflix");
///
/// assert!(sender_is_allowed(
///     "Netflix <info@account.netflix.com>",
///     Some("netflix"),
///     netflix,
/// ));
/// assert!(!sender_is_allowed(
///     "Promo <deals@shopping.example>",
///     Some("netflix"),
///     netflix,
/// ));
/// ```
#[must_use]
pub fn sender_is_allowed(
    sender: &str,
    platform: Option<&str>,
    rule: Option<&PlatformRule>,
) -> bool {
    let sender = sender.to_lowercase();

    if let Some(rule) = rule {
        if !rule.senders.is_empty() {
            return rule.senders.iter().any(|s| sender.contains(&s.to_lowercase()));
        }
    }

    match platform {
        Some(label) => sender.contains(&label.to_lowercase()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleBook;

    #[test]
    fn test_rule_sender_list_is_authoritative() {
        let rules = RuleBook::with_defaults();
        let rule = rules.get("netflix");

        assert!(sender_is_allowed(
            "info@mailer.netflix.com",
            Some("netflix"),
            rule
        ));
        // Sender contains the platform name but is not in the allowed list
        assert!(!sender_is_allowed(
            "phishing@netflix.fake.example",
            Some("netflix"),
            rule
        ));
    }

    #[test]
    fn test_sender_match_is_case_insensitive() {
        let rules = RuleBook::with_defaults();
        assert!(sender_is_allowed(
            "Disney+ <DisneyPlus@Mail.DisneyPlus.com>",
            Some("disney"),
            rules.get("disney")
        ));
    }

    #[test]
    fn test_platform_label_fallback_without_rule() {
        assert!(sender_is_allowed(
            "no-reply@paramount.example",
            Some("paramount"),
            None
        ));
        assert!(!sender_is_allowed(
            "no-reply@other.example",
            Some("paramount"),
            None
        ));
    }

    #[test]
    fn test_no_platform_accepts_everyone() {
        assert!(sender_is_allowed("anyone@anywhere.example", None, None));
    }
}
