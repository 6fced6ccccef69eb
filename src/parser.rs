//! Internal module for parsing raw messages into structured fields.

use crate::error::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use mailparse::{parse_mail, MailHeaderMap};

/// Structured fields of one parsed mail item.
#[derive(Debug, Clone)]
pub(crate) struct ParsedEmail {
    pub subject: String,
    pub sender: String,
    pub recipient: Option<String>,
    pub body: String,
    pub date: DateTime<Utc>,
}

/// Parses a raw RFC 2822 message into structured fields.
///
/// A missing or unparseable `Date` header falls back to the current time, so
/// the message can still participate in latest-wins tracking.
pub(crate) fn parse_message(raw: &[u8]) -> Result<ParsedEmail> {
    let parsed = parse_mail(raw).map_err(|source| Error::ParseMail { source })?;

    let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();
    let sender = parsed.headers.get_first_value("From").unwrap_or_default();
    let recipient = parsed.headers.get_first_value("To");
    let date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
        .unwrap_or_else(Utc::now);

    let body = extract_body_text(&parsed).map_err(|source| Error::ExtractBody { source })?;

    Ok(ParsedEmail {
        subject,
        sender,
        recipient,
        body,
        date,
    })
}

/// Extracts text content from a parsed email, handling multipart messages.
///
/// Prefers `text/plain` over `text/html`; pattern matching works on either,
/// but plain text avoids markup noise around the code.
fn extract_body_text(
    parsed: &mailparse::ParsedMail<'_>,
) -> std::result::Result<String, mailparse::MailParseError> {
    if !parsed.subparts.is_empty() {
        if let Some(body) = find_part_body(parsed, "text/plain") {
            return Ok(body);
        }
        if let Some(body) = find_part_body(parsed, "text/html") {
            return Ok(body);
        }

        // No text parts found, descend into the first subpart
        if let Some(first_part) = parsed.subparts.first() {
            return extract_body_text(first_part);
        }
    }

    // Single part message or fallback
    parsed.get_body()
}

/// Depth-first search for the first part with the given MIME type.
fn find_part_body(parsed: &mailparse::ParsedMail<'_>, mimetype: &str) -> Option<String> {
    for part in &parsed.subparts {
        if part.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            if let Ok(body) = part.get_body() {
                return Some(body);
            }
        }
        if let Some(body) = find_part_body(part, mimetype) {
            return Some(body);
        }
    }
    None
}
