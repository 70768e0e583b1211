//! Format checks used for inline form feedback. Submission only requires the
//! fields to be non-empty.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9][0-9]{0,15}$").expect("valid phone regex"));

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Whitespace, dashes and parentheses are ignored.
pub fn validate_phone(phone: &str) -> bool {
    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();
    PHONE_RE.is_match(&compact)
}
