//! Value cleaning and plausibility checks
//!
//! A value that fails `validate_field_value` is treated exactly like a
//! strategy that found nothing, so the fallback chain moves on.

use crate::record::NoticeField;
use regex::Regex;
use std::sync::OnceLock;

/// Labels that look like field labels but belong to the search filter or
/// grid controls
pub const BLACKLISTED_LABELS: &[&str] = &["공고처리상태", "검색", "정렬", "보기"];

const MAX_OPENING_DATE_LEN: usize = 50;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}[/-]\d{2}[/-]\d{2}").expect("date regex is valid"))
}

fn date_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4}[/-]\d{2}[/-]\d{2})\s*(\d{2}:\d{2})").expect("date-time regex is valid")
    })
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}:\d{2}").expect("time regex is valid"))
}

/// Collapses whitespace and strips leading/trailing colons
pub fn clean_text(text: &str) -> String {
    let collapsed = whitespace_re().replace_all(text, " ");
    collapsed
        .trim_matches(|c: char| c == ':' || c.is_whitespace())
        .to_string()
}

/// Normalizes a label for matching: cleaned, with inner spaces removed
pub fn normalize_label(text: &str) -> String {
    clean_text(text).chars().filter(|c| !c.is_whitespace()).collect()
}

/// Returns true if `candidate` is a label for one of `labels`
///
/// Exact matches and labels contained in the candidate both count
/// ("개찰일시(예정)" matches "개찰일시"). Blacklisted labels never match.
pub fn label_matches<S: AsRef<str>>(candidate: &str, labels: &[S]) -> bool {
    let candidate = normalize_label(candidate);
    if candidate.is_empty() {
        return false;
    }
    if BLACKLISTED_LABELS.iter().any(|b| candidate.contains(b)) {
        return false;
    }
    labels.iter().any(|label| {
        let label = normalize_label(label.as_ref());
        !label.is_empty() && candidate.contains(&label)
    })
}

/// Reduces calendar-widget noise around an opening date to `YYYY/MM/DD HH:MM`
pub fn clean_opening_date(text: &str) -> String {
    if let Some(caps) = date_time_re().captures(text) {
        return format!("{} {}", &caps[1], &caps[2]);
    }

    if let (Some(date), Some(time)) = (date_re().find(text), time_re().find(text)) {
        return format!("{} {}", date.as_str(), time.as_str());
    }

    text.to_string()
}

/// Returns true if `value` is plausible for `field`
pub fn validate_field_value(field: NoticeField, value: &str) -> bool {
    let value = value.trim();

    if value.chars().count() < 2 {
        return false;
    }

    if field == NoticeField::OpeningDate && value.chars().count() > MAX_OPENING_DATE_LEN {
        return false;
    }

    if !field.is_date_field() && date_re().is_match(value) {
        return false;
    }

    match field {
        NoticeField::ContactPhone => value.chars().any(|c| c.is_ascii_digit()),
        NoticeField::ContactEmail => value.contains('@'),
        _ => true,
    }
}

/// Cleans and validates a raw value, returning it only if it is usable
pub fn accept_value(field: NoticeField, raw: &str) -> Option<String> {
    let mut value = clean_text(raw);
    if field == NoticeField::OpeningDate {
        value = clean_opening_date(&value);
    }
    validate_field_value(field, &value).then_some(value)
}
