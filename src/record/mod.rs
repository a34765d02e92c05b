//! Notice records and their deduplication key
//!
//! A `Record` is assembled from the list row, the detail view, the notice
//! modal and the contact popup. Only a record with a non-empty notice
//! number exists at all; every other field is optional.

mod field;
mod fingerprint;

pub use field::NoticeField;
pub use fingerprint::Fingerprint;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A partial set of field values
///
/// Empty and whitespace-only values are never stored, so a present field
/// always carries real data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeMap<NoticeField, String>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, ignoring it if it is blank
    pub fn insert(&mut self, field: NoticeField, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.0.insert(field, trimmed.to_string());
        }
    }

    pub fn get(&self, field: NoticeField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: NoticeField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NoticeField, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Copies values from `other` for fields this set does not have yet
    pub fn fill_missing(&mut self, other: &FieldSet) {
        for (field, value) in other.iter() {
            self.0
                .entry(field)
                .or_insert_with(|| value.to_string());
        }
    }

    /// Copies values from `other` for `fields`, replacing existing values
    pub fn override_with(&mut self, other: &FieldSet, fields: &[NoticeField]) {
        for field in fields {
            if let Some(value) = other.get(*field) {
                self.0.insert(*field, value.to_string());
            }
        }
    }
}

impl FromIterator<(NoticeField, String)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (NoticeField, String)>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for (field, value) in iter {
            set.insert(field, value);
        }
        set
    }
}

/// A collected procurement notice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    fields: FieldSet,
    pub source_page: u32,
    pub collected_at: DateTime<Utc>,
}

impl Record {
    /// Builds a record from merged fields
    ///
    /// Returns None when the notice number is missing, since such a record
    /// has no natural key.
    pub fn from_fields(fields: FieldSet, source_page: u32) -> Option<Self> {
        Self::with_timestamp(fields, source_page, Utc::now())
    }

    pub fn with_timestamp(
        fields: FieldSet,
        source_page: u32,
        collected_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !fields.contains(NoticeField::NoticeNumber) {
            return None;
        }
        Some(Self {
            fields,
            source_page,
            collected_at,
        })
    }

    pub fn notice_number(&self) -> &str {
        self.fields.get(NoticeField::NoticeNumber).unwrap_or_default()
    }

    pub fn notice_name(&self) -> Option<&str> {
        self.fields.get(NoticeField::NoticeName)
    }

    pub fn get(&self, field: NoticeField) -> Option<&str> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self.notice_number(), self.notice_name().unwrap_or_default())
    }

    /// Required fields this record lacks
    pub fn missing(&self, required: &[NoticeField]) -> Vec<NoticeField> {
        required
            .iter()
            .copied()
            .filter(|field| !self.fields.contains(*field))
            .collect()
    }

    /// Budget amount in won
    pub fn budget_amount(&self) -> Option<u64> {
        self.get(NoticeField::BudgetAmount).and_then(parse_amount)
    }

    /// Estimated price in won
    pub fn estimated_price(&self) -> Option<u64> {
        self.get(NoticeField::EstimatedPrice).and_then(parse_amount)
    }

    pub fn opening_date(&self) -> Option<NaiveDateTime> {
        self.get(NoticeField::OpeningDate).and_then(parse_datetime)
    }
}

/// Keeps only the digits of a money value ("1,234,000원" -> 1234000)
fn parse_amount(value: &str) -> Option<u64> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parses the site's date-time formats, with date-only values at midnight
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y/%m/%d %H:%M", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }
    for format in ["%Y/%m/%d", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
