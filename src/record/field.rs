use serde::Serialize;
use std::fmt;

/// A named field of a procurement notice
///
/// The first five fields come from the list grid; the rest are only
/// reachable through the detail view, the notice modal or the contact
/// popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeField {
    NoticeNumber,
    NoticeName,
    Organization,
    AnnouncementDate,
    DeadlineDate,
    OpeningDate,
    BidDate,
    BudgetAmount,
    EstimatedPrice,
    BasePrice,
    BidMethod,
    SelectionMethod,
    Classification,
    DocumentNumber,
    OpeningLocation,
    ContactPerson,
    ContactDepartment,
    ContactPhone,
    ContactEmail,
    Notes,
}

impl NoticeField {
    /// Returns the snake_case name used in config files, exports and the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoticeNumber => "notice_number",
            Self::NoticeName => "notice_name",
            Self::Organization => "organization",
            Self::AnnouncementDate => "announcement_date",
            Self::DeadlineDate => "deadline_date",
            Self::OpeningDate => "opening_date",
            Self::BidDate => "bid_date",
            Self::BudgetAmount => "budget_amount",
            Self::EstimatedPrice => "estimated_price",
            Self::BasePrice => "base_price",
            Self::BidMethod => "bid_method",
            Self::SelectionMethod => "selection_method",
            Self::Classification => "classification",
            Self::DocumentNumber => "document_number",
            Self::OpeningLocation => "opening_location",
            Self::ContactPerson => "contact_person",
            Self::ContactDepartment => "contact_department",
            Self::ContactPhone => "contact_phone",
            Self::ContactEmail => "contact_email",
            Self::Notes => "notes",
        }
    }

    /// Parses a field from its snake_case name
    ///
    /// Returns None if the name doesn't match any known field.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .into_iter()
            .find(|field| field.as_str() == name.trim())
    }

    /// Returns all fields in export column order
    pub fn all() -> Vec<Self> {
        vec![
            Self::NoticeNumber,
            Self::NoticeName,
            Self::Organization,
            Self::AnnouncementDate,
            Self::DeadlineDate,
            Self::OpeningDate,
            Self::BidDate,
            Self::BudgetAmount,
            Self::EstimatedPrice,
            Self::BasePrice,
            Self::BidMethod,
            Self::SelectionMethod,
            Self::Classification,
            Self::DocumentNumber,
            Self::OpeningLocation,
            Self::ContactPerson,
            Self::ContactDepartment,
            Self::ContactPhone,
            Self::ContactEmail,
            Self::Notes,
        ]
    }

    /// Returns true if values of this field are expected to look like dates
    pub fn is_date_field(&self) -> bool {
        matches!(
            self,
            Self::AnnouncementDate | Self::DeadlineDate | Self::OpeningDate | Self::BidDate
        )
    }

    /// Fields read from the contact popup
    ///
    /// Popup values are authoritative for these and replace anything the
    /// detail view or modal produced.
    pub fn contact_fields() -> &'static [Self] {
        &[Self::ContactPhone, Self::ContactEmail]
    }
}

impl fmt::Display for NoticeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
