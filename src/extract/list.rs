//! List grid parsing
//!
//! Turns a rendered list page into candidate rows in document order.

use crate::config::SiteLayout;
use crate::extract::validate::clean_text;
use crate::record::{FieldSet, Fingerprint, NoticeField};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// One row of the list grid
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// 0-based position among the grid rows
    pub index: usize,
    /// 1-based `nth-of-type` position among the row's same-tag siblings,
    /// used to click the row
    pub row_position: usize,
    pub fields: FieldSet,
}

impl Candidate {
    pub fn notice_number(&self) -> &str {
        self.fields
            .get(NoticeField::NoticeNumber)
            .unwrap_or_default()
    }

    pub fn notice_name(&self) -> &str {
        self.fields.get(NoticeField::NoticeName).unwrap_or_default()
    }

    /// Dedup key of the row, known before any navigation
    ///
    /// A row without a name cell hashes with an empty name, whatever name
    /// the detail view later shows.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self.notice_number(), self.notice_name())
    }
}

/// Parsed list page
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub candidates: Vec<Candidate>,
    /// Page number the pagination control marks as current
    pub selected_page: Option<u32>,
}

fn parse_selector(locator: &str) -> Option<Selector> {
    Selector::parse(locator).ok()
}

/// `nth-of-type` position of `row`: same-tag element siblings before it, plus one
fn type_position(row: &ElementRef<'_>) -> usize {
    let tag = row.value().name();
    let preceding = row
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == tag)
        .count();
    preceding + 1
}

fn cell_text(row: &ElementRef<'_>, selector: &Option<Selector>) -> Option<String> {
    let selector = selector.as_ref()?;
    row.select(selector)
        .next()
        .map(|cell| clean_text(&cell.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

/// Parses every grid row into a candidate
///
/// Rows without a notice number (placeholder or "no results" rows) are
/// dropped, but the remaining candidates keep their grid position.
pub fn parse_list_page(html: &str, layout: &SiteLayout) -> ListPage {
    let document = Html::parse_document(html);

    let Some(row_selector) = parse_selector(&layout.row) else {
        return ListPage::default();
    };

    let columns = [
        (NoticeField::NoticeNumber, parse_selector(&layout.number_cell)),
        (NoticeField::NoticeName, parse_selector(&layout.name_cell)),
        (NoticeField::Organization, parse_selector(&layout.organization_cell)),
        (
            NoticeField::AnnouncementDate,
            parse_selector(&layout.announcement_date_cell),
        ),
        (NoticeField::DeadlineDate, parse_selector(&layout.deadline_date_cell)),
    ];

    let mut candidates = Vec::new();
    for (index, row) in document.select(&row_selector).enumerate() {
        let mut fields = FieldSet::new();
        for (field, selector) in &columns {
            if let Some(text) = cell_text(&row, selector) {
                fields.insert(*field, text);
            }
        }

        if !fields.contains(NoticeField::NoticeNumber) {
            debug!(index, "Skipping grid row without a notice number");
            continue;
        }
        candidates.push(Candidate {
            index,
            row_position: type_position(&row),
            fields,
        });
    }

    ListPage {
        candidates,
        selected_page: selected_page(&document, layout),
    }
}

fn selected_page(document: &Html, layout: &SiteLayout) -> Option<u32> {
    let selector = parse_selector(&layout.selected_page)?;
    document
        .select(&selector)
        .next()
        .and_then(|el| clean_text(&el.text().collect::<String>()).parse().ok())
}

/// Returns true if `locator` matches at least one element of `html`
pub fn has_element(html: &str, locator: &str) -> bool {
    match Selector::parse(locator) {
        Ok(selector) => Html::parse_document(html).select(&selector).next().is_some(),
        Err(_) => false,
    }
}
