//! Field extraction from rendered content
//!
//! Everything here is synchronous and pure: a view's HTML goes in, a
//! `FieldSet` comes out. Each field runs through the strategy chain
//! (direct path, then paired label, then label proximity) and keeps the
//! first accepted value. A field no strategy finds stays absent.

mod list;
mod rules;
mod strategy;
mod validate;

pub use list::{has_element, parse_list_page, Candidate, ListPage};
pub use rules::{rules_for, View};
pub use strategy::{
    direct_path, extract_field, extract_with, label_proximity, paired_label, ExtractionContext,
    FieldRule, Strategy, STRATEGIES,
};
pub use validate::{clean_opening_date, clean_text, label_matches, validate_field_value};

use crate::config::SiteLayout;
use crate::record::FieldSet;

/// Extracts the built-in fields of `view` from its rendered HTML
pub fn extract_view(html: &str, layout: &SiteLayout, view: View) -> FieldSet {
    let scope = match view {
        View::Detail => &layout.detail_scope,
        View::Modal => &layout.modal_scope,
        View::Popup => &layout.popup_scope,
    };
    let ctx = ExtractionContext::new(html, Some(scope), &layout.excluded_regions);
    extract_with(&ctx, &rules_for(view))
}
