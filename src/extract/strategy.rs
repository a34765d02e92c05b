//! Field extraction strategies
//!
//! Each strategy is a pure function over an `ExtractionContext`. They are
//! tried in `STRATEGIES` order and the first accepted value wins.

use crate::extract::validate::{accept_value, clean_text, label_matches};
use crate::record::{FieldSet, NoticeField};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

/// How one field is located
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: NoticeField,
    /// Exact CSS path of the value element, if the layout has one
    pub path: Option<String>,
    /// Label texts in priority order
    pub labels: Vec<String>,
}

impl FieldRule {
    pub fn new(field: NoticeField, path: Option<&str>, labels: &[&str]) -> Self {
        Self {
            field,
            path: path.map(str::to_string),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// A parsed view of rendered content, narrowed to a scope
pub struct ExtractionContext {
    document: Html,
    excluded: Vec<Selector>,
}

impl ExtractionContext {
    /// Parses `html`, narrowing to the first element matching `scope` when present
    ///
    /// Elements under any of `excluded_regions` are invisible to every strategy.
    pub fn new(html: &str, scope: Option<&str>, excluded_regions: &[String]) -> Self {
        let full = Html::parse_document(html);

        let scoped = scope
            .and_then(|s| Selector::parse(s).ok())
            .and_then(|selector| full.select(&selector).next().map(|el| el.html()));

        let document = match scoped {
            Some(fragment) => Html::parse_fragment(&fragment),
            None => {
                if let Some(scope) = scope {
                    trace!(scope, "Scope not present, extracting from whole document");
                }
                full
            }
        };

        let excluded = excluded_regions
            .iter()
            .filter_map(|region| Selector::parse(region).ok())
            .collect();

        Self { document, excluded }
    }

    /// True if the element or one of its ancestors is an excluded region
    fn is_excluded(&self, el: &ElementRef<'_>) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        std::iter::once(*el)
            .chain(el.ancestors().filter_map(ElementRef::wrap))
            .any(|node| self.excluded.iter().any(|region| region.matches(&node)))
    }

    fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.document
            .select(selector)
            .filter(move |el| !self.is_excluded(el))
    }
}

/// Signature shared by all strategies
pub type Strategy = fn(&ExtractionContext, &FieldRule) -> Option<String>;

/// Strategies in fallback order
pub const STRATEGIES: [(&str, Strategy); 3] = [
    ("direct_path", direct_path),
    ("paired_label", paired_label),
    ("label_proximity", label_proximity),
];

/// Runs the strategy chain for one field
///
/// Returns the accepted value and the name of the strategy that produced it.
pub fn extract_field(ctx: &ExtractionContext, rule: &FieldRule) -> Option<(String, &'static str)> {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(ctx, rule).map(|value| (value, *name)))
}

/// Runs every rule against the context
pub fn extract_with(ctx: &ExtractionContext, rules: &[FieldRule]) -> FieldSet {
    let mut fields = FieldSet::new();
    for rule in rules {
        match extract_field(ctx, rule) {
            Some((value, strategy)) => {
                debug!(field = %rule.field, strategy, "Field extracted");
                fields.insert(rule.field, value);
            }
            None => trace!(field = %rule.field, "No strategy matched"),
        }
    }
    fields
}

/// Visible text of an element, cleaned
fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn next_element_sibling<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Looks the value up by the rule's fixed structural path
pub fn direct_path(ctx: &ExtractionContext, rule: &FieldRule) -> Option<String> {
    let path = rule.path.as_deref()?;
    let selector = Selector::parse(path).ok()?;

    let value = ctx
        .select(&selector)
        .find_map(|el| accept_value(rule.field, &element_text(&el)));
    value
}

/// Scans `th`→`td` and `dt`→`dd` pairs in document order
pub fn paired_label(ctx: &ExtractionContext, rule: &FieldRule) -> Option<String> {
    let selector = Selector::parse("th, dt").ok()?;

    let value = ctx.select(&selector).find_map(|label_el| {
        if !label_matches(&element_text(&label_el), &rule.labels) {
            return None;
        }
        let value_tag = match label_el.value().name() {
            "th" => "td",
            _ => "dd",
        };
        let value_el = next_element_sibling(&label_el)?;
        if value_el.value().name() != value_tag || ctx.is_excluded(&value_el) {
            return None;
        }
        accept_value(rule.field, &element_text(&value_el))
    });
    value
}

/// Finds a label anywhere and reads the nearest following value
///
/// The value is the label's next element sibling, or failing that the next
/// sibling of one of its ancestors (up to three levels).
pub fn label_proximity(ctx: &ExtractionContext, rule: &FieldRule) -> Option<String> {
    const MAX_ANCESTOR_HOPS: usize = 3;
    let selector = Selector::parse("*").ok()?;

    for el in ctx.select(&selector) {
        if matches!(el.value().name(), "script" | "style" | "html" | "head" | "body") {
            continue;
        }
        if !is_innermost_label(&el, &rule.labels) {
            continue;
        }

        let mut anchor = el;
        for _ in 0..=MAX_ANCESTOR_HOPS {
            if let Some(value) = following_value(ctx, &anchor, rule.field) {
                return Some(value);
            }
            match anchor.parent().and_then(ElementRef::wrap) {
                Some(parent) => anchor = parent,
                None => break,
            }
        }
    }

    None
}

/// The element's text is a label and none of its child elements is
fn is_innermost_label(el: &ElementRef<'_>, labels: &[String]) -> bool {
    if !label_matches(&element_text(el), labels) {
        return false;
    }
    !el.children()
        .filter_map(ElementRef::wrap)
        .any(|child| label_matches(&element_text(&child), labels))
}

/// First accepted value among the following element siblings of `anchor`
fn following_value(ctx: &ExtractionContext, anchor: &ElementRef<'_>, field: NoticeField) -> Option<String> {
    anchor
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| !ctx.is_excluded(sibling))
        .map(|sibling| element_text(&sibling))
        .find(|text| !text.is_empty())
        .and_then(|text| accept_value(field, &text))
}
