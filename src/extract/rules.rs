//! Built-in field rules for the notice detail views

use crate::extract::strategy::FieldRule;
use crate::record::NoticeField;

/// Which rendered view the rules are applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Detail,
    Modal,
    Popup,
}

/// Rules for every field the detail view and notice modal can show
///
/// More specific labels come first. Direct paths follow the WebSquare
/// output-control ids of the modal.
fn notice_rules() -> Vec<FieldRule> {
    use NoticeField::*;

    vec![
        FieldRule::new(NoticeNumber, Some(r#"[id$="_bidPbancNo"]"#), &["입찰공고번호", "공고번호"]),
        FieldRule::new(NoticeName, Some(r#"[id$="_bidPbancNm"]"#), &["입찰공고명", "공고명"]),
        FieldRule::new(Organization, Some(r#"[id$="_grpNm"]"#), &["공고기관", "수요기관", "발주기관"]),
        FieldRule::new(Classification, None, &["업무분류", "물품분류", "용역분류", "공고분류", "분류"]),
        FieldRule::new(DocumentNumber, None, &["문서번호"]),
        FieldRule::new(BidMethod, Some(r#"[id$="_cntrctMthdNm"]"#), &["계약방법", "입찰방법"]),
        FieldRule::new(SelectionMethod, None, &["낙찰자결정방법", "낙찰방법"]),
        FieldRule::new(BudgetAmount, Some(r#"[id$="_asignBdgtAmt"]"#), &["배정예산액", "배정예산", "예산금액"]),
        FieldRule::new(EstimatedPrice, Some(r#"[id$="_presmptPrce"]"#), &["추정가격"]),
        FieldRule::new(BasePrice, None, &["기초금액", "기준금액", "예정가격"]),
        FieldRule::new(AnnouncementDate, None, &["공고게시일시", "게시일시", "공고일시"]),
        FieldRule::new(DeadlineDate, None, &["입찰서접수마감일시", "마감일시"]),
        FieldRule::new(BidDate, None, &["입찰서접수시작일시", "입찰개시일시", "입찰일시"]),
        FieldRule::new(OpeningDate, Some(r#"[id$="_onbsDt"]"#), &["개찰일시", "개찰일"]),
        FieldRule::new(OpeningLocation, None, &["개찰장소"]),
        FieldRule::new(ContactPerson, None, &["담당자"]),
        FieldRule::new(ContactDepartment, None, &["담당부서"]),
        FieldRule::new(Notes, None, &["개찰및낙찰-비고", "비고", "특이사항", "참고사항"]),
    ]
}

/// Rules for the contact-detail popup
fn contact_rules() -> Vec<FieldRule> {
    use NoticeField::*;

    vec![
        FieldRule::new(ContactPhone, Some(r#"[id$="_telNo"]"#), &["전화번호", "연락처"]),
        FieldRule::new(ContactEmail, Some(r#"[id$="_email"]"#), &["이메일", "E-mail", "전자우편"]),
        FieldRule::new(ContactPerson, None, &["담당자", "성명"]),
        FieldRule::new(ContactDepartment, None, &["담당부서", "부서"]),
    ]
}

/// Returns the rules applied to `view`
pub fn rules_for(view: View) -> Vec<FieldRule> {
    match view {
        View::Detail | View::Modal => notice_rules(),
        View::Popup => contact_rules(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rule_has_labels() {
        for view in [View::Detail, View::Modal, View::Popup] {
            for rule in rules_for(view) {
                assert!(!rule.labels.is_empty(), "{} has no labels", rule.field);
            }
        }
    }

    #[test]
    fn test_direct_paths_parse() {
        for view in [View::Detail, View::Popup] {
            for rule in rules_for(view) {
                if let Some(path) = &rule.path {
                    assert!(scraper::Selector::parse(path).is_ok(), "bad path {}", path);
                }
            }
        }
    }

    #[test]
    fn test_popup_covers_contact_fields() {
        let fields: Vec<_> = rules_for(View::Popup).iter().map(|r| r.field).collect();
        for field in NoticeField::contact_fields() {
            assert!(fields.contains(field));
        }
    }
}
