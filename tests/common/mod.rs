//! Shared fixtures for the integration tests
//!
//! `FakeSite` is an in-memory `NavigationCapability`: every view is a static
//! HTML document, and clicking an element follows its `data-goto` attribute
//! to the next view. `@list` goes back to the last list (or search result)
//! view shown, `@search` to the result view for the text last typed.

#![allow(dead_code)]

use async_trait::async_trait;
use notice_sweep::config::{parse_config, Config};
use notice_sweep::navigation::{Content, NavigationCapability};
use notice_sweep::{NavError, NavResult};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub const LIST_URL: &str = "https://notices.test/list";

/// Creates a test configuration keeping its state and output under `dir`
pub fn create_test_config(dir: &TempDir) -> Config {
    parse_config(&format!(
        r##"
[site]
list-url = "{list_url}"
reachability-check = false

[site.layout]
list-ready = "#grid"
row = "tr.row"
number-cell = "td.num"
name-cell = "td.name"
organization-cell = "td.org"
announcement-date-cell = "td.posted"
deadline-date-cell = "td.deadline"
row-link = "td.name a"
page-link = "#page_{{page}}"
next-group = "#next_group"
selected-page = ".page.selected"
detail-ready = "#detail"
detail-scope = "#detail"
modal-open = "#open_modal"
modal-ready = "#modal"
modal-scope = "#modal"
modal-close = "#modal .close"
popup-open = "#open_popup"
popup-ready = "#popup"
popup-scope = "#popup"
popup-close = "#popup .close"
open-window = ".window"
back-to-list = "#back"
search-input = "#search_no"
search-button = "#search_btn"
excluded-regions = ["#search_box"]

[crawler]
element-timeout-ms = 300
transient-retries = 0
dismiss-attempts = 2
delay-between-pages-ms = 0

[state]
directory = "{state}"

[output]
directory = "{out}"
formats = ["json"]
"##,
        list_url = LIST_URL,
        state = dir.path().join("state").display(),
        out = dir.path().join("out").display(),
    ))
    .expect("test config is valid")
}

pub fn number(i: u32) -> String {
    format!("R24BK{:05}", i)
}

/// One notice as the fake site renders it
#[derive(Debug, Clone)]
pub struct Notice {
    pub number: String,
    pub name: String,
    pub organization: String,
    pub phone: String,
    pub email: Option<String>,
    /// The detail view has the notice-detail modal button
    pub has_modal: bool,
    /// The detail view never renders
    pub broken: bool,
    /// The popup's close button does nothing; only Escape closes it
    pub stuck_popup: bool,
}

impl Notice {
    pub fn new(i: u32) -> Self {
        Self {
            number: number(i),
            name: format!("Road Repair Phase {}", i),
            organization: "Seoul Metropolitan City".to_string(),
            phone: format!("02-2133-{:04}", 1000 + i),
            email: Some(format!("buyer{}@seoul.go.kr", i)),
            has_modal: true,
            broken: false,
            stuck_popup: false,
        }
    }

    fn row(&self) -> String {
        format!(
            r#"<tr class="row"><td class="num">{number}</td><td class="name"><a data-goto="detail:{number}">{name}</a></td><td class="org">{org}</td><td class="posted">2024/05/01 09:00</td><td class="deadline">2024/05/20 18:00</td></tr>"#,
            number = self.number,
            name = self.name,
            org = self.organization,
        )
    }

    fn detail_block(&self) -> String {
        let modal_button = if self.has_modal {
            format!(
                r#"<button id="open_modal" data-goto="modal:{}">상세</button>"#,
                self.number
            )
        } else {
            String::new()
        };
        format!(
            r#"<div id="detail"><table>
<tr><th>입찰공고번호</th><td>{number}</td></tr>
<tr><th>공고명</th><td>{name}</td></tr>
<tr><th>공고기관</th><td>{org}</td></tr>
<tr><th>계약방법</th><td>제한경쟁</td></tr>
</table>{modal_button}<a id="back" data-goto="@list">목록</a></div>"#,
            number = self.number,
            name = self.name,
            org = self.organization,
        )
    }

    fn modal_block(&self) -> String {
        format!(
            r#"<div id="modal" class="window"><table>
<tr><th>추정가격</th><td>181,818,182</td></tr>
<tr><th>개찰일시</th><td>2024/05/21 11:00</td></tr>
</table><button id="open_popup" data-goto="popup:{number}">상세</button><button class="close" data-goto="detail:{number}">닫기</button></div>"#,
            number = self.number,
        )
    }

    fn popup_block(&self) -> String {
        let email = self
            .email
            .as_ref()
            .map(|email| format!("<tr><th>이메일</th><td>{}</td></tr>", email))
            .unwrap_or_default();
        let close = if self.stuck_popup {
            r#"<button class="close">닫기</button>"#.to_string()
        } else {
            format!(r#"<button class="close" data-goto="modal:{}">닫기</button>"#, self.number)
        };
        format!(
            r#"<div id="popup" class="window" data-escape="modal:{number}"><table>
<tr><th>담당자</th><td>Kim Minsu</td></tr>
<tr><th>전화번호</th><td>{phone}</td></tr>
{email}
</table>{close}</div>"#,
            number = self.number,
            phone = self.phone,
        )
    }
}

fn page(body: &str) -> String {
    format!(
        r#"<html><body><div id="search_box"><input id="search_no"><button id="search_btn" data-goto="@search">검색</button></div>{}</body></html>"#,
        body
    )
}

fn grid(rows: &[&Notice]) -> String {
    let rows: String = rows.iter().map(|notice| notice.row()).collect();
    format!(r#"<table id="grid"><tbody>{}</tbody></table>"#, rows)
}

fn pager(current: usize, total: usize) -> String {
    let links: String = (1..=total)
        .map(|p| {
            let class = if p == current { "page selected" } else { "page" };
            format!(r#"<a id="page_{p}" class="{class}" data-goto="list:{p}">{p}</a>"#)
        })
        .collect();
    format!(r#"<div class="pager">{}</div>"#, links)
}

/// In-memory procurement site
pub struct FakeSite {
    views: HashMap<String, String>,
    current: String,
    last_list: String,
    typed: String,
    cancel_on: Option<(String, CancellationToken)>,
    views_entered: Vec<String>,
    /// Every locator clicked, in order
    pub clicks: Vec<String>,
    /// Number of times the list URL was loaded
    pub renders: u32,
}

impl FakeSite {
    /// Builds a site whose list pages hold `pages`
    pub fn new(pages: Vec<Vec<Notice>>) -> Self {
        let mut site = Self {
            views: HashMap::new(),
            current: String::new(),
            last_list: "list:1".to_string(),
            typed: String::new(),
            cancel_on: None,
            views_entered: Vec::new(),
            clicks: Vec::new(),
            renders: 0,
        };

        let total = pages.len();
        for (i, notices) in pages.iter().enumerate() {
            let rows: Vec<&Notice> = notices.iter().collect();
            site.views.insert(
                format!("list:{}", i + 1),
                page(&format!("{}{}", grid(&rows), pager(i + 1, total))),
            );
            for notice in notices {
                site.set_notice(notice);
            }
        }
        site
    }

    /// Ten notices over two pages of five
    pub fn two_pages() -> Self {
        Self::new(vec![
            (1..=5).map(Notice::new).collect(),
            (6..=10).map(Notice::new).collect(),
        ])
    }

    /// Replaces the detail, modal, popup and search views of `notice`
    pub fn set_notice(&mut self, notice: &Notice) {
        let n = &notice.number;
        self.views
            .insert(format!("search:{}", n), page(&grid(&[notice])));

        if notice.broken {
            self.views.insert(
                format!("detail:{}", n),
                page(r#"<div class="error">일시적인 오류</div><a id="back" data-goto="@list">목록</a>"#),
            );
            return;
        }

        let detail = notice.detail_block();
        let modal = format!("{}{}", detail, notice.modal_block());
        let popup = format!("{}{}", modal, notice.popup_block());
        self.views.insert(format!("detail:{}", n), page(&detail));
        self.views.insert(format!("modal:{}", n), page(&modal));
        self.views.insert(format!("popup:{}", n), page(&popup));
    }

    /// Cancels `token` the moment `view` is shown
    pub fn cancel_on(&mut self, view: impl Into<String>, token: CancellationToken) {
        self.cancel_on = Some((view.into(), token));
    }

    /// True if the detail link of `notice_number` was ever followed
    pub fn opened(&self, notice_number: &str) -> bool {
        self.views_entered.iter().any(|v| v == &format!("detail:{}", notice_number))
    }

    fn html(&self) -> String {
        self.views
            .get(&self.current)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string())
    }

    fn enter(&mut self, view: String) {
        if view.starts_with("list:") || view.starts_with("search:") {
            self.last_list = view.clone();
        }
        if let Some((target, token)) = &self.cancel_on {
            if *target == view {
                token.cancel();
            }
        }
        self.views_entered.push(view.clone());
        self.current = view;
    }

    /// `attribute` of the first element matching `locator` in the current view
    fn find(&self, locator: &str) -> NavResult<Option<String>> {
        let selector = Selector::parse(locator)
            .map_err(|e| NavError::Failed(format!("bad locator {}: {:?}", locator, e)))?;
        let document = Html::parse_document(&self.html());
        let element = document
            .select(&selector)
            .next()
            .ok_or_else(|| NavError::ElementNotFound(locator.to_string()))?;
        Ok(element.value().attr("data-goto").map(str::to_string))
    }

    fn follow(&mut self, target: &str) {
        let view = match target {
            "@list" => self.last_list.clone(),
            "@search" => format!("search:{}", self.typed),
            other => other.to_string(),
        };
        self.enter(view);
    }
}

#[async_trait]
impl NavigationCapability for FakeSite {
    async fn render(&mut self, _url: &str) -> NavResult<Content> {
        self.renders += 1;
        self.enter("list:1".to_string());
        Ok(Content::new(self.html()))
    }

    async fn click(&mut self, locator: &str) -> NavResult<()> {
        let target = self.find(locator)?;
        self.clicks.push(locator.to_string());
        if let Some(target) = target {
            self.follow(&target);
        }
        Ok(())
    }

    async fn wait_for(&mut self, locator: &str, timeout: Duration) -> NavResult<Content> {
        let content = Content::new(self.html());
        if content.contains(locator) {
            Ok(content)
        } else {
            Err(NavError::Timeout {
                locator: locator.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn current_content(&mut self) -> NavResult<Content> {
        Ok(Content::new(self.html()))
    }

    async fn type_text(&mut self, locator: &str, text: &str) -> NavResult<()> {
        self.find(locator)?;
        self.typed = text.to_string();
        Ok(())
    }

    async fn press_key(&mut self, key: &str) -> NavResult<()> {
        if key != "Escape" {
            return Ok(());
        }
        let selector = Selector::parse("[data-escape]")
            .map_err(|e| NavError::Failed(format!("{:?}", e)))?;
        let target = Html::parse_document(&self.html())
            .select(&selector)
            .last()
            .and_then(|el| el.value().attr("data-escape").map(str::to_string));
        if let Some(target) = target {
            self.follow(&target);
        }
        Ok(())
    }
}
