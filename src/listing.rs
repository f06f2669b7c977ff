use crate::model::ListingRow;
use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::html::Select;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Rows with fewer cells than this are not tender rows.
pub const MIN_CELLS: usize = 5;

// Positional column contract of the listing table. Column 0 is the serial number.
const COL_TENDER_NUMBER: usize = 1;
const COL_TITLE: usize = 2;
const COL_DEPARTMENT: usize = 3;
const COL_PUBLISH_DATE: usize = 4;
const COL_BID_SUBMISSION_DATE: usize = 5;
const COL_TENDER_VALUE: usize = 7;

const SCRIPT_SCHEME: &str = "javascript:";

/// One `<tr>` of the listing, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEntry {
    Tender(ListingRow),
    /// Row dropped for having too few cells. Still counts as found.
    Incomplete { index: usize, cells: usize },
}

#[derive(Debug, Clone)]
pub struct ListingParser {
    row_selector: Selector,
    link_selector: Selector,
    clickable_selector: Selector,
    quoted_literal: Regex,
    base_url: Url,
}

impl ListingParser {
    pub fn new(row_selector: &str, base_url: &str) -> Result<Self> {
        let row_selector = Selector::parse(row_selector)
            .map_err(|err| anyhow!("invalid row selector {row_selector}: {err:?}"))?;
        let link_selector = Selector::parse("a[href]")
            .map_err(|err| anyhow!("failed to parse link selector: {err:?}"))?;
        let clickable_selector = Selector::parse("a[onclick], button[onclick]")
            .map_err(|err| anyhow!("failed to parse onclick selector: {err:?}"))?;
        let quoted_literal = Regex::new(r#"'(.*?)'|"(.*?)""#)?;
        let base_url =
            Url::parse(base_url).map_err(|err| anyhow!("invalid listing url {base_url}: {err}"))?;

        Ok(Self {
            row_selector,
            link_selector,
            clickable_selector,
            quoted_literal,
            base_url,
        })
    }

    /// Rows of `doc` in document order. Fields are extracted as the iterator advances.
    pub fn rows<'a>(&'a self, doc: &'a Html) -> ListingRows<'a> {
        ListingRows {
            parser: self,
            rows: doc.select(&self.row_selector),
            index: 0,
        }
    }

    fn parse_row(&self, index: usize, row: ElementRef<'_>) -> ListingEntry {
        let cells = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| cell.value().name() == "td")
            .collect::<Vec<_>>();

        if cells.len() < MIN_CELLS {
            debug!(row = index, cells = cells.len(), "dropping short listing row");
            return ListingEntry::Incomplete {
                index,
                cells: cells.len(),
            };
        }

        let cell_text = |col: usize| {
            cells
                .get(col)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .unwrap_or_default()
        };

        ListingEntry::Tender(ListingRow {
            index,
            tender_number: cell_text(COL_TENDER_NUMBER),
            title: cell_text(COL_TITLE),
            department: cell_text(COL_DEPARTMENT),
            publish_date_raw: cell_text(COL_PUBLISH_DATE),
            bid_submission_date_raw: cell_text(COL_BID_SUBMISSION_DATE),
            tender_value_raw: cell_text(COL_TENDER_VALUE),
            detail_url: self.detail_url(row),
        })
    }

    /// Resolves the row's detail link: anchor `href` first, then the first
    /// quoted literal of an `onclick` handler. Script-scheme values are
    /// unwrapped to their quoted literal before resolving against the listing URL.
    pub fn detail_url(&self, row: ElementRef<'_>) -> Option<String> {
        let from_href = row
            .select(&self.link_selector)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .and_then(|href| self.unwrap_script(href));

        let raw = from_href.or_else(|| {
            row.select(&self.clickable_selector)
                .next()
                .and_then(|el| el.value().attr("onclick"))
                .and_then(|onclick| self.first_quoted(onclick))
                .and_then(|value| self.unwrap_script(&value))
        })?;

        self.base_url.join(&raw).ok().map(|url| url.to_string())
    }

    fn unwrap_script(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() || value == "#" {
            return None;
        }
        if value
            .get(..SCRIPT_SCHEME.len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(SCRIPT_SCHEME))
        {
            return self.first_quoted(value);
        }
        Some(value.to_string())
    }

    fn first_quoted(&self, value: &str) -> Option<String> {
        let caps = self.quoted_literal.captures(value)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_string())
            .filter(|literal| !literal.is_empty())
    }
}

/// Single-pass iterator over listing rows.
pub struct ListingRows<'a> {
    parser: &'a ListingParser,
    rows: Select<'a, 'a>,
    index: usize,
}

impl Iterator for ListingRows<'_> {
    type Item = ListingEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let index = self.index;
        self.index += 1;
        Some(self.parser.parse_row(index, row))
    }
}
