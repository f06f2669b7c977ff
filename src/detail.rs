use crate::model::{CellValue, DetailDocument, SectionValue};
use crate::normalize::collapse_whitespace;
use crate::outline::PageOutline;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::debug;
use url::Url;

/// Minimum header cells in a table's first row for it to be read as tabular.
const MIN_HEADER_CELLS: usize = 2;

/// Parses arbitrary tender detail pages into heading-keyed sections.
///
/// Every table on the page becomes a section under its nearest preceding
/// heading (or `table_N`). Tables whose first row carries at least two header
/// cells are read as rows keyed by header text; all others are read as
/// key/value pairs from their first two cells. Repeated headings fold into a
/// [`SectionValue::Sequence`].
#[derive(Debug, Clone)]
pub struct DetailParser {
    link_selector: Selector,
}

impl DetailParser {
    pub fn new() -> Result<Self> {
        let link_selector = Selector::parse("a[href]")
            .map_err(|err| anyhow!("failed to parse link selector: {err:?}"))?;
        Ok(Self { link_selector })
    }

    pub fn parse(&self, html: &str, detail_url: &str, scraped_at: DateTime<Utc>) -> DetailDocument {
        let doc = Html::parse_document(html);
        let outline = PageOutline::from_document(&doc);
        let base_url = Url::parse(detail_url).ok();

        let mut sections = BTreeMap::new();
        for table in outline.tables() {
            let heading = outline.heading_for(&table);
            let Some(value) = self.extract_table(table.element, base_url.as_ref()) else {
                debug!(url = %detail_url, heading = %heading, "table produced no data");
                continue;
            };
            merge_section(&mut sections, heading, value);
        }

        DetailDocument {
            detail_url: detail_url.to_string(),
            title: outline.first_heading().map(ToString::to_string),
            sections,
            scraped_at,
        }
    }

    pub fn extract_table(&self, table: ElementRef<'_>, base_url: Option<&Url>) -> Option<SectionValue> {
        let rows = own_rows(table);
        let first = rows.first()?;

        let headers = row_cells(*first)
            .into_iter()
            .filter(|cell| cell.value().name() == "th")
            .collect::<Vec<_>>();

        if headers.len() >= MIN_HEADER_CELLS {
            let names = headers
                .iter()
                .enumerate()
                .map(|(idx, th)| {
                    let text = element_text(*th);
                    if text.is_empty() {
                        format!("col_{}", idx + 1)
                    } else {
                        text
                    }
                })
                .collect::<Vec<_>>();

            let mut records = Vec::new();
            for row in rows.iter().skip(1) {
                let cells = row_cells(*row)
                    .into_iter()
                    .filter(|cell| cell.value().name() == "td")
                    .collect::<Vec<_>>();
                if cells.is_empty() {
                    continue;
                }
                let mut record = BTreeMap::new();
                for (idx, name) in names.iter().enumerate() {
                    let value = cells
                        .get(idx)
                        .map(|cell| self.normalize_cell(*cell, base_url))
                        .unwrap_or_else(|| CellValue::Scalar(String::new()));
                    record.insert(name.clone(), value);
                }
                records.push(record);
            }
            return Some(SectionValue::TableRows(records));
        }

        let mut pairs = BTreeMap::new();
        for row in &rows {
            let cells = row_cells(*row);
            if cells.len() < 2 {
                continue;
            }
            let key = element_text(cells[0]);
            if key.is_empty() {
                continue;
            }
            pairs.insert(key, self.normalize_cell(cells[1], base_url));
        }

        if pairs.is_empty() {
            None
        } else {
            Some(SectionValue::KeyValueMap(pairs))
        }
    }

    /// Text of a cell, or text plus absolute link when the cell holds an anchor.
    pub fn normalize_cell(&self, cell: ElementRef<'_>, base_url: Option<&Url>) -> CellValue {
        let text = element_text(cell);
        let link = cell
            .select(&self.link_selector)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .map(str::trim);
        match link {
            Some(href) => CellValue::LinkedText {
                text,
                href: absolutize_url(base_url, href),
            },
            None => CellValue::Scalar(text),
        }
    }
}

/// Inserts `value` under `heading`, turning a repeated heading into a sequence.
pub fn merge_section(
    sections: &mut BTreeMap<String, SectionValue>,
    heading: String,
    value: SectionValue,
) {
    match sections.entry(heading) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            SectionValue::Sequence(items) => items.push(value),
            existing => {
                let first = std::mem::replace(existing, SectionValue::Sequence(Vec::new()));
                *existing = SectionValue::Sequence(vec![first, value]);
            }
        },
    }
}

pub fn absolutize_url(base_url: Option<&Url>, value: &str) -> String {
    if value.starts_with("http://") || value.starts_with("https://") {
        return value.to_string();
    }

    if let Some(base) = base_url
        && let Ok(joined) = base.join(value)
    {
        return joined.to_string();
    }

    value.to_string()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Rows belonging to `table` itself, excluding rows of nested tables.
fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .filter(|row| nearest_table(*row).is_some_and(|owner| owner.id() == table.id()))
        .collect()
}

fn nearest_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .collect()
}
