//! Document-order view of a rendered page: heading-like elements and tables,
//! with a query for the heading nearest before a given table.

use crate::normalize::collapse_whitespace;
use scraper::{ElementRef, Html};

const HEADING_TAGS: [&str; 4] = ["h1", "h2", "h3", "h4"];
const HEADING_CLASSES: [&str; 3] = ["panel-title", "table-title", "portlet-title"];

#[derive(Debug, Clone)]
pub enum OutlineEntry<'a> {
    Heading(String),
    Table {
        /// 1-based position among all tables on the page.
        ordinal: usize,
        element: ElementRef<'a>,
    },
}

#[derive(Debug, Clone)]
pub struct PageOutline<'a> {
    entries: Vec<OutlineEntry<'a>>,
}

/// A table together with its position in the outline.
#[derive(Debug, Clone, Copy)]
pub struct OutlineTable<'a> {
    pub position: usize,
    pub ordinal: usize,
    pub element: ElementRef<'a>,
}

impl<'a> PageOutline<'a> {
    pub fn from_document(doc: &'a Html) -> Self {
        let mut entries = Vec::new();
        let mut ordinal = 0usize;

        for element in doc.root_element().descendants().filter_map(ElementRef::wrap) {
            if element.value().name() == "table" {
                ordinal += 1;
                entries.push(OutlineEntry::Table { ordinal, element });
            } else if is_heading_like(element) {
                let text = collapse_whitespace(&element.text().collect::<String>());
                if !text.is_empty() {
                    entries.push(OutlineEntry::Heading(text));
                }
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[OutlineEntry<'a>] {
        &self.entries
    }

    pub fn tables(&self) -> impl Iterator<Item = OutlineTable<'a>> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| match entry {
                OutlineEntry::Table { ordinal, element } => Some(OutlineTable {
                    position,
                    ordinal: *ordinal,
                    element: *element,
                }),
                OutlineEntry::Heading(_) => None,
            })
    }

    /// Text of the closest heading strictly before `position`, scanning backward.
    pub fn nearest_heading_before(&self, position: usize) -> Option<&str> {
        self.entries[..position.min(self.entries.len())]
            .iter()
            .rev()
            .find_map(|entry| match entry {
                OutlineEntry::Heading(text) => Some(text.as_str()),
                OutlineEntry::Table { .. } => None,
            })
    }

    pub fn first_heading(&self) -> Option<&str> {
        self.entries.iter().find_map(|entry| match entry {
            OutlineEntry::Heading(text) => Some(text.as_str()),
            OutlineEntry::Table { .. } => None,
        })
    }

    pub fn heading_for(&self, table: &OutlineTable<'_>) -> String {
        section_heading(self.nearest_heading_before(table.position), table.ordinal)
    }
}

/// Heading used for a table: the nearest preceding heading, or `table_N`.
pub fn section_heading(nearest: Option<&str>, ordinal: usize) -> String {
    match nearest {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => format!("table_{ordinal}"),
    }
}

pub fn is_heading_like(element: ElementRef<'_>) -> bool {
    let value = element.value();
    HEADING_TAGS.contains(&value.name())
        || value
            .classes()
            .any(|class| HEADING_CLASSES.contains(&class))
}
