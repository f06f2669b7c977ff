use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TenderId = u64;
pub type RunId = u64;

/// Status stamped on every record written from the listing.
pub const ACTIVE_STATUS: &str = "ACTIVE";

/// One tender as it currently stands in storage, keyed by `tender_number`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenderRecord {
    pub id: TenderId,
    pub tender_number: String,
    pub title: String,
    pub department: String,
    pub publish_date: Option<NaiveDate>,
    pub bid_submission_date: Option<NaiveDate>,
    pub tender_value: Option<Decimal>,
    pub status: String,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
}

/// Freshly normalized listing values, before identity is resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapedTender {
    pub tender_number: String,
    pub title: String,
    pub department: String,
    pub publish_date: Option<NaiveDate>,
    pub bid_submission_date: Option<NaiveDate>,
    pub tender_value: Option<Decimal>,
    pub status: String,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedTender {
    pub fn into_record(self, id: TenderId) -> TenderRecord {
        TenderRecord {
            id,
            tender_number: self.tender_number,
            title: self.title,
            department: self.department,
            publish_date: self.publish_date,
            bid_submission_date: self.bid_submission_date,
            tender_value: self.tender_value,
            status: self.status,
            source_url: self.source_url,
            scraped_at: self.scraped_at,
        }
    }
}

/// Raw positional fields of one listing row with at least the minimum cell count.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListingRow {
    pub index: usize,
    pub tender_number: String,
    pub title: String,
    pub department: String,
    pub publish_date_raw: String,
    pub bid_submission_date_raw: String,
    pub tender_value_raw: String,
    pub detail_url: Option<String>,
}

/// A table cell after whitespace normalization.
///
/// Serialized untagged, so plain cells stay plain strings and linked cells
/// become `{ "text": .., "href": .. }` objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CellValue {
    Scalar(String),
    LinkedText { text: String, href: String },
}

impl CellValue {
    pub fn text(&self) -> &str {
        match self {
            CellValue::Scalar(text) => text,
            CellValue::LinkedText { text, .. } => text,
        }
    }
}

/// Content extracted from one table (or several tables sharing a heading).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SectionValue {
    TableRows(Vec<BTreeMap<String, CellValue>>),
    KeyValueMap(BTreeMap<String, CellValue>),
    Sequence(Vec<SectionValue>),
}

impl SectionValue {
    /// Number of tables folded into this value.
    pub fn table_count(&self) -> usize {
        match self {
            SectionValue::Sequence(items) => items.len(),
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailDocument {
    pub detail_url: String,
    pub title: Option<String>,
    pub sections: BTreeMap<String, SectionValue>,
    pub scraped_at: DateTime<Utc>,
}

/// Detail payload owned by exactly one [`TenderRecord`] through its storage id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenderDetail {
    pub tender_id: TenderId,
    pub source_url: String,
    pub data: DetailDocument,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScraperRun {
    pub id: RunId,
    pub status: RunStatus,
    pub tenders_found: usize,
    pub tenders_new: usize,
    pub tenders_updated: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub tenders_found: usize,
    pub tenders_new: usize,
    pub tenders_updated: usize,
}

/// Terminal state handed to the run recorder.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Success(RunSummary),
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub schema_version: u32,
    pub next_tender_id: TenderId,
    pub next_run_id: RunId,
    pub tenders: BTreeMap<String, TenderRecord>,
    pub details: BTreeMap<TenderId, TenderDetail>,
    pub runs: Vec<ScraperRun>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            schema_version: 1,
            next_tender_id: 1,
            next_run_id: 1,
            tenders: BTreeMap::new(),
            details: BTreeMap::new(),
            runs: Vec::new(),
        }
    }
}
