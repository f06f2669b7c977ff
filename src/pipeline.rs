use crate::config::ScraperConfig;
use crate::detail::DetailParser;
use crate::error::{DetailError, NavigationError, RowError, ScrapeError};
use crate::listing::{ListingEntry, ListingParser};
use crate::model::{ACTIVE_STATUS, ListingRow, RunOutcome, RunSummary, ScrapedTender, TenderId};
use crate::navigate::Navigator;
use crate::normalize::{parse_date, parse_value};
use crate::notify::{EventSink, NewTendersAvailable};
use crate::recorder::RunRecorder;
use crate::store::TenderStore;
use crate::upsert::{Disposition, upsert_detail, upsert_tender};
use chrono::{DateTime, Utc};
use scraper::Html;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub listing_url: String,
    pub row_selector: String,
    pub fetch_details: bool,
}

impl RunOptions {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            listing_url: config.portal.listing_url.clone(),
            row_selector: config.portal.row_selector.clone(),
            fetch_details: config.browser.fetch_details,
        }
    }
}

/// Executes one scrape run.
///
/// The run record is written as RUNNING before the navigator is opened and is
/// finalized exactly once: SUCCESS with the counts, or FAILED with the error
/// message before that error is returned. Rows are processed one at a time in
/// listing order; a failing row is logged and skipped but still counted as found.
pub fn execute_run<S, N, F>(
    options: &RunOptions,
    open_navigator: F,
    store: &mut S,
    events: &dyn EventSink,
) -> Result<RunSummary, ScrapeError>
where
    S: TenderStore + ?Sized,
    N: Navigator,
    F: FnOnce() -> Result<N, NavigationError>,
{
    let recorder = RunRecorder::begin(store).map_err(ScrapeError::RunRecord)?;
    let since = recorder.start_time();

    let scraped = open_navigator()
        .map_err(ScrapeError::from)
        .and_then(|mut navigator| scrape_listing(options, &mut navigator, store));

    match scraped {
        Ok(summary) => {
            let run = recorder
                .finalize(store, RunOutcome::Success(summary))
                .map_err(ScrapeError::RunRecord)?;

            if summary.tenders_new > 0 {
                let event = NewTendersAvailable {
                    count: summary.tenders_new,
                    since,
                    until: run.end_time.unwrap_or_else(Utc::now),
                };
                if let Err(err) = events.publish(event) {
                    warn!(error = %err, "failed to publish new tenders event");
                }
            }

            Ok(summary)
        }
        Err(err) => {
            error!(error = %err, "scrape run failed");
            if let Err(record_err) = recorder.finalize(store, RunOutcome::Failed(err.to_string())) {
                error!(error = %record_err, "failed run could not be recorded");
            }
            Err(err)
        }
    }
}

fn scrape_listing<S, N>(
    options: &RunOptions,
    navigator: &mut N,
    store: &mut S,
) -> Result<RunSummary, ScrapeError>
where
    S: TenderStore + ?Sized,
    N: Navigator + ?Sized,
{
    let parser = ListingParser::new(&options.row_selector, &options.listing_url)?;
    let details = DetailParser::new()?;
    let page = navigator.load_listing()?;
    let doc = Html::parse_document(&page.html);

    let mut summary = RunSummary::default();
    for entry in parser.rows(&doc) {
        summary.tenders_found += 1;
        let ListingEntry::Tender(row) = entry else {
            continue;
        };

        match process_row(options, &details, navigator, store, &row) {
            Ok(Disposition::Created) => summary.tenders_new += 1,
            Ok(Disposition::Updated) => summary.tenders_updated += 1,
            Err(err) => {
                warn!(
                    row = row.index,
                    tender = %row.tender_number,
                    error = %err,
                    "row processing failed; skipping"
                );
            }
        }
    }

    info!(
        found = summary.tenders_found,
        new = summary.tenders_new,
        updated = summary.tenders_updated,
        "listing processed"
    );
    Ok(summary)
}

fn process_row<S, N>(
    options: &RunOptions,
    details: &DetailParser,
    navigator: &mut N,
    store: &mut S,
    row: &ListingRow,
) -> Result<Disposition, RowError>
where
    S: TenderStore + ?Sized,
    N: Navigator + ?Sized,
{
    let tender = normalize_row(row, &options.listing_url, Utc::now());
    let outcome = upsert_tender(store, tender)?;

    if options.fetch_details
        && let Some(detail_url) = row.detail_url.as_deref()
    {
        if let Err(err) = fetch_detail(details, navigator, store, outcome.record.id, detail_url) {
            warn!(
                row = row.index,
                tender = %outcome.record.tender_number,
                url = %detail_url,
                error = %err,
                "detail fetch failed"
            );
        }
    } else {
        debug!(row = row.index, "detail fetch skipped");
    }

    Ok(outcome.disposition)
}

fn fetch_detail<S, N>(
    details: &DetailParser,
    navigator: &mut N,
    store: &mut S,
    tender_id: TenderId,
    detail_url: &str,
) -> Result<(), DetailError>
where
    S: TenderStore + ?Sized,
    N: Navigator + ?Sized,
{
    let page = navigator.load_detail(detail_url)?;
    let fetched_at = Utc::now();
    let document = details.parse(&page.html, &page.url, fetched_at);
    upsert_detail(store, tender_id, document, fetched_at)?;
    Ok(())
}

/// Turns raw listing fields into the values written to storage.
pub fn normalize_row(row: &ListingRow, source_url: &str, scraped_at: DateTime<Utc>) -> ScrapedTender {
    ScrapedTender {
        tender_number: row.tender_number.trim().to_string(),
        title: row.title.clone(),
        department: row.department.clone(),
        publish_date: parse_date(&row.publish_date_raw),
        bid_submission_date: parse_date(&row.bid_submission_date_raw),
        tender_value: parse_value(&row.tender_value_raw),
        status: ACTIVE_STATUS.to_string(),
        source_url: source_url.to_string(),
        scraped_at,
    }
}
