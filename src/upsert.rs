use crate::error::{RowError, StoreError};
use crate::model::{DetailDocument, ScrapedTender, TenderDetail, TenderId, TenderRecord};
use crate::store::TenderStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub record: TenderRecord,
    pub disposition: Disposition,
}

/// Creates or overwrites the record identified by the trimmed tender number.
///
/// Identity is case-sensitive. An existing record takes every freshly scraped
/// value (last write wins) and keeps its storage id.
pub fn upsert_tender<S>(store: &mut S, mut tender: ScrapedTender) -> Result<UpsertOutcome, RowError>
where
    S: TenderStore + ?Sized,
{
    tender.tender_number = tender.tender_number.trim().to_string();
    if tender.tender_number.is_empty() {
        return Err(RowError::MissingTenderNumber);
    }

    if store.find_tender(&tender.tender_number)?.is_some() {
        let record = store.update_tender(tender)?;
        debug!(tender = %record.tender_number, id = record.id, "tender updated");
        return Ok(UpsertOutcome {
            record,
            disposition: Disposition::Updated,
        });
    }

    let record = store.insert_tender(tender)?;
    info!(tender = %record.tender_number, id = record.id, "new tender");
    Ok(UpsertOutcome {
        record,
        disposition: Disposition::Created,
    })
}

/// Writes the detail owned by `tender_id`, replacing any earlier one.
pub fn upsert_detail<S>(
    store: &mut S,
    tender_id: TenderId,
    document: DetailDocument,
    fetched_at: DateTime<Utc>,
) -> Result<TenderDetail, StoreError>
where
    S: TenderStore + ?Sized,
{
    let detail = TenderDetail {
        tender_id,
        source_url: document.detail_url.clone(),
        data: document,
        fetched_at,
    };
    let replaced = store.find_detail(tender_id)?.is_some();
    store.upsert_detail(detail.clone())?;
    debug!(
        tender_id,
        url = %detail.source_url,
        sections = detail.data.sections.len(),
        replaced,
        "detail stored"
    );
    Ok(detail)
}
