use crate::error::StoreError;
use crate::model::{
    RunId, RunOutcome, RunStatus, ScrapedTender, ScraperRun, State, TenderDetail, TenderId,
    TenderRecord,
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage handle passed into a run. Only the scraper writes these entities.
pub trait TenderStore {
    fn find_tender(&self, tender_number: &str) -> Result<Option<TenderRecord>, StoreError>;

    /// Creates a record with a fresh storage id. Fails if the number already exists.
    fn insert_tender(&mut self, tender: ScrapedTender) -> Result<TenderRecord, StoreError>;

    /// Overwrites every mutable field of the record with this tender number.
    fn update_tender(&mut self, tender: ScrapedTender) -> Result<TenderRecord, StoreError>;

    fn find_detail(&self, tender_id: TenderId) -> Result<Option<TenderDetail>, StoreError>;

    fn upsert_detail(&mut self, detail: TenderDetail) -> Result<(), StoreError>;

    fn begin_run(&mut self, start_time: DateTime<Utc>) -> Result<ScraperRun, StoreError>;

    /// Moves a RUNNING run to its terminal status. Fails for any other status.
    fn finalize_run(
        &mut self,
        run_id: RunId,
        outcome: &RunOutcome,
        end_time: DateTime<Utc>,
    ) -> Result<ScraperRun, StoreError>;

    fn runs(&self) -> Result<Vec<ScraperRun>, StoreError>;
}

/// Single JSON document on disk, rewritten after every mutation.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    state: State,
}

impl JsonStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let state = load_state(path)?;
        debug!(
            state = %path.display(),
            tenders = state.tenders.len(),
            runs = state.runs.len(),
            "store opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Applies `change` to a copy of the state and keeps it only once it is on disk.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut State) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut next = self.state.clone();
        let value = change(&mut next)?;
        save_state(&self.path, &next)?;
        self.state = next;
        Ok(value)
    }
}

impl TenderStore for JsonStore {
    fn find_tender(&self, tender_number: &str) -> Result<Option<TenderRecord>, StoreError> {
        Ok(self.state.tenders.get(tender_number).cloned())
    }

    fn insert_tender(&mut self, tender: ScrapedTender) -> Result<TenderRecord, StoreError> {
        self.commit(|state| {
            if state.tenders.contains_key(&tender.tender_number) {
                return Err(StoreError::DuplicateTender(tender.tender_number));
            }

            let record = tender.into_record(state.next_tender_id);
            state.next_tender_id += 1;
            state
                .tenders
                .insert(record.tender_number.clone(), record.clone());
            Ok(record)
        })
    }

    fn update_tender(&mut self, tender: ScrapedTender) -> Result<TenderRecord, StoreError> {
        self.commit(|state| {
            let Some(existing) = state.tenders.get_mut(&tender.tender_number) else {
                return Err(StoreError::UnknownTender(tender.tender_number));
            };

            let record = tender.into_record(existing.id);
            *existing = record.clone();
            Ok(record)
        })
    }

    fn find_detail(&self, tender_id: TenderId) -> Result<Option<TenderDetail>, StoreError> {
        Ok(self.state.details.get(&tender_id).cloned())
    }

    fn upsert_detail(&mut self, detail: TenderDetail) -> Result<(), StoreError> {
        self.commit(|state| {
            state.details.insert(detail.tender_id, detail);
            Ok(())
        })
    }

    fn begin_run(&mut self, start_time: DateTime<Utc>) -> Result<ScraperRun, StoreError> {
        self.commit(|state| {
            let run = ScraperRun {
                id: state.next_run_id,
                status: RunStatus::Running,
                tenders_found: 0,
                tenders_new: 0,
                tenders_updated: 0,
                start_time,
                end_time: None,
                error: None,
            };
            state.next_run_id += 1;
            state.runs.push(run.clone());
            Ok(run)
        })
    }

    fn finalize_run(
        &mut self,
        run_id: RunId,
        outcome: &RunOutcome,
        end_time: DateTime<Utc>,
    ) -> Result<ScraperRun, StoreError> {
        self.commit(|state| {
            let run = state
                .runs
                .iter_mut()
                .find(|run| run.id == run_id)
                .ok_or(StoreError::UnknownRun(run_id))?;
            if run.status != RunStatus::Running {
                return Err(StoreError::RunAlreadyFinalized(run_id));
            }

            match outcome {
                RunOutcome::Success(summary) => {
                    run.status = RunStatus::Success;
                    run.tenders_found = summary.tenders_found;
                    run.tenders_new = summary.tenders_new;
                    run.tenders_updated = summary.tenders_updated;
                }
                RunOutcome::Failed(message) => {
                    run.status = RunStatus::Failed;
                    run.error = Some(message.clone());
                }
            }
            run.end_time = Some(end_time);
            Ok(run.clone())
        })
    }

    fn runs(&self) -> Result<Vec<ScraperRun>, StoreError> {
        Ok(self.state.runs.clone())
    }
}

pub fn load_state(path: &Path) -> Result<State, StoreError> {
    if !path.exists() {
        return Ok(State::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

pub fn save_state(path: &Path, state: &State) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let serialized = serde_json::to_string_pretty(state)?;
    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, serialized).map_err(io_err)?;
    std::fs::rename(&staging, path).map_err(io_err)?;
    Ok(())
}
