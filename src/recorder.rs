use crate::error::StoreError;
use crate::model::{RunId, RunOutcome, ScraperRun};
use crate::store::TenderStore;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Lifecycle of one ScraperRun. `finalize` consumes the recorder, so a run
/// cannot be finalized twice.
#[derive(Debug)]
#[must_use = "a started run must be finalized"]
pub struct RunRecorder {
    run_id: RunId,
    start_time: DateTime<Utc>,
}

impl RunRecorder {
    /// Writes the RUNNING marker.
    pub fn begin<S>(store: &mut S) -> Result<Self, StoreError>
    where
        S: TenderStore + ?Sized,
    {
        let run = store.begin_run(Utc::now())?;
        info!(run = run.id, "scrape run started");
        Ok(Self {
            run_id: run.id,
            start_time: run.start_time,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Writes the terminal status.
    ///
    /// If writing SUCCESS fails, one attempt is made to record FAILED with the
    /// storage error. The original error is returned either way.
    pub fn finalize<S>(self, store: &mut S, outcome: RunOutcome) -> Result<ScraperRun, StoreError>
    where
        S: TenderStore + ?Sized,
    {
        match store.finalize_run(self.run_id, &outcome, Utc::now()) {
            Ok(run) => {
                info!(
                    run = run.id,
                    status = ?run.status,
                    found = run.tenders_found,
                    new = run.tenders_new,
                    updated = run.tenders_updated,
                    error = run.error.as_deref().unwrap_or(""),
                    "scrape run finalized"
                );
                Ok(run)
            }
            Err(err) => {
                error!(run = self.run_id, error = %err, "failed to finalize scrape run");
                if matches!(outcome, RunOutcome::Success(_))
                    && !matches!(err, StoreError::RunAlreadyFinalized(_))
                {
                    let fallback = RunOutcome::Failed(format!("failed to record run summary: {err}"));
                    if let Err(second) = store.finalize_run(self.run_id, &fallback, Utc::now()) {
                        error!(run = self.run_id, error = %second, "failed to mark run as failed");
                    }
                }
                Err(err)
            }
        }
    }
}
