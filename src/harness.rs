use crate::error::NavigationError;
use crate::navigate::SnapshotNavigator;
use crate::notify::NoopSink;
use crate::pipeline::{RunOptions, execute_run};
use crate::store::{JsonStore, TenderStore};
use anyhow::{Result, bail};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub snapshot_dir: PathBuf,
    pub state_path: PathBuf,
    pub run: RunOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub first_run_found: usize,
    pub first_run_new: usize,
    pub first_run_updated: usize,
    pub second_run_found: usize,
    pub second_run_new: usize,
    pub second_run_updated: usize,
    pub total_tenders: usize,
    pub total_details: usize,
    pub runs_recorded: usize,
}

/// Runs the pipeline twice over the same snapshot into a fresh store.
///
/// The second run must create nothing: every tender it sees was written by the first.
pub fn run_harness(options: &HarnessOptions) -> Result<HarnessReport> {
    if options.state_path.exists() {
        std::fs::remove_file(&options.state_path)?;
    }

    let mut store = JsonStore::open(&options.state_path)?;
    let open = || -> Result<SnapshotNavigator, NavigationError> {
        Ok(SnapshotNavigator::new(
            &options.snapshot_dir,
            &options.run.listing_url,
        ))
    };

    let first = execute_run(&options.run, open, &mut store, &NoopSink)?;
    let second = execute_run(&options.run, open, &mut store, &NoopSink)?;

    if second.tenders_new != 0 {
        bail!(
            "second run created {} tenders from an unchanged snapshot",
            second.tenders_new
        );
    }

    Ok(HarnessReport {
        first_run_found: first.tenders_found,
        first_run_new: first.tenders_new,
        first_run_updated: first.tenders_updated,
        second_run_found: second.tenders_found,
        second_run_new: second.tenders_new,
        second_run_updated: second.tenders_updated,
        total_tenders: store.state().tenders.len(),
        total_details: store.state().details.len(),
        runs_recorded: store.runs()?.len(),
    })
}
