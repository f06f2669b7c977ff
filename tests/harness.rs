use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use tender_scraper::config::{BrowserMode, ScraperConfig, load_config};
use tender_scraper::harness::{HarnessOptions, run_harness};
use tender_scraper::navigate::{Navigator, SnapshotNavigator, open_navigator, snapshot_file_name};
use tender_scraper::pipeline::RunOptions;

const LISTING_URL: &str = "https://eproc.example.gov.in/EPSV2Web/openarea/tenderListingPage.action";

const LISTING: &str = r##"<html><body>
<ul class="nav"><li><a href="#latestTenders">Latest Tenders</a></li></ul>
<div id="latestTenders"><table>
  <thead><tr><th>S.No</th><th>Tender No</th><th>Title</th><th>Department</th><th>Published</th><th>Bid Due</th><th>Type</th><th>Value</th><th></th></tr></thead>
  <tbody>
    <tr><td>1</td><td>WRD/2024/11</td><td>Flood protection works</td><td>Water Resources</td><td>01-03-2024</td><td>21-03-2024</td><td>Works</td><td>₹ 25,00,000</td><td><a href="tenderDetail.action?id=11">View</a></td></tr>
    <tr><td>2</td><td>RCD/2024/07</td><td>Road widening</td><td>Road Construction</td><td>2024-03-02</td><td>-</td><td>Works</td><td>-</td><td><a href="javascript:void(0)" onclick="viewDetail('tenderDetail.action?id=7')">View</a></td></tr>
    <tr><td colspan="9">Showing 2 of 2</td></tr>
  </tbody>
</table></div></body></html>"##;

const DETAIL: &str = r#"<html><body>
<h2>Tender Details</h2>
<div class="portlet-title">Basic Details</div>
<table><tr><td>Tender ID</td><td>WRD/2024/11</td></tr><tr><td>Tender Type</td><td>Open</td></tr></table>
<div class="portlet-title">Documents</div>
<table><tr><th>Document</th><th>Link</th></tr><tr><td>NIT</td><td><a href="/docs/nit.pdf">nit.pdf</a></td></tr></table>
</body></html>"#;

struct Snapshot {
    root: PathBuf,
    state_path: PathBuf,
}

fn setup_snapshot(base: &Path) -> Result<Snapshot> {
    let root = base.join("snapshot");
    fs::create_dir_all(root.join("details"))?;
    fs::write(root.join("listing.html"), LISTING)?;

    let detail_url = "https://eproc.example.gov.in/EPSV2Web/openarea/tenderDetail.action?id=11";
    fs::write(
        root.join("details").join(snapshot_file_name(detail_url)),
        DETAIL,
    )?;

    Ok(Snapshot {
        root,
        state_path: base.join("state/harness.json"),
    })
}

fn run_options() -> RunOptions {
    RunOptions {
        listing_url: LISTING_URL.to_string(),
        row_selector: "#latestTenders table tbody tr".to_string(),
        fetch_details: true,
    }
}

#[test]
fn harness_reports_stability_metrics() -> Result<()> {
    let temp = tempdir()?;
    let snapshot = setup_snapshot(temp.path())?;

    let report = run_harness(&HarnessOptions {
        snapshot_dir: snapshot.root,
        state_path: snapshot.state_path,
        run: run_options(),
    })?;

    assert_eq!(report.first_run_found, 3);
    assert_eq!(report.first_run_new, 2);
    assert_eq!(report.first_run_updated, 0);
    assert_eq!(report.second_run_found, 3);
    assert_eq!(report.second_run_new, 0);
    assert_eq!(report.second_run_updated, 2);
    assert_eq!(report.total_tenders, 2);
    assert_eq!(report.total_details, 1);
    assert_eq!(report.runs_recorded, 2);
    Ok(())
}

#[test]
fn harness_starts_from_a_fresh_store() -> Result<()> {
    let temp = tempdir()?;
    let snapshot = setup_snapshot(temp.path())?;
    let options = HarnessOptions {
        snapshot_dir: snapshot.root,
        state_path: snapshot.state_path,
        run: run_options(),
    };

    run_harness(&options)?;
    let report = run_harness(&options)?;

    assert_eq!(report.first_run_new, 2);
    assert_eq!(report.runs_recorded, 2);
    Ok(())
}

#[test]
fn snapshot_navigator_reports_missing_pages() -> Result<()> {
    let temp = tempdir()?;
    let snapshot = setup_snapshot(temp.path())?;
    let mut navigator = SnapshotNavigator::new(&snapshot.root, LISTING_URL);

    let listing = navigator.load_listing()?;
    assert_eq!(listing.url, LISTING_URL);
    assert!(listing.html.contains("WRD/2024/11"));

    assert!(navigator.load_detail("https://eproc.example.gov.in/missing").is_err());

    let mut empty = SnapshotNavigator::new(&temp.path().join("nothing"), LISTING_URL);
    assert!(empty.load_listing().is_err());
    Ok(())
}

#[test]
fn config_file_selects_snapshot_mode() -> Result<()> {
    let temp = tempdir()?;
    let snapshot = setup_snapshot(temp.path())?;
    let config_path = temp.path().join("scraper.toml");
    fs::write(
        &config_path,
        format!(
            "[portal]\nlisting_url = \"{LISTING_URL}\"\n\n[browser]\nmode = \"snapshot\"\nsnapshot_dir = \"{}\"\n",
            snapshot.root.display()
        ),
    )?;

    let config = load_config(&config_path)?;
    assert_eq!(config.browser.mode, BrowserMode::Snapshot);
    assert_eq!(config.browser.detail_timeout_secs, 60);
    assert_eq!(config.portal.list_container, "#latestTenders");

    let mut navigator = open_navigator(&config.portal, &config.browser)?;
    assert!(navigator.load_listing()?.html.contains("RCD/2024/07"));
    Ok(())
}

#[test]
fn invalid_config_is_rejected() -> Result<()> {
    let mut config = ScraperConfig::default();
    assert!(config.validate().is_ok());

    config.browser.mode = BrowserMode::Snapshot;
    assert!(config.validate().is_err());

    let mut config = ScraperConfig::default();
    config.portal.row_selector = "tr[".to_string();
    assert!(config.validate().is_err());

    let temp = tempdir()?;
    let missing = load_config(&temp.path().join("absent.toml"))?;
    assert_eq!(missing.portal.row_selector, "#latestTenders table tbody tr");
    Ok(())
}
