use crate::config::NotifyConfig;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// Published after a successful run that created at least one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTendersAvailable {
    pub count: usize,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Receiver side of run events. Implementations must not block on delivery.
pub trait EventSink {
    fn publish(&self, event: NewTendersAvailable) -> Result<()>;
}

impl EventSink for Sender<NewTendersAvailable> {
    fn publish(&self, event: NewTendersAvailable) -> Result<()> {
        self.send(event)
            .map_err(|err| anyhow!("event subscriber is gone: {err}"))
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: NewTendersAvailable) -> Result<()> {
        Ok(())
    }
}

/// Starts a background thread that delivers events until every sender is dropped.
///
/// Without a configured webhook, events are only logged.
pub fn spawn_dispatcher(
    config: &NotifyConfig,
) -> Result<(Sender<NewTendersAvailable>, JoinHandle<()>)> {
    let client = match &config.webhook_url {
        Some(_) => Some(
            Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .context("failed to build reqwest client")?,
        ),
        None => None,
    };
    let webhook = config.webhook_url.clone();
    let (sender, receiver) = channel();

    let handle = std::thread::Builder::new()
        .name("tender-notify".to_string())
        .spawn(move || dispatch_loop(receiver, client, webhook))
        .context("failed to spawn notification thread")?;

    Ok((sender, handle))
}

fn dispatch_loop(
    receiver: Receiver<NewTendersAvailable>,
    client: Option<Client>,
    webhook: Option<String>,
) {
    for event in receiver {
        match (&client, &webhook) {
            (Some(client), Some(url)) => {
                if let Err(err) = deliver(client, url, &event) {
                    warn!(%url, error = %err, "new tenders notification failed");
                }
            }
            _ => info!(
                count = event.count,
                since = %event.since,
                until = %event.until,
                "new tenders available"
            ),
        }
    }
}

fn deliver(client: &Client, url: &str, event: &NewTendersAvailable) -> Result<()> {
    let response = client
        .post(url)
        .json(event)
        .send()
        .with_context(|| format!("request to {url} failed"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("request to {url} failed with status {status}");
    }
    info!(%url, count = event.count, "new tenders notification delivered");
    Ok(())
}
