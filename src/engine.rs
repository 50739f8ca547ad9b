use tracing::{error, info, instrument, warn};

use crate::models::{CheckOutcome, RecipientList, Site, SiteStatus, TransitionEvent};
use crate::notify::Notifier;
use crate::probe::Prober;
use crate::store::StatusStore;

/// One site's monitor for the current run.
#[derive(Debug, Clone)]
pub struct SiteMonitor {
    pub site: Site,
    pub recipients: RecipientList,
    prev_status: SiteStatus,
    curr_status: SiteStatus,
}

impl SiteMonitor {
    pub fn new(site: Site, prev_status: SiteStatus, recipients: RecipientList) -> Self {
        Self {
            site,
            recipients,
            prev_status,
            curr_status: prev_status,
        }
    }

    pub fn host(&self) -> &str {
        &self.site.host
    }

    pub fn prev_status(&self) -> SiteStatus {
        self.prev_status
    }

    pub fn curr_status(&self) -> SiteStatus {
        self.curr_status
    }

    /// Probes the sentinel, then the site, and notifies on an Up/Down
    /// transition. Never fails: every problem ends up in the log.
    #[instrument(name = "site", skip_all, fields(host = %self.site.host))]
    pub async fn check(
        &mut self,
        sentinel_url: &str,
        prober: &dyn Prober,
        notifier: &dyn Notifier,
    ) -> CheckOutcome {
        let sentinel = prober.probe(sentinel_url).await;
        if !sentinel.is_success() {
            warn!(
                "Can't even hit {}. Better luck next time. Returned with {}",
                sentinel_url,
                sentinel.code()
            );
            return CheckOutcome::Aborted {
                sentinel_code: sentinel.code(),
            };
        }

        info!("Checking status of {}", self.site.url);
        let observed = prober.probe(self.site.url.as_str()).await;
        let code = observed.code();

        let next = match (observed.is_success(), self.prev_status) {
            (false, SiteStatus::Down) => None,
            (false, _) => Some(SiteStatus::Down),
            (true, SiteStatus::Down) => Some(SiteStatus::Up),
            (true, _) => {
                // First sighting of a healthy site is recorded silently.
                self.curr_status = SiteStatus::Up;
                None
            }
        };

        let Some(to) = next else {
            return CheckOutcome::Unchanged(self.curr_status);
        };

        self.curr_status = to;
        let event = TransitionEvent {
            host: self.site.host.clone(),
            url: self.site.url.clone(),
            from: self.prev_status,
            to,
            observed_code: code,
        };
        match to {
            SiteStatus::Down => info!("{} is down. Site status is {}", self.site.url, code),
            _ => info!("{} is up again. Site status is {}", self.site.url, code),
        }
        notifier
            .notify(&self.recipients, &event.subject(), &event.body())
            .await;
        CheckOutcome::Transitioned(event)
    }
}

/// Tally of a completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub aborted: usize,
    pub transitioned: usize,
    pub persist_failures: usize,
}

/// Checks every monitor once, in order, persisting each host's status as soon
/// as its check completes.
pub async fn run_once(
    monitors: &mut [SiteMonitor],
    sentinel_url: &str,
    prober: &dyn Prober,
    notifier: &dyn Notifier,
    statuses: &StatusStore,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for monitor in monitors.iter_mut() {
        let outcome = monitor.check(sentinel_url, prober, notifier).await;
        summary.checked += 1;
        match &outcome {
            CheckOutcome::Aborted { .. } => summary.aborted += 1,
            CheckOutcome::Transitioned(_) => summary.transitioned += 1,
            CheckOutcome::Unchanged(_) => {}
        }

        if let Some(status) = outcome.status_to_persist() {
            if let Err(e) = statuses.set(monitor.host(), status) {
                summary.persist_failures += 1;
                error!(host = %monitor.host(), "Failed to persist status {}: {}", status, e);
            }
        }
    }

    info!(
        "Run completed: {} checked, {} aborted, {} transitioned, {} not persisted",
        summary.checked, summary.aborted, summary.transitioned, summary.persist_failures
    );
    summary
}
