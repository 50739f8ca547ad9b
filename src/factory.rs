use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span};

use crate::engine::SiteMonitor;
use crate::models::Site;
use crate::store::{RecipientBook, StatusStore};

/// Reads the site list: one URL per line, blank lines and `#` comments
/// skipped, order preserved.
pub fn read_sites(path: &Path) -> Result<Vec<Site>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read site list {}", path.display()))?;
    parse_sites(&content).with_context(|| format!("Invalid site list {}", path.display()))
}

pub fn parse_sites(content: &str) -> Result<Vec<Site>> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| Site::parse(line).with_context(|| format!("line {}", line_no)))
        .collect()
}

/// Builds one monitor per site, resolving its previous status and recipients.
pub fn build_monitors(
    sites: Vec<Site>,
    statuses: &StatusStore,
    recipients: &RecipientBook,
) -> Result<Vec<SiteMonitor>> {
    info!("Number of site monitors to build: {}", sites.len());

    let mut monitors = Vec::with_capacity(sites.len());
    for site in sites {
        let span = info_span!("site", host = %site.host);
        let _enter = span.enter();
        debug!("Found hostname {}", site.host);

        let prev_status = statuses
            .get(&site.host)
            .with_context(|| format!("Failed to read status of {}", site.host))?;
        debug!("{} was {} last time it was checked", site.host, prev_status);

        let list = recipients
            .resolve(&site.host)
            .with_context(|| format!("Failed to resolve recipients of {}", site.host))?;
        debug!("Alerts for {} go to {}", site.host, list);

        monitors.push(SiteMonitor::new(site, prev_status, list));
    }
    Ok(monitors)
}
