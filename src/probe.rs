use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::models::ProbeResult;

/// Issues a single GET against a URL. Implementations never fail: any
/// transport error becomes `ProbeResult::Unreachable`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeResult;
}

pub struct HttpProber {
    http_client: reqwest::Client,
}

impl HttpProber {
    /// Builds a prober. Without a timeout the transport default applies.
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("site-monitor/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http_client: builder.build()?,
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeResult {
        match self.http_client.get(url).send().await {
            Ok(response) => ProbeResult::Status(response.status().as_u16()),
            Err(e) => {
                debug!("{} did not return any header status: {}", url, e);
                ProbeResult::Unreachable
            }
        }
    }
}
