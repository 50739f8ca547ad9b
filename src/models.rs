use std::fmt;

use url::Url;

use crate::error::SiteError;

/// HTTP status that counts as "up". Every other code, including the
/// unreachable sentinel, counts as down.
pub const SUCCESS_CODE: u16 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteStatus {
    /// Never observed, or the stored record is empty.
    #[default]
    Unknown,
    Up,
    Down,
}

impl SiteStatus {
    /// Parses a persisted status string. Anything other than `up`/`down`
    /// reads as `Unknown`; the bool reports whether the value was recognised.
    pub fn from_record(value: &str) -> (Self, bool) {
        match value.trim() {
            "up" => (SiteStatus::Up, true),
            "down" => (SiteStatus::Down, true),
            "" => (SiteStatus::Unknown, true),
            _ => (SiteStatus::Unknown, false),
        }
    }

    pub fn as_record(&self) -> &'static str {
        match self {
            SiteStatus::Unknown => "",
            SiteStatus::Up => "up",
            SiteStatus::Down => "down",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteStatus::Unknown => f.write_str("unknown"),
            other => f.write_str(other.as_record()),
        }
    }
}

/// A monitored site, identified by the host name of its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub host: String,
    pub url: Url,
}

impl Site {
    pub fn parse(raw: &str) -> Result<Self, SiteError> {
        let url = Url::parse(raw.trim()).map_err(|source| SiteError::InvalidUrl {
            url: raw.trim().to_string(),
            source,
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| SiteError::MissingHost(url.to_string()))?
            .to_string();
        Ok(Self { host, url })
    }
}

/// Ordered, de-duplicated list of email addresses bound to a host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientList(Vec<String>);

impl RecipientList {
    /// Parses a comma-separated mapping value such as `"a@x.org, b@y.org"`.
    pub fn parse(raw: &str) -> Self {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let mut addresses: Vec<String> = Vec::new();
        for part in compact.split(',').filter(|p| !p.is_empty()) {
            if !addresses.iter().any(|a| a == part) {
                addresses.push(part.to_string());
            }
        }
        Self(addresses)
    }

    pub fn addresses(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecipientList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Outcome of a single probe. `Unreachable` stands for any transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Status(u16),
    Unreachable,
}

impl ProbeResult {
    pub fn code(&self) -> u16 {
        match self {
            ProbeResult::Status(code) => *code,
            ProbeResult::Unreachable => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code() == SUCCESS_CODE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub host: String,
    pub url: Url,
    pub from: SiteStatus,
    pub to: SiteStatus,
    pub observed_code: u16,
}

impl TransitionEvent {
    pub fn subject(&self) -> String {
        match self.to {
            SiteStatus::Down => format!("{} is down", self.host),
            _ => format!("{} is up again", self.host),
        }
    }

    pub fn body(&self) -> String {
        let state = match self.to {
            SiteStatus::Down => "is down",
            _ => "is up again",
        };
        format!("{} {}. Site status is {}.", self.url, state, self.observed_code)
    }
}

/// What a single site check produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The sentinel probe failed; nothing may be persisted.
    Aborted { sentinel_code: u16 },
    Unchanged(SiteStatus),
    Transitioned(TransitionEvent),
}

impl CheckOutcome {
    /// Status to persist, if any.
    pub fn status_to_persist(&self) -> Option<SiteStatus> {
        match self {
            CheckOutcome::Aborted { .. } => None,
            CheckOutcome::Unchanged(status) => Some(*status),
            CheckOutcome::Transitioned(event) => Some(event.to),
        }
    }
}
