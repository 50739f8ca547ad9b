//! Persistence of per-host state.
//!
//! The monitor keeps two small tables between runs: the last observed status
//! of every host, and the recipients each host's alerts go to. Both live in a
//! [`KeyValueStore`]; the default backing is the TOML config file itself, so a
//! run leaves the operator's file updated in place.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use toml_edit::DocumentMut;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{RecipientList, SiteStatus};

pub const STATUS_SECTION: &str = "site_status";
pub const RECIPIENT_SECTION: &str = "site_to_email_list_mapping";

/// Sectioned string key-value storage. Every `set` is durable on return and
/// only touches its own key.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores sections as TOML tables in a single file, rewritten whole on each
/// `set`. Comments, key order and layout of the rest of the file survive.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<DocumentMut, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DocumentMut::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        text.parse().map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, doc: &DocumentMut) -> Result<(), StoreError> {
        // Write beside the target and rename so an interrupted run never
        // leaves a truncated file behind.
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, doc.to_string())
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

impl KeyValueStore for TomlFileStore {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        let doc = self.load()?;
        let Some(item) = doc.get(section) else {
            return Ok(None);
        };
        let table = item
            .as_table_like()
            .ok_or_else(|| StoreError::NotATable(section.to_string()))?;
        Ok(table.get(key).map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string().trim().to_string(),
        }))
    }

    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut doc = self.load()?;
        let table = doc
            .entry(section)
            .or_insert_with(toml_edit::table)
            .as_table_like_mut()
            .ok_or_else(|| StoreError::NotATable(section.to_string()))?;
        table.insert(key, toml_edit::value(value));
        self.save(&doc)
    }
}

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sections: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        let sections = self.sections.lock().unwrap_or_else(|p| p.into_inner());
        Ok(sections.get(section).and_then(|s| s.get(key)).cloned())
    }

    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut sections = self.sections.lock().unwrap_or_else(|p| p.into_inner());
        sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Last known status of each host. The only writer of the status section.
#[derive(Clone)]
pub struct StatusStore {
    backing: Arc<dyn KeyValueStore>,
}

impl StatusStore {
    pub fn new(backing: Arc<dyn KeyValueStore>) -> Self {
        Self { backing }
    }

    /// Returns the stored status, provisioning an empty record for a host
    /// that has never been seen.
    pub fn get(&self, host: &str) -> Result<SiteStatus, StoreError> {
        match self.backing.get(STATUS_SECTION, host)? {
            Some(record) => {
                let (status, recognised) = SiteStatus::from_record(&record);
                if !recognised {
                    warn!(host, record = %record, "Unrecognised stored status, treating as unknown");
                }
                Ok(status)
            }
            None => {
                debug!(host, "No stored status, provisioning empty record");
                self.backing.set(STATUS_SECTION, host, SiteStatus::Unknown.as_record())?;
                Ok(SiteStatus::Unknown)
            }
        }
    }

    pub fn set(&self, host: &str, status: SiteStatus) -> Result<(), StoreError> {
        self.backing.set(STATUS_SECTION, host, status.as_record())
    }
}

/// Host to recipient mapping with a default that is written back on first use.
#[derive(Clone)]
pub struct RecipientBook {
    backing: Arc<dyn KeyValueStore>,
    default_recipients: String,
}

impl RecipientBook {
    pub fn new(backing: Arc<dyn KeyValueStore>, default_recipients: impl Into<String>) -> Self {
        Self {
            backing,
            default_recipients: default_recipients.into(),
        }
    }

    pub fn resolve(&self, host: &str) -> Result<RecipientList, StoreError> {
        match self.backing.get(RECIPIENT_SECTION, host)? {
            Some(mapping) => Ok(RecipientList::parse(&mapping)),
            None => {
                debug!(host, "No recipient mapping, adopting default recipients");
                self.backing
                    .set(RECIPIENT_SECTION, host, &self.default_recipients)?;
                Ok(RecipientList::parse(&self.default_recipients))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file_store() -> (TomlFileStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("site-monitor-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        (TomlFileStore::new(dir.join("monitor.toml")), dir)
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = StatusStore::new(Arc::new(MemoryStore::new()));
        store.set("a.example.com", SiteStatus::Down).unwrap();
        assert_eq!(store.get("a.example.com").unwrap(), SiteStatus::Down);
        store.set("a.example.com", SiteStatus::Up).unwrap();
        assert_eq!(store.get("a.example.com").unwrap(), SiteStatus::Up);
    }

    #[test]
    fn set_leaves_other_hosts_alone() {
        let store = StatusStore::new(Arc::new(MemoryStore::new()));
        store.set("a.example.com", SiteStatus::Up).unwrap();
        store.set("b.example.com", SiteStatus::Up).unwrap();
        store.set("a.example.com", SiteStatus::Down).unwrap();
        assert_eq!(store.get("b.example.com").unwrap(), SiteStatus::Up);
    }

    #[test]
    fn unseen_host_is_unknown_and_provisioned() {
        let backing = Arc::new(MemoryStore::new());
        let store = StatusStore::new(backing.clone());

        assert_eq!(backing.get(STATUS_SECTION, "new.example.com").unwrap(), None);
        assert_eq!(store.get("new.example.com").unwrap(), SiteStatus::Unknown);
        assert_eq!(
            backing.get(STATUS_SECTION, "new.example.com").unwrap(),
            Some(String::new())
        );
        assert_eq!(store.get("new.example.com").unwrap(), SiteStatus::Unknown);
    }

    #[test]
    fn garbage_record_reads_as_unknown() {
        let backing = Arc::new(MemoryStore::new());
        backing.set(STATUS_SECTION, "x.example.com", "maybe").unwrap();
        let store = StatusStore::new(backing);
        assert_eq!(store.get("x.example.com").unwrap(), SiteStatus::Unknown);
    }

    #[test]
    fn recipient_default_is_written_back() {
        let backing = Arc::new(MemoryStore::new());
        backing
            .set(RECIPIENT_SECTION, "mapped.example.com", "a@example.com, b@example.com")
            .unwrap();
        let book = RecipientBook::new(backing.clone(), "ops@example.com");

        let mapped = book.resolve("mapped.example.com").unwrap();
        assert_eq!(mapped.addresses(), ["a@example.com", "b@example.com"]);

        let fallback = book.resolve("other.example.com").unwrap();
        assert_eq!(fallback.addresses(), ["ops@example.com"]);
        assert_eq!(
            backing.get(RECIPIENT_SECTION, "other.example.com").unwrap().as_deref(),
            Some("ops@example.com")
        );
    }

    #[test]
    fn file_store_preserves_unrelated_content() {
        let (file, dir) = temp_file_store();
        fs::write(
            file.path(),
            "[settings]\nlogging_level = \"debug\"\n\n[site_status]\n\"b.example.com\" = \"up\"\n",
        )
        .unwrap();

        let store = StatusStore::new(Arc::new(file.clone()));
        store.set("a.example.com", SiteStatus::Down).unwrap();

        let doc: toml::Table = toml::from_str(&fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(doc["settings"]["logging_level"].as_str(), Some("debug"));
        assert_eq!(doc["site_status"]["a.example.com"].as_str(), Some("down"));
        assert_eq!(doc["site_status"]["b.example.com"].as_str(), Some("up"));
        assert_eq!(store.get("a.example.com").unwrap(), SiteStatus::Down);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_store_creates_missing_file() {
        let (file, dir) = temp_file_store();
        assert_eq!(file.get(STATUS_SECTION, "a.example.com").unwrap(), None);
        file.set(STATUS_SECTION, "a.example.com", "up").unwrap();
        assert_eq!(
            file.get(STATUS_SECTION, "a.example.com").unwrap().as_deref(),
            Some("up")
        );
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_store_rejects_scalar_section() {
        let (file, dir) = temp_file_store();
        fs::write(file.path(), "site_status = 3\n").unwrap();
        assert!(matches!(
            file.set(STATUS_SECTION, "a.example.com", "up"),
            Err(StoreError::NotATable(_))
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_store_keeps_operator_comments() {
        let (file, dir) = temp_file_store();
        fs::write(
            file.path(),
            "# operator notes\n[settings]\nlog_dir = \"log\" # keep\n\n[email]\nserver = \"smtp.example.com\"\n",
        )
        .unwrap();

        let store = StatusStore::new(Arc::new(file.clone()));
        assert_eq!(store.get("a.example.com").unwrap(), SiteStatus::Unknown);
        store.set("a.example.com", SiteStatus::Up).unwrap();

        let after = fs::read_to_string(file.path()).unwrap();
        assert!(after.starts_with("# operator notes\n[settings]\nlog_dir = \"log\" # keep\n"));
        assert!(after.find("[settings]").unwrap() < after.find("[email]").unwrap());
        assert!(after.contains("[site_status]"));
        assert!(after.contains("\"a.example.com\" = \"up\""));
        fs::remove_dir_all(dir).unwrap();
    }
}
