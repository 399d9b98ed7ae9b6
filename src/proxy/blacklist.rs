//! Time-limited, file-backed proxy blacklist
//!
//! The file is a JSON object mapping `host:port` to the RFC 3339 instant the
//! address was blacklisted. Expiry is computed from that instant and the
//! configured duration, so changing the duration applies to existing entries.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Blacklist {
    entries: HashMap<String, DateTime<Utc>>,
    duration: ChronoDuration,
}

impl Blacklist {
    pub fn new(duration: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            duration: ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX),
        }
    }

    /// Loads the blacklist from `path`, dropping entries expired at `now`
    ///
    /// A missing file yields an empty blacklist. An unreadable or corrupt
    /// file is logged and also yields an empty blacklist; it is overwritten
    /// on the next eviction.
    pub fn load(path: &Path, duration: Duration, now: DateTime<Utc>) -> Self {
        let mut blacklist = Self::new(duration);

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, DateTime<Utc>>>(&content)
            {
                Ok(entries) => blacklist.entries = entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Ignoring corrupt blacklist file: {}", e);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read blacklist file: {}", e);
            }
        }

        let pruned = blacklist.prune(now);
        if pruned > 0 {
            tracing::debug!("Pruned {} expired blacklist entries", pruned);
        }
        blacklist
    }

    /// Writes the blacklist to `path` atomically (temp file then rename)
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }

    /// Blacklists `address` starting at `now`, replacing any earlier entry
    pub fn insert(&mut self, address: &str, now: DateTime<Utc>) {
        self.entries.insert(address.to_string(), now);
    }

    /// Whether `address` is blacklisted and not yet expired at `now`
    pub fn contains(&self, address: &str, now: DateTime<Utc>) -> bool {
        self.expires_at(address)
            .map(|expires| now < expires)
            .unwrap_or(false)
    }

    /// Instant at which the entry for `address` stops applying
    pub fn expires_at(&self, address: &str) -> Option<DateTime<Utc>> {
        self.entries
            .get(address)
            .map(|since| since.checked_add_signed(self.duration).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Removes every entry expired at `now`, returning how many were removed
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let duration = self.duration;
        let before = self.entries.len();
        self.entries.retain(|_, since| {
            since
                .checked_add_signed(duration)
                .map(|expires| now < expires)
                .unwrap_or(true)
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(600);

    #[test]
    fn test_ttl_expiry() {
        let t0 = Utc::now();
        let mut blacklist = Blacklist::new(TTL);
        blacklist.insert("10.0.0.1:8080", t0);

        let before = t0 + ChronoDuration::seconds(599);
        let after = t0 + ChronoDuration::seconds(600);

        assert!(blacklist.contains("10.0.0.1:8080", before));
        assert!(!blacklist.contains("10.0.0.1:8080", after));

        assert_eq!(blacklist.prune(before), 0);
        assert_eq!(blacklist.len(), 1);
        assert_eq!(blacklist.prune(after), 1);
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_save_and_reload_prunes_expired() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blacklist.json");
        let t0 = Utc::now();

        let mut blacklist = Blacklist::new(TTL);
        blacklist.insert("10.0.0.1:8080", t0);
        blacklist.insert("10.0.0.2:8080", t0 - ChronoDuration::seconds(900));
        blacklist.save(&path).unwrap();

        let reloaded = Blacklist::load(&path, TTL, t0);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("10.0.0.1:8080", t0));

        let later = Blacklist::load(&path, TTL, t0 + ChronoDuration::seconds(601));
        assert!(later.is_empty());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let blacklist = Blacklist::load(&dir.path().join("absent.json"), TTL, Utc::now());
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blacklist.json");
        std::fs::write(&path, "{ not json").unwrap();

        let blacklist = Blacklist::load(&path, TTL, Utc::now());
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_expires_at() {
        let t0 = Utc::now();
        let mut blacklist = Blacklist::new(TTL);
        assert!(blacklist.expires_at("10.0.0.1:8080").is_none());

        blacklist.insert("10.0.0.1:8080", t0);
        assert_eq!(
            blacklist.expires_at("10.0.0.1:8080"),
            Some(t0 + ChronoDuration::seconds(600))
        );
    }
}
