//! Independently refreshed blacklist sources.
//!
//! A source is either *fresh* (its entries are within the refresh interval)
//! or *stale*. Remote sources download into a cache file and re-read it;
//! local sources are edited by the operator and re-read as soon as the file
//! changes.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::address::{normalize_list, AddressSet, FilterPolicy};
use crate::error::{ControllerError, Result};
use crate::fetcher::{format_count, ListFetcher};
use crate::store::CacheStore;

/// Upper bound on a refresh interval (100 years), keeps time arithmetic in range.
const MAX_INTERVAL_SECS: u64 = 100 * 365 * 24 * 3600;

/// Where a source gets its data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Downloaded from `url` into the cache file.
    Remote { url: String },
    /// Maintained by hand in the cache file.
    Local,
}

#[derive(Debug, Clone)]
pub struct BlacklistSource {
    name: String,
    kind: SourceKind,
    path: PathBuf,
    interval: Duration,
    policy: FilterPolicy,
    last_refresh: Option<DateTime<Utc>>,
    entries: AddressSet,
}

impl BlacklistSource {
    pub fn remote(
        name: impl Into<String>,
        url: impl Into<String>,
        path: impl Into<PathBuf>,
        interval_secs: u64,
        policy: FilterPolicy,
    ) -> Self {
        Self::new(
            name.into(),
            SourceKind::Remote { url: url.into() },
            path.into(),
            interval_secs,
            policy,
        )
    }

    pub fn local(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        interval_secs: u64,
        policy: FilterPolicy,
    ) -> Self {
        Self::new(name.into(), SourceKind::Local, path.into(), interval_secs, policy)
    }

    fn new(
        name: String,
        kind: SourceKind,
        path: PathBuf,
        interval_secs: u64,
        policy: FilterPolicy,
    ) -> Self {
        let interval = Duration::seconds(interval_secs.min(MAX_INTERVAL_SECS) as i64);
        Self {
            name,
            kind,
            path,
            interval,
            policy,
            last_refresh: None,
            entries: AddressSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Current normalized entries.
    pub fn entries(&self) -> &AddressSet {
        &self.entries
    }

    /// True if never refreshed or the refresh interval has elapsed.
    pub fn should_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.last_refresh {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Bring the source up to date if it is due.
    ///
    /// Returns whether the entry set changed.
    pub async fn refresh(
        &mut self,
        now: DateTime<Utc>,
        fetcher: &dyn ListFetcher,
        store: &dyn CacheStore,
    ) -> Result<bool> {
        match self.kind.clone() {
            SourceKind::Remote { url } => self.refresh_remote(now, &url, fetcher, store).await,
            SourceKind::Local => self.refresh_local(now, store),
        }
    }

    async fn refresh_remote(
        &mut self,
        now: DateTime<Utc>,
        url: &str,
        fetcher: &dyn ListFetcher,
        store: &dyn CacheStore,
    ) -> Result<bool> {
        if !self.should_refresh(now) {
            return Ok(false);
        }

        let mut refreshed_at = now;
        if self.cache_is_stale(now, store) {
            let body = fetcher.fetch(url).await?;
            if body.is_empty() {
                return Err(ControllerError::Fetch(format!(
                    "Unable to download the blacklist from {}: empty response body",
                    url
                )));
            }
            store.write(&self.path, &body).map_err(|e| {
                ControllerError::Read(format!(
                    "Unable to write the blacklist cache {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
            info!(
                "Saved {} of {} to {}",
                format_count(body.len()),
                self.name,
                self.path.display()
            );
            // The next download is due one interval after the cache was written
            if let Ok(mtime) = store.modified(&self.path) {
                refreshed_at = refreshed_at.max(mtime);
            }
        } else {
            debug!("{}: cache {} is still fresh", self.name, self.path.display());
        }

        let changed = self.load(store)?;
        self.last_refresh = Some(refreshed_at);
        Ok(changed)
    }

    fn refresh_local(&mut self, now: DateTime<Utc>, store: &dyn CacheStore) -> Result<bool> {
        if !store.exists(&self.path) {
            let changed = !self.entries.is_empty();
            if changed {
                warn!(
                    "{}: {} disappeared, dropping {} entries",
                    self.name,
                    self.path.display(),
                    self.entries.len()
                );
                self.entries.clear();
            }
            self.last_refresh = Some(now);
            return Ok(changed);
        }

        // Filesystems may keep whole-second mtimes, so an edit made in the
        // same second as the last refresh still counts.
        let edited = match self.last_refresh {
            None => true,
            Some(last) => store
                .modified(&self.path)
                .map(|mtime| mtime >= last.trunc_subsecs(0))
                .unwrap_or(true),
        };

        if !edited && !self.should_refresh(now) {
            return Ok(false);
        }

        let changed = self.load(store)?;
        self.last_refresh = Some(now);
        Ok(changed)
    }

    /// The cache needs a new download when missing or older than the interval.
    fn cache_is_stale(&self, now: DateTime<Utc>, store: &dyn CacheStore) -> bool {
        if !store.exists(&self.path) {
            return true;
        }
        match (store.modified(&self.path), now.checked_sub_signed(self.interval)) {
            (Ok(mtime), Some(cutoff)) => mtime <= cutoff,
            (Ok(_), None) => false,
            (Err(_), _) => true,
        }
    }

    fn load(&mut self, store: &dyn CacheStore) -> Result<bool> {
        let raw = store.read(&self.path).map_err(|e| {
            ControllerError::Read(format!(
                "Unable to read the blacklist entries from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let entries = normalize_list(&String::from_utf8_lossy(&raw), self.policy);
        info!("{}: {} entries", self.name, format_count(entries.len()));

        let changed = entries != self.entries;
        self.entries = entries;
        Ok(changed)
    }
}
