// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use sendur_app::Lead;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

pub const APP_NAME: &str = "sendur";
pub const LEADS_CACHE_KEY: &str = "leads";
pub const SESSION_ENV: &str = "SENDUR_SESSION";
const LAST_USED_FILE: &str = ".last-used";

/// String key/value storage that lives as long as one user session. Values
/// are stored verbatim.
pub trait SessionCache {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<C: SessionCache + ?Sized> SessionCache for Box<C> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Session bound to the running process.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionCache {
    entries: HashMap<String, String>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

}

impl SessionCache for MemorySessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Session stored as one directory per session id, one file per key. Lets
/// several client launches from the same shell share what was already
/// fetched.
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    dir: PathBuf,
}

impl FileSessionCache {
    pub fn open(root: &Path, session_id: &str) -> Result<Self> {
        validate_session_id(session_id)?;
        let dir = root.join(session_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("create session cache directory {}", dir.display()))?;
        let cache = Self { dir };
        cache.touch()?;
        Ok(cache)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sha256_hex(key.as_bytes())))
    }

    /// Marks the session as in use so eviction from another launch skips it.
    fn touch(&self) -> Result<()> {
        let path = self.dir.join(LAST_USED_FILE);
        let stamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        fs::write(&path, stamp.to_string())
            .with_context(|| format!("mark session used at {}", path.display()))
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => {
                if let Err(error) = self.touch() {
                    warn!(error = %format!("{error:#}"), "session not marked as used");
                }
                Ok(Some(value))
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => {
                Err(error).with_context(|| format!("read session entry {}", path.display()))
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.entry_path(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .with_context(|| format!("write session entry {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("move session entry into place at {}", path.display()))?;
        Ok(())
    }
}

/// Cached lead collection, or `None` on a miss. An entry that no longer
/// decodes counts as a miss.
pub fn read_cached_leads(cache: &dyn SessionCache) -> Option<Vec<Lead>> {
    let raw = match cache.get(LEADS_CACHE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            warn!(error = %format!("{error:#}"), "session cache read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(leads) => Some(leads),
        Err(error) => {
            warn!(%error, "discarding undecodable cached leads");
            None
        }
    }
}

pub fn write_cached_leads(cache: &mut dyn SessionCache, raw: &str) -> Result<()> {
    cache
        .set(LEADS_CACHE_KEY, raw)
        .context("store leads in session cache")
}

pub fn session_cache_root() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().ok_or_else(|| {
        anyhow!("cannot resolve cache directory; set XDG_CACHE_HOME or platform equivalent")
    })?;
    let dir = cache_root.join(APP_NAME).join("sessions");
    fs::create_dir_all(&dir)
        .with_context(|| format!("create cache directory {}", dir.display()))?;
    Ok(dir)
}

/// `SENDUR_SESSION` when set, otherwise the parent process id so every
/// launch from the same shell lands in the same session.
pub fn default_session_id() -> String {
    if let Ok(value) = env::var(SESSION_ENV)
        && !value.trim().is_empty()
    {
        return value.trim().to_owned();
    }
    format!("ppid-{}", parent_process_id())
}

#[cfg(unix)]
fn parent_process_id() -> u32 {
    std::os::unix::process::parent_id()
}

#[cfg(not(unix))]
fn parent_process_id() -> u32 {
    std::process::id()
}

pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() {
        bail!("session id must not be empty");
    }
    if session_id.len() > 64 {
        bail!("session id {session_id:?} is longer than 64 characters");
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || session_id.starts_with('.')
    {
        bail!(
            "session id {session_id:?} may only contain letters, digits, '-', '_' and '.', and must not start with '.'"
        );
    }
    Ok(())
}

/// Removes session directories untouched for longer than `ttl`. Opening a
/// session or reading a hit from it counts as a touch. A zero TTL disables
/// eviction.
pub fn evict_stale_sessions(root: &Path, ttl: Duration) -> Result<usize> {
    if ttl.is_zero() || !root.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0usize;
    for entry in fs::read_dir(root).with_context(|| format!("read cache dir {}", root.display()))? {
        let entry = entry?;
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if !metadata.is_dir() {
            continue;
        }
        let Some(last_used) = session_last_used(&entry.path(), &metadata) else {
            continue;
        };
        if now.duration_since(last_used).unwrap_or(Duration::ZERO) > ttl
            && fs::remove_dir_all(entry.path()).is_ok()
        {
            removed += 1;
        }
    }

    Ok(removed)
}

fn session_last_used(dir: &Path, metadata: &fs::Metadata) -> Option<SystemTime> {
    let modified = metadata.modified().ok()?;
    let stamped = fs::metadata(dir.join(LAST_USED_FILE))
        .and_then(|stamp| stamp.modified())
        .ok();
    Some(stamped.map_or(modified, |stamped| stamped.max(modified)))
}

fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
