use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::competitor::{Competitor, Event};
use crate::trace::Trace;

/// Identity of a raw lap dump: its path, size and modification time.
///
/// A rewritten file or a different data root yields a different key.
pub fn source_key(path: &Path) -> io::Result<String> {
    let meta = fs::metadata(path)?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let dur = modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();

    let mut hasher = DefaultHasher::new();
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    canonical.to_string_lossy().hash(&mut hasher);
    meta.len().hash(&mut hasher);
    (dur.as_secs(), dur.subsec_nanos()).hash(&mut hasher);
    Ok(format!("{:016x}", hasher.finish()))
}

/// Explicit handle to the on-disk trace cache.
///
/// Traces are stored as JSON files named `<event-slug>-<CODE>-<key>.json`,
/// where `key` comes from [`source_key`]. A disabled handle never hits the
/// filesystem.
#[derive(Debug)]
pub struct TraceCache {
    dir: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl TraceCache {
    pub fn init(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("trace cache at {}", dir.display());
        Ok(Self {
            dir: Some(dir),
            write_lock: Mutex::new(()),
        })
    }

    pub fn disabled() -> Self {
        Self {
            dir: None,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn entry_prefix(event: Event, competitor: Competitor) -> String {
        format!("{}-{}-", event.slug(), competitor.code())
    }

    fn entry_path(dir: &Path, event: Event, competitor: Competitor, key: &str) -> PathBuf {
        dir.join(format!("{}{}.json", Self::entry_prefix(event, competitor), key))
    }

    /// Unreadable or stale-format entries count as misses.
    pub fn load(&self, event: Event, competitor: Competitor, key: &str) -> Option<Trace> {
        let dir = self.dir.as_deref()?;
        let path = Self::entry_path(dir, event, competitor, key);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Trace>(&text) {
            Ok(trace) if trace.competitor == competitor => {
                debug!("cache hit {}", path.display());
                Some(trace)
            }
            _ => {
                debug!("ignoring unusable cache entry {}", path.display());
                None
            }
        }
    }

    pub fn store(&self, event: Event, key: &str, trace: &Trace) -> io::Result<()> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(());
        };
        let path = Self::entry_path(dir, event, trace.competitor, key);
        let text = serde_json::to_string(trace)?;
        let _guard = self.write_lock.lock();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Drop every cached trace. Returns how many entries were removed.
    pub fn invalidate(&self) -> io::Result<usize> {
        let removed = self.remove_matching(|_| true)?;
        info!("invalidated {} cached traces", removed);
        Ok(removed)
    }

    /// Drop every cached trace of one event, whatever source it came from.
    pub fn invalidate_event(&self, event: Event) -> io::Result<usize> {
        let prefixes: Vec<String> = Competitor::ALL
            .into_iter()
            .map(|competitor| Self::entry_prefix(event, competitor))
            .collect();
        self.remove_matching(|name| prefixes.iter().any(|p| name.starts_with(p.as_str())))
    }

    fn remove_matching(&self, matches: impl Fn(&str) -> bool) -> io::Result<usize> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(0);
        };
        let _guard = self.write_lock.lock();
        let mut removed = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if matches(name) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
