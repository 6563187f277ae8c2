//! Trace loading: lap dumps on disk, fastest-lap selection and distance
//! integration, fronted by an explicit [`TraceCache`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{source_key, TraceCache};
use crate::competitor::{Competitor, Event};
use crate::error::{MinisectorError, Result};
use crate::trace::{Sample, Trace};

/// Supplies a competitor's fastest lap for an event.
pub trait TraceSource {
    fn fastest_trace(&self, event: Event, competitor: Competitor) -> Result<Trace>;
}

/// One telemetry row as exported by the timing provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    /// Seconds since the start of the lap
    pub time_s: f64,
    pub x: f64,
    pub y: f64,
    /// Speed in km/h
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub lap_number: u32,
    /// `None` for deleted or untimed laps
    pub lap_time_s: Option<f64>,
    pub telemetry: Vec<TelemetryRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLaps {
    pub laps: Vec<LapRecord>,
}

/// The lap with the smallest finite lap time; ties keep the earliest lap.
pub fn pick_fastest(laps: &[LapRecord]) -> Option<&LapRecord> {
    laps.iter()
        .filter(|lap| lap.lap_time_s.is_some_and(f64::is_finite))
        .fold(None, |best: Option<&LapRecord>, lap| match best {
            Some(current) if current.lap_time_s <= lap.lap_time_s => Some(current),
            _ => Some(lap),
        })
}

/// Integrate speed over time into cumulative distance (meters).
///
/// The first step is measured from the lap start, so a row at `t = 0.2 s`
/// already carries the distance covered during those 0.2 s.
pub fn add_distance(rows: &[TelemetryRow]) -> Vec<Sample> {
    let mut out = Vec::with_capacity(rows.len());
    let mut distance = 0.0;
    let mut prev_time = 0.0;
    let mut dropped = 0usize;
    for row in rows {
        if !(row.time_s.is_finite() && row.x.is_finite() && row.y.is_finite())
            || !row.speed.is_finite()
        {
            dropped += 1;
            continue;
        }
        let dt = (row.time_s - prev_time).max(0.0);
        distance += row.speed / 3.6 * dt;
        prev_time = row.time_s;
        out.push(Sample::new(row.x, row.y, distance, row.speed));
    }
    if dropped > 0 {
        debug!("dropped {} telemetry rows with non-finite values", dropped);
    }
    out
}

/// Reads `<root>/<event-slug>/<CODE>.json` lap dumps.
#[derive(Debug)]
pub struct FileTraceSource {
    root: PathBuf,
    cache: TraceCache,
}

impl FileTraceSource {
    pub fn new(root: impl Into<PathBuf>, cache: TraceCache) -> Self {
        Self {
            root: root.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &TraceCache {
        &self.cache
    }

    pub fn session_path(&self, event: Event, competitor: Competitor) -> PathBuf {
        self.root
            .join(event.slug())
            .join(format!("{}.json", competitor.code()))
    }

    fn read_session(path: &Path) -> std::result::Result<SessionLaps, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&text).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }
}

impl TraceSource for FileTraceSource {
    fn fastest_trace(&self, event: Event, competitor: Competitor) -> Result<Trace> {
        let unavailable = |reason: String| MinisectorError::TraceUnavailable {
            event,
            competitor,
            reason,
        };

        let path = self.session_path(event, competitor);
        let key = source_key(&path)
            .map_err(|e| unavailable(format!("failed to read {}: {}", path.display(), e)))?;
        if let Some(trace) = self.cache.load(event, competitor, &key) {
            return Ok(trace);
        }

        let session = Self::read_session(&path).map_err(unavailable)?;
        let lap = pick_fastest(&session.laps)
            .ok_or_else(|| unavailable("no timed lap in session".to_string()))?;
        let trace = Trace::new(competitor, add_distance(&lap.telemetry));
        debug!(
            "{} {}: fastest lap {} ({} samples)",
            event,
            competitor,
            lap.lap_number,
            trace.len()
        );

        if let Err(err) = self.cache.store(event, &key, &trace) {
            warn!("failed to cache {} {}: {}", event, competitor, err);
        }
        Ok(trace)
    }
}

/// Traces held in memory, keyed by event and competitor.
#[derive(Debug, Default, Clone)]
pub struct MemoryTraceSource {
    traces: HashMap<(Event, Competitor), Trace>,
}

impl MemoryTraceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, event: Event, trace: Trace) {
        self.traces.insert((event, trace.competitor), trace);
    }

    pub fn with(mut self, event: Event, trace: Trace) -> Self {
        self.insert(event, trace);
        self
    }
}

impl TraceSource for MemoryTraceSource {
    fn fastest_trace(&self, event: Event, competitor: Competitor) -> Result<Trace> {
        self.traces
            .get(&(event, competitor))
            .cloned()
            .ok_or_else(|| MinisectorError::TraceUnavailable {
                event,
                competitor,
                reason: "not loaded".to_string(),
            })
    }
}

impl<T: TraceSource + ?Sized> TraceSource for &T {
    fn fastest_trace(&self, event: Event, competitor: Competitor) -> Result<Trace> {
        (**self).fastest_trace(event, competitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(time_s: f64, speed: f64) -> TelemetryRow {
        TelemetryRow {
            time_s,
            x: time_s * 10.0,
            y: -time_s,
            speed,
        }
    }

    fn lap(lap_number: u32, lap_time_s: Option<f64>, speed: f64) -> LapRecord {
        LapRecord {
            lap_number,
            lap_time_s,
            telemetry: (0..5).map(|i| row(i as f64 * 0.5, speed)).collect(),
        }
    }

    fn write_session(root: &Path, event: Event, competitor: Competitor, laps: Vec<LapRecord>) {
        let dir = root.join(event.slug());
        fs::create_dir_all(&dir).unwrap();
        let text = serde_json::to_string(&SessionLaps { laps }).unwrap();
        fs::write(dir.join(format!("{}.json", competitor.code())), text).unwrap();
    }

    #[test]
    fn fastest_lap_ignores_untimed_laps() {
        let laps = vec![
            lap(1, Some(91.2), 100.0),
            lap(2, None, 100.0),
            lap(3, Some(88.4), 100.0),
            lap(4, Some(f64::NAN), 100.0),
            lap(5, Some(88.4), 100.0),
        ];
        assert_eq!(pick_fastest(&laps).map(|l| l.lap_number), Some(3));
        assert!(pick_fastest(&[lap(1, None, 1.0)]).is_none());
    }

    #[test]
    fn distance_is_integrated_from_speed() {
        // 36 km/h = 10 m/s
        let rows = vec![row(0.0, 36.0), row(1.0, 36.0), row(2.5, 72.0)];
        let samples = add_distance(&rows);
        let distances: Vec<f64> = samples.iter().map(|s| s.distance).collect();
        assert_eq!(distances.len(), 3);
        assert!((distances[0] - 0.0).abs() < 1e-9);
        assert!((distances[1] - 10.0).abs() < 1e-9);
        assert!((distances[2] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn first_row_counts_time_since_lap_start() {
        let samples = add_distance(&[row(0.5, 36.0)]);
        assert!((samples[0].distance - 5.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_rows_are_dropped() {
        let rows = vec![row(0.0, 36.0), row(1.0, f64::NAN), row(2.0, 36.0)];
        let samples = add_distance(&rows);
        assert_eq!(samples.len(), 2);
        assert!((samples[1].distance - 20.0).abs() < 1e-9);
    }

    #[test]
    fn file_source_picks_fastest_lap_and_caches_it() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data");
        let cache_dir = tmp.path().join("cache");
        write_session(
            &data,
            Event::Monza,
            Competitor::Verstappen,
            vec![lap(1, Some(81.0), 200.0), lap(2, Some(80.5), 250.0)],
        );
        let source = FileTraceSource::new(&data, TraceCache::init(&cache_dir).unwrap());

        let trace = source
            .fastest_trace(Event::Monza, Competitor::Verstappen)
            .unwrap();
        assert_eq!(trace.competitor, Competitor::Verstappen);
        assert_eq!(trace.len(), 5);
        assert!(trace.samples.iter().all(|s| s.speed == 250.0));
        assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 1);

        let cached = source
            .fastest_trace(Event::Monza, Competitor::Verstappen)
            .unwrap();
        assert_eq!(cached.len(), trace.len());
        for (a, b) in cached.samples.iter().zip(&trace.samples) {
            assert!((a.distance - b.distance).abs() < 1e-9);
        }
        assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 1);

        // A rewritten dump is picked up instead of the stale entry.
        write_session(
            &data,
            Event::Monza,
            Competitor::Verstappen,
            vec![
                lap(1, Some(81.0), 200.0),
                lap(2, Some(80.5), 250.0),
                lap(3, Some(79.9), 300.0),
            ],
        );
        let updated = source
            .fastest_trace(Event::Monza, Competitor::Verstappen)
            .unwrap();
        assert!(updated.samples.iter().all(|s| s.speed == 300.0));

        source.cache().invalidate().unwrap();
        fs::remove_dir_all(&data).unwrap();
        assert!(matches!(
            source.fastest_trace(Event::Monza, Competitor::Verstappen),
            Err(MinisectorError::TraceUnavailable { .. })
        ));
    }

    #[test]
    fn data_roots_sharing_a_cache_stay_separate() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let slow_root = tmp.path().join("season_a");
        let fast_root = tmp.path().join("season_b");
        write_session(
            &slow_root,
            Event::Monza,
            Competitor::Verstappen,
            vec![lap(1, Some(80.0), 100.0)],
        );
        write_session(
            &fast_root,
            Event::Monza,
            Competitor::Verstappen,
            vec![lap(1, Some(80.0), 300.0)],
        );

        let slow = FileTraceSource::new(&slow_root, TraceCache::init(&cache_dir).unwrap());
        let fast = FileTraceSource::new(&fast_root, TraceCache::init(&cache_dir).unwrap());
        for _ in 0..2 {
            let a = slow
                .fastest_trace(Event::Monza, Competitor::Verstappen)
                .unwrap();
            let b = fast
                .fastest_trace(Event::Monza, Competitor::Verstappen)
                .unwrap();
            assert!(a.samples.iter().all(|s| s.speed == 100.0));
            assert!(b.samples.iter().all(|s| s.speed == 300.0));
        }
        assert_eq!(fs::read_dir(&cache_dir).unwrap().count(), 2);
    }

    #[test]
    fn missing_or_untimed_sessions_are_unavailable() {
        let tmp = TempDir::new().unwrap();
        write_session(
            tmp.path(),
            Event::Imola,
            Competitor::Hamilton,
            vec![lap(1, None, 150.0)],
        );
        let source = FileTraceSource::new(tmp.path(), TraceCache::disabled());

        match source.fastest_trace(Event::Imola, Competitor::Hamilton) {
            Err(MinisectorError::TraceUnavailable {
                event,
                competitor,
                reason,
            }) => {
                assert_eq!(event, Event::Imola);
                assert_eq!(competitor, Competitor::Hamilton);
                assert!(reason.contains("no timed lap"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            source.fastest_trace(Event::Imola, Competitor::Verstappen),
            Err(MinisectorError::TraceUnavailable { .. })
        ));
    }

    #[test]
    fn memory_source_returns_inserted_traces() {
        let trace = Trace::new(Competitor::Hamilton, vec![Sample::new(0.0, 0.0, 1.0, 2.0)]);
        let source = MemoryTraceSource::new().with(Event::Turkey, trace.clone());
        assert_eq!(
            source.fastest_trace(Event::Turkey, Competitor::Hamilton),
            Ok(trace)
        );
        assert!(source
            .fastest_trace(Event::Turkey, Competitor::Verstappen)
            .is_err());
    }
}
