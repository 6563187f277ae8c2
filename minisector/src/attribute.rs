//! Minisector attribution.
//!
//! The lap distance is split into `N` equal minisectors. For every
//! minisector the mean speed of each driver is compared and the faster
//! driver "owns" it; every telemetry sample of both drivers is then tagged
//! with the owner of its minisector so the path can be drawn in one pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::competitor::Competitor;
use crate::error::{MinisectorError, Result};
use crate::trace::{MergedSample, Sample, Trace};

/// Where a sample sitting exactly on the total lap distance is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Indices past the last minisector are folded into minisector `N`.
    #[default]
    Clamp,
    /// Plain `floor(d / L) + 1`: the furthest sample lands in minisector `N + 1`.
    Overflow,
}

impl BoundaryPolicy {
    /// 1-based index of the half-open minisector `[k*L, (k+1)*L)` holding `distance`.
    pub fn segment_index(self, distance: f64, segment_length: f64, segment_count: usize) -> usize {
        // The quotient can round up onto the next integer; step back while
        // the exact product `k * L` (one rounding via mul_add) overshoots.
        let mut k = (distance / segment_length).floor();
        while k > 0.0 && k.mul_add(segment_length, -distance) > 0.0 {
            k -= 1.0;
        }
        let raw = k as usize + 1;
        match self {
            BoundaryPolicy::Clamp => raw.min(segment_count),
            BoundaryPolicy::Overflow => raw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMean {
    pub competitor: Competitor,
    pub mean_speed: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentWinner {
    /// 1-based minisector index
    pub segment: usize,
    pub start_distance: f64,
    pub end_distance: f64,
    pub means: Vec<CompetitorMean>,
    pub winner: Competitor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub segment_count: usize,
    pub total_distance: f64,
    pub segment_length: f64,
    pub boundary: BoundaryPolicy,
    /// Minisectors that contain at least one sample, ascending.
    pub segments: Vec<SegmentWinner>,
    /// Both traces merged, labelled and sorted by distance.
    pub samples: Vec<MergedSample>,
}

impl Attribution {
    /// Number of minisectors won by each driver.
    pub fn wins(&self) -> BTreeMap<Competitor, usize> {
        let mut wins: BTreeMap<Competitor, usize> =
            Competitor::ALL.into_iter().map(|c| (c, 0)).collect();
        for segment in &self.segments {
            *wins.entry(segment.winner).or_default() += 1;
        }
        wins
    }

    pub fn winner_of(&self, segment: usize) -> Option<Competitor> {
        self.segments
            .iter()
            .find(|s| s.segment == segment)
            .map(|s| s.winner)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Attributor {
    pub boundary: BoundaryPolicy,
}

impl Attributor {
    pub fn new(boundary: BoundaryPolicy) -> Self {
        Self { boundary }
    }

    /// Split the merged lap into `segments` minisectors and label every
    /// sample of both traces with the faster driver of its minisector.
    pub fn attribute(&self, first: &Trace, second: &Trace, segments: i64) -> Result<Attribution> {
        let segment_count = validate_segment_count(segments)?;
        for trace in [first, second] {
            if trace.is_empty() {
                return Err(MinisectorError::EmptyTrace(trace.competitor));
            }
        }
        for trace in [first, second] {
            for (idx, sample) in trace.samples.iter().enumerate() {
                check_sample(trace.competitor, idx, sample)?;
            }
        }

        let total_distance = first
            .samples
            .iter()
            .chain(second.samples.iter())
            .map(|s| s.distance)
            .fold(f64::NEG_INFINITY, f64::max);
        if !(total_distance.is_finite() && total_distance > 0.0) {
            return Err(MinisectorError::DegenerateInput(format!(
                "total distance {total_distance} cannot be split into minisectors"
            )));
        }
        let segment_length = total_distance / segment_count as f64;
        if !(segment_length.is_finite() && segment_length > 0.0) {
            return Err(MinisectorError::DegenerateInput(format!(
                "total distance {total_distance} is too short for {segment_count} minisectors"
            )));
        }

        let tagged: Vec<(Competitor, &Sample, usize)> = [first, second]
            .into_iter()
            .flat_map(|trace| {
                trace.samples.iter().map(move |sample| {
                    let segment =
                        self.boundary
                            .segment_index(sample.distance, segment_length, segment_count);
                    (trace.competitor, sample, segment)
                })
            })
            .collect();

        let mut sums: BTreeMap<(usize, Competitor), (f64, usize)> = BTreeMap::new();
        for &(competitor, sample, segment) in &tagged {
            let entry = sums.entry((segment, competitor)).or_insert((0.0, 0));
            entry.0 += sample.speed;
            entry.1 += 1;
        }

        let mut means_by_segment: BTreeMap<usize, Vec<CompetitorMean>> = BTreeMap::new();
        for ((segment, competitor), (sum, count)) in sums {
            means_by_segment
                .entry(segment)
                .or_default()
                .push(CompetitorMean {
                    competitor,
                    mean_speed: sum / count as f64,
                    samples: count,
                });
        }

        let mut winners: BTreeMap<usize, SegmentWinner> = BTreeMap::new();
        for (segment, means) in means_by_segment {
            let Some(winner) = fastest(&means) else {
                continue;
            };
            winners.insert(
                segment,
                SegmentWinner {
                    segment,
                    start_distance: (segment - 1) as f64 * segment_length,
                    end_distance: segment as f64 * segment_length,
                    means,
                    winner,
                },
            );
        }

        let mut samples = Vec::with_capacity(tagged.len());
        for (competitor, sample, segment) in tagged {
            let winner = winners.get(&segment).map(|w| w.winner).ok_or_else(|| {
                MinisectorError::DegenerateInput(format!("minisector {segment} has no winner"))
            })?;
            samples.push(MergedSample {
                competitor,
                x: sample.x,
                y: sample.y,
                distance: sample.distance,
                speed: sample.speed,
                segment,
                winner,
            });
        }
        // Stable: equal distances keep first-trace-then-second order.
        samples.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        debug!(
            segment_count,
            total_distance,
            segment_length,
            samples = samples.len(),
            occupied = winners.len(),
            "attributed minisectors"
        );

        Ok(Attribution {
            segment_count,
            total_distance,
            segment_length,
            boundary: self.boundary,
            segments: winners.into_values().collect(),
            samples,
        })
    }
}

/// Attribute with the default boundary policy and return only the labelled samples.
pub fn attribute(first: &Trace, second: &Trace, segments: i64) -> Result<Vec<MergedSample>> {
    Attributor::default()
        .attribute(first, second, segments)
        .map(|attribution| attribution.samples)
}

pub fn validate_segment_count(segments: i64) -> Result<usize> {
    if segments < 1 {
        return Err(MinisectorError::InvalidSegmentCount(segments));
    }
    usize::try_from(segments).map_err(|_| MinisectorError::InvalidSegmentCount(segments))
}

fn check_sample(competitor: Competitor, idx: usize, sample: &Sample) -> Result<()> {
    if !sample.distance.is_finite() || sample.distance < 0.0 {
        return Err(MinisectorError::DegenerateInput(format!(
            "{competitor} sample {idx} has distance {}",
            sample.distance
        )));
    }
    if !sample.speed.is_finite() || sample.speed < 0.0 {
        return Err(MinisectorError::DegenerateInput(format!(
            "{competitor} sample {idx} has speed {}",
            sample.speed
        )));
    }
    Ok(())
}

/// Strictly greater mean wins; equal means go through `Competitor::tie_break`.
fn fastest(means: &[CompetitorMean]) -> Option<Competitor> {
    let mut best: Option<&CompetitorMean> = None;
    for candidate in means {
        best = Some(match best {
            None => candidate,
            Some(current) if candidate.mean_speed > current.mean_speed => candidate,
            Some(current) if candidate.mean_speed == current.mean_speed => {
                if Competitor::tie_break(current.competitor, candidate.competitor)
                    == candidate.competitor
                {
                    candidate
                } else {
                    current
                }
            }
            Some(current) => current,
        });
    }
    best.map(|m| m.competitor)
}
