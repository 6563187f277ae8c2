use serde::{Deserialize, Serialize};

use crate::competitor::Competitor;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    /// Cumulative distance along the lap in meters
    pub distance: f64,
    /// Speed in km/h
    pub speed: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, distance: f64, speed: f64) -> Self {
        Self {
            x,
            y,
            distance,
            speed,
        }
    }
}

/// One competitor's fastest lap, ordered by increasing distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub competitor: Competitor,
    pub samples: Vec<Sample>,
}

impl Trace {
    pub fn new(competitor: Competitor, samples: Vec<Sample>) -> Self {
        Self {
            competitor,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn max_distance(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.distance)
            .fold(None, |acc, d| Some(acc.map_or(d, |m: f64| m.max(d))))
    }
}

/// A sample tagged with its minisector and that minisector's fastest driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedSample {
    pub competitor: Competitor,
    pub x: f64,
    pub y: f64,
    pub distance: f64,
    pub speed: f64,
    /// 1-based minisector index
    pub segment: usize,
    pub winner: Competitor,
}
