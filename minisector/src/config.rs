use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::attribute::{validate_segment_count, BoundaryPolicy};
use crate::error::{MinisectorError, Result};

/// Range of minisector counts a front end may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentRange {
    pub min: usize,
    pub max: usize,
    pub step: usize,
    pub default: usize,
}

impl Default for SegmentRange {
    fn default() -> Self {
        Self {
            min: 25,
            max: 35,
            step: 5,
            default: 25,
        }
    }
}

impl SegmentRange {
    /// Checks `requested` against the range; values must sit on the step grid from `min`.
    pub fn check(&self, requested: i64) -> Result<usize> {
        let count = validate_segment_count(requested)?;
        let on_grid = count >= self.min && (count - self.min) % self.step.max(1) == 0;
        if count > self.max || !on_grid {
            return Err(MinisectorError::SegmentCountOutOfRange {
                requested,
                min: self.min,
                max: self.max,
                step: self.step,
            });
        }
        Ok(count)
    }

    pub fn values(&self) -> Vec<usize> {
        (self.min..=self.max).step_by(self.step.max(1)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Display label only; which laps are read is decided by the data directory.
    pub season: u16,
    /// Session code, `Q` for qualifying. Display label like `season`.
    pub session: String,
    pub boundary: BoundaryPolicy,
    pub segments: SegmentRange,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            season: 2021,
            session: "Q".to_string(),
            boundary: BoundaryPolicy::default(),
            segments: SegmentRange::default(),
        }
    }
}

impl ComparisonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            MinisectorError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)
            .map_err(|e| MinisectorError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let range = &self.segments;
        if range.min == 0 || range.step == 0 {
            return Err(MinisectorError::Config(
                "segments.min and segments.step must be at least 1".into(),
            ));
        }
        if range.min > range.max {
            return Err(MinisectorError::Config(format!(
                "segments.min ({}) exceeds segments.max ({})",
                range.min, range.max
            )));
        }
        range
            .check(range.default as i64)
            .map_err(|e| MinisectorError::Config(format!("segments.default: {}", e)))?;
        if self.session.trim().is_empty() {
            return Err(MinisectorError::Config("session must not be empty".into()));
        }
        Ok(())
    }
}
