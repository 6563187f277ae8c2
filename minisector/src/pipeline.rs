use serde::{Deserialize, Serialize};
use tracing::info;

use crate::attribute::{validate_segment_count, Attribution, Attributor};
use crate::competitor::{Competitor, Event};
use crate::error::Result;
use crate::loader::TraceSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub event: Event,
    pub attribution: Attribution,
}

impl Comparison {
    pub fn title(&self) -> String {
        format!("{}: fastest driver per minisector", self.event)
    }
}

/// Load both fastest laps for `event` and attribute `segments` minisectors.
pub fn compare<S: TraceSource + ?Sized>(
    source: &S,
    event: Event,
    segments: i64,
    attributor: &Attributor,
) -> Result<Comparison> {
    validate_segment_count(segments)?;
    let ver = source.fastest_trace(event, Competitor::Verstappen)?;
    let ham = source.fastest_trace(event, Competitor::Hamilton)?;
    let attribution = attributor.attribute(&ver, &ham, segments)?;

    let wins = attribution.wins();
    info!(
        "{}: {} minisectors over {:.0} m ({} + {} samples), VER {} / HAM {}",
        event,
        attribution.segment_count,
        attribution.total_distance,
        ver.len(),
        ham.len(),
        wins.get(&Competitor::Verstappen).copied().unwrap_or(0),
        wins.get(&Competitor::Hamilton).copied().unwrap_or(0),
    );
    Ok(Comparison { event, attribution })
}
