use std::collections::BTreeMap;

use minisector::{Attribution, Comparison, Competitor, Event, SegmentRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CompareRequest {
    /// Event name or slug, e.g. "Saudi Arabia" or "saudi-arabia"
    pub event: String,
    pub segments: i64,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub t: i64,
    pub event: &'static str,
    pub title: String,
    pub wins: BTreeMap<Competitor, usize>,
    pub attribution: Attribution,
}

impl CompareResponse {
    pub fn new(comparison: Comparison, t: i64) -> Self {
        Self {
            t,
            event: comparison.event.name(),
            title: comparison.title(),
            wins: comparison.attribution.wins(),
            attribution: comparison.attribution,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventInfo {
    pub name: &'static str,
    pub slug: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub season: u16,
    pub session: String,
    pub events: Vec<EventInfo>,
    pub segments: SegmentRange,
}

impl EventsResponse {
    pub fn new(season: u16, session: String, segments: SegmentRange) -> Self {
        Self {
            season,
            session,
            events: Event::ALL
                .into_iter()
                .map(|event| EventInfo {
                    name: event.name(),
                    slug: event.slug(),
                })
                .collect(),
            segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_response_echoes_labels_and_lists_every_event() {
        let resp = EventsResponse::new(2021, "Q".to_string(), SegmentRange::default());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["season"], 2021);
        assert_eq!(json["session"], "Q");
        assert_eq!(resp.events.len(), Event::ALL.len());
        assert_eq!(json["events"][7]["slug"], "saudi-arabia");
        assert_eq!(json["segments"]["step"], 5);
    }
}
