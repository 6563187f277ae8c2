use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MinisectorError;

/// One of the two drivers being compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Competitor {
    #[serde(rename = "VER")]
    Verstappen,
    #[serde(rename = "HAM")]
    Hamilton,
}

impl Competitor {
    pub const ALL: [Competitor; 2] = [Competitor::Verstappen, Competitor::Hamilton];

    /// Three-letter timing code.
    pub fn code(self) -> &'static str {
        match self {
            Competitor::Verstappen => "VER",
            Competitor::Hamilton => "HAM",
        }
    }

    /// Colour class used at the render boundary (1 or 2).
    pub fn ordinal(self) -> u8 {
        match self {
            Competitor::Verstappen => 1,
            Competitor::Hamilton => 2,
        }
    }

    pub fn from_ordinal(class: u8) -> Result<Self, MinisectorError> {
        match class {
            1 => Ok(Competitor::Verstappen),
            2 => Ok(Competitor::Hamilton),
            other => Err(MinisectorError::UnknownCompetitor(other.to_string())),
        }
    }

    /// Deterministic winner for two equal means: the code that sorts first.
    pub fn tie_break(a: Competitor, b: Competitor) -> Competitor {
        if a.code() <= b.code() {
            a
        } else {
            b
        }
    }
}

impl fmt::Display for Competitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Competitor {
    type Err = MinisectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VER" => Ok(Competitor::Verstappen),
            "HAM" => Ok(Competitor::Hamilton),
            _ => Err(MinisectorError::UnknownCompetitor(s.to_string())),
        }
    }
}

/// Qualifying sessions available for comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Bahrain,
    Imola,
    Monaco,
    France,
    Netherlands,
    Monza,
    Turkey,
    SaudiArabia,
    AbuDhabi,
}

impl Event {
    pub const ALL: [Event; 9] = [
        Event::Bahrain,
        Event::Imola,
        Event::Monaco,
        Event::France,
        Event::Netherlands,
        Event::Monza,
        Event::Turkey,
        Event::SaudiArabia,
        Event::AbuDhabi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Event::Bahrain => "Bahrain",
            Event::Imola => "Imola",
            Event::Monaco => "Monaco",
            Event::France => "France",
            Event::Netherlands => "Netherlands",
            Event::Monza => "Monza",
            Event::Turkey => "Turkey",
            Event::SaudiArabia => "Saudi Arabia",
            Event::AbuDhabi => "Abu Dhabi",
        }
    }

    /// File-system friendly identifier, e.g. `saudi-arabia`.
    pub fn slug(self) -> &'static str {
        match self {
            Event::Bahrain => "bahrain",
            Event::Imola => "imola",
            Event::Monaco => "monaco",
            Event::France => "france",
            Event::Netherlands => "netherlands",
            Event::Monza => "monza",
            Event::Turkey => "turkey",
            Event::SaudiArabia => "saudi-arabia",
            Event::AbuDhabi => "abu-dhabi",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Event {
    type Err = MinisectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Event::ALL
            .into_iter()
            .find(|event| event.slug() == wanted)
            .ok_or_else(|| MinisectorError::UnknownEvent(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_mapping_round_trips() {
        for competitor in Competitor::ALL {
            let class = competitor.ordinal();
            assert_eq!(Competitor::from_ordinal(class).unwrap(), competitor);
        }
        assert_ne!(
            Competitor::Verstappen.ordinal(),
            Competitor::Hamilton.ordinal()
        );
    }

    #[test]
    fn unknown_ordinal_is_rejected() {
        assert_eq!(
            Competitor::from_ordinal(3),
            Err(MinisectorError::UnknownCompetitor("3".into()))
        );
        assert!(Competitor::from_ordinal(0).is_err());
    }

    #[test]
    fn competitor_codes_parse() {
        assert_eq!("VER".parse::<Competitor>().unwrap(), Competitor::Verstappen);
        assert_eq!(" ham ".parse::<Competitor>().unwrap(), Competitor::Hamilton);
        assert!(matches!(
            "BOT".parse::<Competitor>(),
            Err(MinisectorError::UnknownCompetitor(code)) if code == "BOT"
        ));
    }

    #[test]
    fn tie_break_prefers_lexicographically_smaller_code() {
        assert_eq!(
            Competitor::tie_break(Competitor::Verstappen, Competitor::Hamilton),
            Competitor::Hamilton
        );
        assert_eq!(
            Competitor::tie_break(Competitor::Hamilton, Competitor::Verstappen),
            Competitor::Hamilton
        );
    }

    #[test]
    fn events_parse_from_name_or_slug() {
        assert_eq!("Saudi Arabia".parse::<Event>().unwrap(), Event::SaudiArabia);
        assert_eq!("abu_dhabi".parse::<Event>().unwrap(), Event::AbuDhabi);
        assert_eq!("MONZA".parse::<Event>().unwrap(), Event::Monza);
        assert!(matches!(
            "Silverstone".parse::<Event>(),
            Err(MinisectorError::UnknownEvent(_))
        ));
    }

    #[test]
    fn competitor_serializes_as_code() {
        let json = serde_json::to_string(&Competitor::Hamilton).unwrap();
        assert_eq!(json, "\"HAM\"");
        let event: Event = serde_json::from_str("\"saudi_arabia\"").unwrap();
        assert_eq!(event, Event::SaudiArabia);
    }
}
