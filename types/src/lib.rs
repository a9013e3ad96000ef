//! Record types shared between the extraction engine, the store and the
//! read API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Sentinels ────────────────────────────────────────────────────────────

pub const DIRECTION_UNKNOWN: &str = "Richting onbekend";
pub const CAUSE_UNKNOWN: &str = "Oorzaak onbekend";
pub const LOCATION_UNKNOWN: &str = "Locatie onbekend";
pub const HECTOMETER_UNKNOWN: &str = "Hectometer onbekend";

// ── Speed camera kind ────────────────────────────────────────────────────

/// Closed taxonomy of camera placements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlitserType {
    /// Flitspaal / vaste flitser
    Fixed,
    /// Mobiele flitser (the usual case on the flitser list)
    #[default]
    Mobile,
    /// Reported as currently active
    Active,
    /// Snelheidscontrole / trajectcontrole
    SpeedControl,
}

impl FlitserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Mobile => "mobile",
            Self::Active => "active",
            Self::SpeedControl => "speed_control",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(Self::Fixed),
            "mobile" => Some(Self::Mobile),
            "active" => Some(Self::Active),
            "speed_control" => Some(Self::SpeedControl),
            _ => None,
        }
    }
}

// ── Traffic jam ──────────────────────────────────────────────────────────

/// One jam on a monitored road.
///
/// `id` embeds the extraction time, so the same jam gets a new id on every
/// scrape. Consumers needing a stable key should use road + locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficJam {
    pub id: String,
    pub road: String,
    /// "richting <place>" or [`DIRECTION_UNKNOWN`]
    pub direction: String,
    pub source_location: String,
    pub destination_location: String,
    pub route_details: String,
    /// Taxonomy label, "A + B" composite, or [`CAUSE_UNKNOWN`]
    pub cause: String,
    /// 0 means no delay was reported
    pub delay_minutes: u32,
    /// 0.0 means no length was reported
    pub length_km: f64,
    pub last_updated: DateTime<Utc>,
}

impl TrafficJam {
    /// Case-insensitive substring match over every place-like field.
    pub fn mentions_city(&self, city: &str) -> bool {
        let needle = city.to_lowercase();
        [
            &self.source_location,
            &self.destination_location,
            &self.direction,
            &self.route_details,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

// ── Speed camera ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedCamera {
    pub id: String,
    pub road: String,
    pub location: String,
    pub direction: String,
    /// "km 102.8", "km 45 (geschat)" or [`HECTOMETER_UNKNOWN`]
    pub hectometer: String,
    #[serde(default)]
    pub flitser_type: FlitserType,
    pub is_active: bool,
    pub last_updated: DateTime<Utc>,
}

impl SpeedCamera {
    pub fn mentions_city(&self, city: &str) -> bool {
        let needle = city.to_lowercase();
        self.location.to_lowercase().contains(&needle)
            || self.direction.to_lowercase().contains(&needle)
    }
}

// ── Combined result ──────────────────────────────────────────────────────

/// The latest stored result of a scrape run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub traffic_jams: Vec<TrafficJam>,
    pub speed_cameras: Vec<SpeedCamera>,
    pub last_updated: DateTime<Utc>,
}

// ── Run summary ──────────────────────────────────────────────────────────

/// Wall-clock milliseconds spent per phase of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub traffic_ms: u64,
    pub cameras_ms: u64,
    pub store_ms: u64,
    pub total_ms: u64,
}

/// What an on-demand or scheduled run reports back.
///
/// Failures are carried in the payload (`success: false`), not as an
/// HTTP error, so callers must check `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub traffic_jams: usize,
    pub speed_cameras: usize,
    /// Pipeline-level problems that did not fail the run (fetch errors, timeouts)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipeline_errors: Vec<String>,
    pub timings: PhaseTimings,
    pub started_at: DateTime<Utc>,
}

impl ScrapeSummary {
    pub fn failure(error: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            traffic_jams: 0,
            speed_cameras: 0,
            pipeline_errors: Vec::new(),
            timings: PhaseTimings::default(),
            started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jam() -> TrafficJam {
        TrafficJam {
            id: "A2-1-abc".into(),
            road: "A2".into(),
            direction: "richting Weert".into(),
            source_location: "Eindhoven".into(),
            destination_location: "Weert".into(),
            route_details: "A2 Eindhoven → Weert".into(),
            cause: "Drukte".into(),
            delay_minutes: 12,
            length_km: 4.0,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_jam_city_match_is_case_insensitive() {
        let j = jam();
        assert!(j.mentions_city("weert"));
        assert!(j.mentions_city("EINDHOVEN"));
        assert!(!j.mentions_city("Venlo"));
    }

    #[test]
    fn test_camera_city_match_covers_direction() {
        let c = SpeedCamera {
            id: "A16-1-abc".into(),
            road: "A16".into(),
            location: "Zevenbergschen Hoek".into(),
            direction: "richting Rotterdam".into(),
            hectometer: "km 102.8".into(),
            flitser_type: FlitserType::Mobile,
            is_active: true,
            last_updated: Utc::now(),
        };
        assert!(c.mentions_city("rotterdam"));
        assert!(c.mentions_city("hoek"));
        assert!(!c.mentions_city("Breda"));
    }

    #[test]
    fn test_flitser_type_wire_names() {
        for t in [
            FlitserType::Fixed,
            FlitserType::Mobile,
            FlitserType::Active,
            FlitserType::SpeedControl,
        ] {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(FlitserType::parse(t.as_str()), Some(t));
        }
        assert_eq!(FlitserType::default(), FlitserType::Mobile);
    }

    #[test]
    fn test_failure_summary_shape() {
        let s = ScrapeSummary::failure("boom", Utc::now());
        assert!(!s.success);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["error"], "boom");
        assert_eq!(v["traffic_jams"], 0);
        assert!(v.get("pipeline_errors").is_none());
    }
}
