//! Field extraction and record assembly.
//!
//! One extractor serves both pipelines. Structured hints from the source
//! element are consulted first when they carry enough text; the raw
//! fragment is always available as the fallback.

use chrono::{DateTime, Local, Timelike, Utc};
use traffic_types::{LOCATION_UNKNOWN, SpeedCamera, TrafficJam};

use crate::config::{JamAcceptance, MonitoredSet};
use crate::patterns::{self, DirectionMatch, PlaceIndex};
use crate::types::Candidate;

/// Raw fragments used as route details are cut to this many characters.
const ROUTE_DETAILS_MAX_CHARS: usize = 200;

/// Hex digits of the text hash in a record id.
const ID_HASH_HEX: usize = 12;

/// `<road>-<epoch secs>-<hash prefix>`. Not stable across scrapes.
pub fn record_id(road: &str, text: &str, at: DateTime<Utc>) -> String {
    let hash = blake3::hash(text.as_bytes()).to_hex();
    format!("{road}-{}-{}", at.timestamp(), &hash.as_str()[..ID_HASH_HEX])
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => s[..i].to_string(),
        None => s.to_string(),
    }
}

pub struct TrafficExtractor {
    monitored: MonitoredSet,
    places: PlaceIndex,
    acceptance: JamAcceptance,
}

impl TrafficExtractor {
    pub fn new(monitored: MonitoredSet, acceptance: JamAcceptance) -> Self {
        let places = PlaceIndex::from_monitored(&monitored);
        Self {
            monitored,
            places,
            acceptance,
        }
    }

    /// Dedicated road element, then heading hint, then raw text. Only
    /// monitored roads resolve.
    fn resolve_road(&self, candidate: &Candidate) -> Option<String> {
        if let Some(road) = candidate
            .road
            .as_deref()
            .and_then(|r| self.monitored.canonical_road(r))
        {
            return Some(road.to_string());
        }
        if let Some(heading) = candidate.hints.as_ref().and_then(|h| h.heading())
            && let Some(road) = patterns::monitored_road(heading, &self.monitored)
        {
            return Some(road);
        }
        patterns::monitored_road(&candidate.text, &self.monitored)
    }

    /// Heading hint first when it yields a direction, else the raw text.
    fn resolve_direction(&self, candidate: &Candidate) -> DirectionMatch {
        if let Some(heading) = candidate.hints.as_ref().and_then(|h| h.heading()) {
            let from_heading = self.places.direction(heading);
            if from_heading.is_known() {
                return from_heading;
            }
        }
        self.places.direction(&candidate.text)
    }

    fn resolve_cause(&self, candidate: &Candidate, hour: u32) -> String {
        if let Some(emphasis) = candidate.hints.as_ref().and_then(|h| h.emphasis())
            && let Some(label) = patterns::cause_from_table(emphasis)
        {
            return label;
        }
        patterns::cause(&candidate.text, hour)
    }

    // ── Traffic jams ────────────────────────────────────────────────

    /// Build a jam record, or `None` when the road is not monitored or the
    /// fragment fails the acceptance rule.
    pub fn extract_jam(&self, candidate: &Candidate, at: DateTime<Utc>) -> Option<TrafficJam> {
        let road = self.resolve_road(candidate)?;
        let text = candidate.text.as_str();

        let delay_minutes = patterns::delay_minutes(text);
        let length_km = patterns::length_km(text);
        if !self.acceptance.accepts(delay_minutes, length_km) {
            return None;
        }

        let hour = at.with_timezone(&Local).hour();
        let direction = self.resolve_direction(candidate);
        let destination = direction
            .destination
            .clone()
            .unwrap_or_else(|| LOCATION_UNKNOWN.to_string());
        let source = direction
            .source
            .clone()
            .or_else(|| {
                self.places
                    .all_in(text)
                    .into_iter()
                    .find(|p| !p.eq_ignore_ascii_case(&destination))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| LOCATION_UNKNOWN.to_string());

        let route_details = match candidate.hints.as_ref().and_then(|h| h.body()) {
            Some(body) => body.to_string(),
            None => truncate_chars(text, ROUTE_DETAILS_MAX_CHARS),
        };

        Some(TrafficJam {
            id: record_id(&road, text, at),
            road,
            direction: direction.direction,
            source_location: source,
            destination_location: destination,
            route_details,
            cause: self.resolve_cause(candidate, hour),
            delay_minutes,
            length_km,
            last_updated: at,
        })
    }

    pub fn extract_jams(&self, candidates: &[Candidate], at: DateTime<Utc>) -> Vec<TrafficJam> {
        candidates
            .iter()
            .filter_map(|c| self.extract_jam(c, at))
            .collect()
    }

    // ── Speed cameras ───────────────────────────────────────────────

    /// Build a camera record, or `None` when no monitored road resolves.
    pub fn extract_camera(&self, candidate: &Candidate, at: DateTime<Utc>) -> Option<SpeedCamera> {
        let road = self.resolve_road(candidate)?;
        let text = candidate.text.as_str();

        let direction = self.resolve_direction(candidate).direction;
        let hectometer = patterns::hectometer(text);
        let location = self.places.location(text, &hectometer, &direction);

        Some(SpeedCamera {
            id: record_id(&road, text, at),
            road,
            location,
            direction,
            hectometer,
            flitser_type: patterns::flitser_type(text),
            is_active: patterns::is_active(text),
            last_updated: at,
        })
    }

    pub fn extract_cameras(&self, candidates: &[Candidate], at: DateTime<Utc>) -> Vec<SpeedCamera> {
        candidates
            .iter()
            .filter_map(|c| self.extract_camera(c, at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StructuredHints;
    use traffic_types::{FlitserType, CAUSE_UNKNOWN, DIRECTION_UNKNOWN};

    fn extractor() -> TrafficExtractor {
        TrafficExtractor::new(MonitoredSet::default(), JamAcceptance::DelayOnly)
    }

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    // ── jams ────────────────────────────────────────────────────────

    #[test]
    fn test_jam_road_and_delay() {
        let c = Candidate::from_text("A67 Venlo → Eindhoven ongeval + 12 min");
        let jam = extractor().extract_jam(&c, at()).unwrap();
        assert_eq!(jam.road, "A67");
        assert_eq!(jam.delay_minutes, 12);
        assert_eq!(jam.direction, "richting Eindhoven");
        assert_eq!(jam.source_location, "Venlo");
        assert_eq!(jam.destination_location, "Eindhoven");
        assert_eq!(jam.cause, "Ongeval");
        assert!(jam.id.starts_with("A67-1700000000-"));
    }

    #[test]
    fn test_jam_without_delay_rejected_by_default() {
        let c = Candidate::from_text("A2 file van 4 km richting Weert");
        assert!(extractor().extract_jam(&c, at()).is_none());
    }

    #[test]
    fn test_jam_length_only_accepted_when_configured() {
        let ex = TrafficExtractor::new(MonitoredSet::default(), JamAcceptance::DelayOrLength);
        let c = Candidate::from_text("A2 file van 4 km richting Weert");
        let jam = ex.extract_jam(&c, at()).unwrap();
        assert_eq!(jam.delay_minutes, 0);
        assert_eq!(jam.length_km, 4.0);
    }

    #[test]
    fn test_jam_unmonitored_road_rejected() {
        let c = Candidate::from_text("A1 Amsterdam → Amersfoort + 30 min");
        assert!(extractor().extract_jam(&c, at()).is_none());
    }

    #[test]
    fn test_jam_route_details_truncated() {
        let long = format!("A2 Weert → Eindhoven + 5 min {}", "x".repeat(300));
        let jam = extractor()
            .extract_jam(&Candidate::from_text(long), at())
            .unwrap();
        assert_eq!(jam.route_details.chars().count(), 200);
    }

    #[test]
    fn test_jam_hints_take_precedence() {
        let c = Candidate::from_text("A2 + 15 min werkzaamheden vertraging")
            .with_road("A2")
            .with_hints(StructuredHints {
                heading: Some("Eindhoven → Weert".into()),
                emphasis: Some("Ongeval".into()),
                body: Some("Tussen Leenderheide en Maarheeze".into()),
            });
        let jam = extractor().extract_jam(&c, at()).unwrap();
        assert_eq!(jam.direction, "richting Weert");
        assert_eq!(jam.source_location, "Eindhoven");
        assert_eq!(jam.cause, "Ongeval");
        assert_eq!(jam.route_details, "Tussen Leenderheide en Maarheeze");
    }

    #[test]
    fn test_jam_trivial_hints_fall_back_to_text() {
        let c = Candidate::from_text("A2 richting Weert gladheid + 15 min").with_hints(
            StructuredHints {
                heading: Some("–".into()),
                emphasis: Some(" ".into()),
                body: None,
            },
        );
        let jam = extractor().extract_jam(&c, at()).unwrap();
        assert_eq!(jam.direction, "richting Weert");
        assert_eq!(jam.cause, "Gladheid");
    }

    #[test]
    fn test_jam_extraction_is_repeatable() {
        let c = Candidate::from_text("A58 Tilburg richting Breda stilstaand verkeer + 9 min");
        let ex = extractor();
        let a = ex.extract_jam(&c, at()).unwrap();
        let later = at() + chrono::Duration::seconds(300);
        let b = ex.extract_jam(&c, later).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.road, b.road);
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.source_location, b.source_location);
        assert_eq!(a.destination_location, b.destination_location);
        assert_eq!(a.route_details, b.route_details);
        assert_eq!(a.delay_minutes, b.delay_minutes);
        assert_eq!(a.length_km, b.length_km);
    }

    #[test]
    fn test_jam_unknown_direction_sentinels() {
        let c = Candidate::from_text("A2 stilstaand + 7 min");
        let jam = extractor().extract_jam(&c, at()).unwrap();
        assert_eq!(jam.direction, DIRECTION_UNKNOWN);
        assert_eq!(jam.destination_location, LOCATION_UNKNOWN);
        assert_ne!(jam.cause, CAUSE_UNKNOWN);
    }

    // ── cameras ─────────────────────────────────────────────────────

    #[test]
    fn test_camera_reference_fragment() {
        let c = Candidate::from_text("Flitser A16 richting Rotterdam, Zevenbergschen Hoek, km 102,8");
        let cam = extractor().extract_camera(&c, at()).unwrap();
        assert_eq!(cam.road, "A16");
        assert_eq!(cam.hectometer, "km 102.8");
        assert!(cam.direction.contains("richting Rotterdam"));
        assert!(cam.location.contains("Zevenbergschen Hoek"));
        assert!(cam.is_active);
        assert_eq!(cam.flitser_type, FlitserType::Mobile);
    }

    #[test]
    fn test_camera_inactive() {
        let c = Candidate::from_text("Vaste flitser A2 bij Weert verwijderd");
        let cam = extractor().extract_camera(&c, at()).unwrap();
        assert!(!cam.is_active);
        assert_eq!(cam.flitser_type, FlitserType::Fixed);
    }

    #[test]
    fn test_camera_requires_monitored_road() {
        let c = Candidate::from_text("Flitser A4 richting Den Haag km 12");
        assert!(extractor().extract_camera(&c, at()).is_none());
        let c = Candidate::from_text("Mobiele flitser bij hmp 45");
        assert!(extractor().extract_camera(&c, at()).is_none());
    }

    #[test]
    fn test_record_id_shape() {
        let id = record_id("A2", "some text", at());
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "A2");
        assert_eq!(parts[1], "1700000000");
        assert_eq!(parts[2].len(), 12);
    }
}
