//! Field-level rule chains over Dutch traffic text.
//!
//! Every field has one ordered rule list; the first rule that yields a
//! usable value wins. All functions are total: absent data comes back as
//! zero, `None`, or one of the sentinels from `traffic_types`.

use std::sync::LazyLock;

use regex::Regex;
use traffic_types::{FlitserType, DIRECTION_UNKNOWN, HECTOMETER_UNKNOWN, LOCATION_UNKNOWN};

use crate::config::MonitoredSet;
use crate::vocab::{
    CAUSE_BUSY, CAUSE_ROADWORKS, CAUSE_RUSH_HOUR, CAUSE_TABLE, CONGESTION_KEYWORDS, CauseEntry,
    HECTO_ESTIMATED_SUFFIX, INACTIVE_PATTERN, MODERATE_HECTO_CONTEXT, PLACE_STOPWORDS,
    STRONG_HECTO_CONTEXT, WORK_KEYWORDS,
};

// ── Shared building blocks ───────────────────────────────────────────────

/// A capitalised place name of up to three words, with Dutch connectors
/// ("Bergen op Zoom", "'s-Hertogenbosch", "Den Bosch").
const PLACE: &str =
    r"((?:'s-)?\p{Lu}[\p{L}'\-]*(?:\s+(?:op\s+|aan\s+(?:de\s+)?|den\s+|ter\s+)?\p{Lu}[\p{L}'\-]*){0,2})";

const NUMBER: &str = r"(\d+(?:[.,]\d+)?)";

/// Context window half-width (characters) for cause ranking.
const CAUSE_WINDOW: usize = 40;

/// Hectometer values outside this range are not kilometre markers.
const HECTO_MIN: f64 = 0.0;
const HECTO_MAX: f64 = 300.0;

/// Parse "102,8" or "102.8".
pub fn parse_decimal(s: &str) -> Option<f64> {
    s.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Strip label words ("Richting", "Flitser", ...) from both ends of a
/// captured place run.
fn clean_place(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw.split_whitespace().collect();
    let is_stop = |w: &&str| PLACE_STOPWORDS.contains(w);
    let start = words.iter().position(|w| !is_stop(w))?;
    let end = words.iter().rposition(|w| !is_stop(w))?;
    Some(words[start..=end].join(" "))
}

// ── Road ─────────────────────────────────────────────────────────────────

static RE_ROAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[AN]\d{1,3}\b").expect("road regex"));

/// Every road token in order of appearance, uppercased. Not restricted to
/// the monitored set.
pub fn road_tokens(text: &str) -> Vec<String> {
    let upper = text.to_uppercase();
    RE_ROAD
        .find_iter(&upper)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// First road token that is monitored, in its configured spelling.
pub fn monitored_road(text: &str, monitored: &MonitoredSet) -> Option<String> {
    road_tokens(text)
        .iter()
        .find_map(|t| monitored.canonical_road(t))
        .map(str::to_string)
}

// ── Delay / length ───────────────────────────────────────────────────────

static RE_DELAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\+\s*(\d+)\s*min(?:uten|\.)?\b").expect("delay regex")
});

static RE_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{NUMBER}\s*km\b")).expect("length regex")
});

/// Minutes from "+ 12 min" / "+12 minuten"; 0 when absent.
pub fn delay_minutes(text: &str) -> u32 {
    RE_DELAY
        .captures_iter(text)
        .find_map(|c| c[1].parse::<u32>().ok())
        .unwrap_or(0)
}

pub fn has_delay_indicator(text: &str) -> bool {
    RE_DELAY.is_match(text) || text.to_lowercase().contains("vertraging")
}

/// Kilometres from "4 km" / "2,5 km"; 0.0 when absent.
pub fn length_km(text: &str) -> f64 {
    RE_LENGTH
        .captures_iter(text)
        .find_map(|c| parse_decimal(&c[1]))
        .unwrap_or(0.0)
}

// ── Direction ────────────────────────────────────────────────────────────

static RE_RICHTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?i:richting)\s+{PLACE}")).expect("richting regex")
});

static RE_NAAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b(?i:naar)\s+{PLACE}")).expect("naar regex"));

static RE_ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{PLACE}\s*(?:→|->|=>)\s*{PLACE}")).expect("arrow regex")
});

static RE_CARDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(noord|zuid|oost|west)(?:elijke?|waarts|en)?\b").expect("cardinal regex")
});

/// Resolved direction plus whatever endpoints the matching rule exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionMatch {
    /// "richting <Place>" or the unknown sentinel
    pub direction: String,
    pub source: Option<String>,
    pub destination: Option<String>,
}

impl DirectionMatch {
    fn toward(place: String) -> Self {
        Self {
            direction: format!("richting {place}"),
            source: None,
            destination: Some(place),
        }
    }

    fn unknown() -> Self {
        Self {
            direction: DIRECTION_UNKNOWN.to_string(),
            source: None,
            destination: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.direction != DIRECTION_UNKNOWN
    }
}

/// Arrow notation `A → B`, read as from A toward B.
pub fn arrow_endpoints(text: &str) -> Option<(String, String)> {
    RE_ARROW.captures_iter(text).find_map(|c| {
        let from = clean_place(&c[1])?;
        let to = clean_place(&c[2])?;
        Some((from, to))
    })
}

fn first_place(re: &Regex, text: &str) -> Option<String> {
    re.captures_iter(text).find_map(|c| clean_place(&c[1]))
}

fn cardinal(text: &str) -> Option<String> {
    let c = RE_CARDINAL.captures(text)?;
    let word = c[1].to_lowercase();
    let mut chars = word.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

// ── Known places ─────────────────────────────────────────────────────────

/// Monitored cities plus extra place names, matched case-insensitively on
/// word boundaries.
#[derive(Debug, Clone)]
pub struct PlaceIndex {
    places: Vec<String>,
    lowered: Vec<String>,
}

/// Byte offsets of whole-word occurrences of `needle` in `hay` (both
/// already lowercased).
fn word_positions(hay: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    hay.match_indices(needle)
        .filter(|(i, _)| {
            let before = hay[..*i].chars().next_back();
            let after = hay[i + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .map(|(i, _)| i)
        .collect()
}

impl PlaceIndex {
    pub fn new(places: Vec<String>) -> Self {
        let lowered = places.iter().map(|p| p.to_lowercase()).collect();
        Self { places, lowered }
    }

    pub fn from_monitored(monitored: &MonitoredSet) -> Self {
        Self::new(monitored.known_places())
    }

    /// First known place (in list order) mentioned anywhere in `text`.
    pub fn first_in(&self, text: &str) -> Option<&str> {
        let hay = text.to_lowercase();
        self.lowered
            .iter()
            .position(|p| !word_positions(&hay, p).is_empty())
            .map(|i| self.places[i].as_str())
    }

    /// All known places mentioned in `text`, in order of appearance.
    pub fn all_in(&self, text: &str) -> Vec<&str> {
        let hay = text.to_lowercase();
        let mut hits: Vec<(usize, &str)> = self
            .lowered
            .iter()
            .zip(&self.places)
            .filter_map(|(low, place)| {
                word_positions(&hay, low)
                    .first()
                    .map(|pos| (*pos, place.as_str()))
            })
            .collect();
        hits.sort_by_key(|(pos, _)| *pos);
        hits.into_iter().map(|(_, p)| p).collect()
    }

    /// Direction rule chain: richting → naar → arrow → cardinal → known place.
    pub fn direction(&self, text: &str) -> DirectionMatch {
        if let Some(place) = first_place(&RE_RICHTING, text) {
            return DirectionMatch::toward(place);
        }
        if let Some(place) = first_place(&RE_NAAR, text) {
            return DirectionMatch::toward(place);
        }
        if let Some((from, to)) = arrow_endpoints(text) {
            return DirectionMatch {
                source: Some(from),
                ..DirectionMatch::toward(to)
            };
        }
        if let Some(c) = cardinal(text) {
            return DirectionMatch {
                direction: format!("richting {c}"),
                source: None,
                destination: None,
            };
        }
        if let Some(place) = self.first_in(text) {
            return DirectionMatch::toward(place.to_string());
        }
        DirectionMatch::unknown()
    }

    /// Location descriptor: up to two place candidates, then the hectometer
    /// and one direction hit, joined with ", ".
    pub fn location(&self, text: &str, hectometer: &str, direction: &str) -> String {
        let mut candidates: Vec<String> = Vec::new();
        for c in RE_EXIT.captures_iter(text) {
            candidates.push(format!("afrit {}", &c[1]));
        }
        for c in RE_INTERCHANGE.captures_iter(text) {
            if let Some(p) = clean_place(&c[1]) {
                candidates.push(format!("knooppunt {p}"));
            }
        }
        for c in RE_NEAR.captures_iter(text) {
            if let Some(p) = clean_place(&c[1]) {
                candidates.push(p);
            }
        }
        for c in RE_STRUCTURE.captures_iter(text) {
            candidates.push(c[1].to_string());
        }
        for c in RE_MULTIWORD.captures_iter(text) {
            match clean_place(&c[1]) {
                Some(p) if p.split_whitespace().count() >= 2 => candidates.push(p),
                _ => {}
            }
        }
        candidates.extend(self.all_in(text).into_iter().map(str::to_string));

        let mut parts: Vec<String> = Vec::new();
        for c in candidates {
            if !parts.iter().any(|p| p.eq_ignore_ascii_case(&c)) {
                parts.push(c);
            }
            if parts.len() == 2 {
                break;
            }
        }
        if hectometer != HECTOMETER_UNKNOWN && !hectometer.is_empty() {
            parts.push(hectometer.to_string());
        }
        if parts.len() < 3 && direction != DIRECTION_UNKNOWN && !direction.is_empty() {
            parts.push(direction.to_string());
        }
        if parts.is_empty() {
            LOCATION_UNKNOWN.to_string()
        } else {
            parts.join(", ")
        }
    }
}

// ── Location candidates ──────────────────────────────────────────────────

static RE_EXIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:afrit|afslag)\s+(\d{1,3}[a-z]?)\b").expect("exit regex")
});

static RE_INTERCHANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?i:knooppunt|knp\.?|aansluiting)\s+{PLACE}"))
        .expect("interchange regex")
});

static RE_NEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b(?i:ter\s+hoogte\s+van|nabij|bij)\s+{PLACE}")).expect("near regex")
});

static RE_STRUCTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\p{Lu}[\p{L}\-]*(?:tunnel|brug|viaduct|aquaduct))\b").expect("structure regex")
});

static RE_MULTIWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\p{Lu}\p{Ll}+(?:[\s\-]+\p{Lu}\p{Ll}+)+)").expect("multiword regex")
});

// ── Cause ────────────────────────────────────────────────────────────────

static CAUSE_RULES: LazyLock<Vec<(Regex, &'static CauseEntry)>> = LazyLock::new(|| {
    CAUSE_TABLE
        .iter()
        .map(|entry| {
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", entry.pattern)).expect("cause regex");
            (re, entry)
        })
        .collect()
});

#[derive(Debug)]
struct CauseHit {
    label: &'static str,
    window: usize,
    start: usize,
    priority: usize,
}

fn cause_hits(text: &str) -> Vec<CauseHit> {
    let mut hits = Vec::new();
    for (priority, (re, entry)) in CAUSE_RULES.iter().enumerate() {
        for m in re.find_iter(text) {
            // clipped span around the match, match included
            let left = text[..m.start()].chars().count().min(CAUSE_WINDOW);
            let right = text[m.end()..].chars().count().min(CAUSE_WINDOW);
            hits.push(CauseHit {
                label: entry.label,
                window: left + m.as_str().chars().count() + right,
                start: m.start(),
                priority,
            });
        }
    }
    hits.sort_by(|a, b| {
        b.window
            .cmp(&a.window)
            .then(a.start.cmp(&b.start))
            .then(a.priority.cmp(&b.priority))
    });
    hits
}

/// Taxonomy match only: primary label, plus a distinct secondary from the
/// next two ranked hits as "A + B".
pub fn cause_from_table(text: &str) -> Option<String> {
    let hits = cause_hits(text);
    let primary = hits.first()?;
    let secondary = hits
        .iter()
        .skip(1)
        .take(2)
        .find(|h| h.label != primary.label);
    Some(match secondary {
        Some(s) => format!("{} + {}", primary.label, s.label),
        None => primary.label.to_string(),
    })
}

fn contains_any(lowered: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lowered.contains(w))
}

/// Full cause chain: taxonomy, then keyword fallbacks. `hour` is the local
/// hour of day (0-23) used by the rush-hour rule.
pub fn cause(text: &str, hour: u32) -> String {
    if let Some(label) = cause_from_table(text) {
        return label;
    }
    let lowered = text.to_lowercase();
    let congestion = contains_any(&lowered, CONGESTION_KEYWORDS);
    let delayed = has_delay_indicator(text);
    if delayed && congestion {
        return CAUSE_BUSY.to_string();
    }
    if delayed && contains_any(&lowered, WORK_KEYWORDS) {
        return CAUSE_ROADWORKS.to_string();
    }
    if congestion && matches!(hour, 7..=9 | 16..=19) {
        return CAUSE_RUSH_HOUR.to_string();
    }
    traffic_types::CAUSE_UNKNOWN.to_string()
}

// ── Hectometer ───────────────────────────────────────────────────────────

static RE_HECTO_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\btussen\s+km\.?\s*{NUMBER}\s+en\s+(?:km\.?\s*)?{NUMBER}"))
        .expect("hectometer range regex")
});

static RE_HECTO_KM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\bkm\.?\s*{NUMBER}")).expect("km regex"));

static RE_HECTO_HMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\bhmp\.?\s*{NUMBER}")).expect("hmp regex"));

static RE_HECTO_PAAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bhectometerpaal\s*{NUMBER}")).expect("hectometerpaal regex")
});

fn in_hecto_range(v: f64) -> bool {
    (HECTO_MIN..=HECTO_MAX).contains(&v)
}

/// "km 102.8", one decimal at most.
fn format_km(v: f64) -> String {
    let rounded = (v * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("km {rounded:.0}")
    } else {
        format!("km {rounded}")
    }
}

fn direct_hectometer(text: &str) -> Option<f64> {
    if let Some(v) = RE_HECTO_RANGE.captures_iter(text).find_map(|c| {
        let a = parse_decimal(&c[1])?;
        let b = parse_decimal(&c[2])?;
        (in_hecto_range(a) && in_hecto_range(b)).then_some((a + b) / 2.0)
    }) {
        return Some(v);
    }
    for re in [&*RE_HECTO_KM, &*RE_HECTO_HMP, &*RE_HECTO_PAAL, &*RE_LENGTH] {
        if let Some(v) = re
            .captures_iter(text)
            .filter_map(|c| parse_decimal(&c[1]))
            .find(|v| in_hecto_range(*v))
        {
            return Some(v);
        }
    }
    None
}

/// Bare numbers judged by the words within three tokens of them.
fn contextual_hectometer(text: &str) -> Option<String> {
    let raw: Vec<&str> = text.split_whitespace().collect();
    let words: Vec<String> = raw
        .iter()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .collect();

    let is_delay = |i: usize| {
        raw[i].starts_with('+')
            || (i > 0 && raw[i - 1] == "+")
            || words.get(i + 1).is_some_and(|w| w.starts_with("min"))
    };

    let mut numbers: Vec<(usize, f64)> = Vec::new();
    for (i, w) in words.iter().enumerate() {
        if w.is_empty() || !w.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
            continue;
        }
        if is_delay(i) {
            continue;
        }
        if let Some(v) = parse_decimal(w).filter(|v| in_hecto_range(*v)) {
            numbers.push((i, v));
        }
    }

    let context_has = |i: usize, vocab: &[&str]| {
        let lo = i.saturating_sub(3);
        let hi = (i + 3).min(words.len().saturating_sub(1));
        (lo..=hi).any(|j| j != i && vocab.contains(&words[j].as_str()))
    };

    if let Some((_, v)) = numbers.iter().find(|(i, _)| context_has(*i, STRONG_HECTO_CONTEXT)) {
        return Some(format_km(*v));
    }
    numbers
        .iter()
        .find(|(i, _)| context_has(*i, MODERATE_HECTO_CONTEXT))
        .map(|(_, v)| format!("{}{HECTO_ESTIMATED_SUFFIX}", format_km(*v)))
}

/// Kilometre marker, "km <n>" or "km <n> (geschat)"; sentinel when absent.
pub fn hectometer(text: &str) -> String {
    if let Some(v) = direct_hectometer(text) {
        return format_km(v);
    }
    contextual_hectometer(text).unwrap_or_else(|| HECTOMETER_UNKNOWN.to_string())
}

// ── Camera kind / state ──────────────────────────────────────────────────

static RE_FIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:flitspa(?:al|len)|vaste\s+(?:flitser|camera)s?|roodlichtcamera)").expect("fixed regex")
});

static RE_SPEED_CONTROL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:trajectcontrole|snelheidscontrole|laser(?:controle|gun)?)\b")
        .expect("speed control regex")
});

static RE_MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmobiele?\b").expect("mobile regex"));

static RE_ACTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bactie(?:f|ve)\b").expect("active regex"));

static RE_INACTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{INACTIVE_PATTERN})\b")).expect("inactive regex")
});

/// False only on an explicit inactive / removed / stopped indicator.
pub fn is_active(text: &str) -> bool {
    !RE_INACTIVE.is_match(text)
}

pub fn flitser_type(text: &str) -> FlitserType {
    if RE_FIXED.is_match(text) {
        FlitserType::Fixed
    } else if RE_SPEED_CONTROL.is_match(text) {
        FlitserType::SpeedControl
    } else if RE_MOBILE.is_match(text) {
        FlitserType::Mobile
    } else if RE_ACTIVE.is_match(text) && is_active(text) {
        FlitserType::Active
    } else {
        FlitserType::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places() -> PlaceIndex {
        PlaceIndex::from_monitored(&MonitoredSet::default())
    }

    // ── road ────────────────────────────────────────────────────────────

    #[test]
    fn test_road_tokens_in_order() {
        assert_eq!(
            road_tokens("a2 bij Weert, dan A67 en N270"),
            vec!["A2", "A67", "N270"]
        );
        assert!(road_tokens("geen wegen hier").is_empty());
    }

    #[test]
    fn test_road_token_not_inside_word() {
        assert!(road_tokens("LA200X").is_empty());
    }

    #[test]
    fn test_monitored_road_skips_unmonitored() {
        let set = MonitoredSet::default();
        assert_eq!(monitored_road("A1 en daarna A2", &set), Some("A2".into()));
        assert_eq!(monitored_road("A1 richting Amsterdam", &set), None);
    }

    // ── delay / length ──────────────────────────────────────────────────

    #[test]
    fn test_delay_minutes() {
        assert_eq!(delay_minutes("A67 Venlo → Eindhoven + 12 min"), 12);
        assert_eq!(delay_minutes("+25 minuten vertraging"), 25);
        assert_eq!(delay_minutes("file van 4 km"), 0);
    }

    #[test]
    fn test_length_km_decimal_comma() {
        assert_eq!(length_km("file van 2,5 km"), 2.5);
        assert_eq!(length_km("7 km"), 7.0);
        assert_eq!(length_km("+ 10 min"), 0.0);
    }

    #[test]
    fn test_length_ignores_road_number() {
        assert_eq!(length_km("A16 km"), 0.0);
    }

    // ── direction ───────────────────────────────────────────────────────

    #[test]
    fn test_direction_richting() {
        let d = places().direction("Flitser A16 richting Rotterdam, Zevenbergschen Hoek");
        assert_eq!(d.direction, "richting Rotterdam");
        assert_eq!(d.destination.as_deref(), Some("Rotterdam"));
    }

    #[test]
    fn test_direction_multiword_place() {
        let d = places().direction("A58 naar Bergen op Zoom + 5 min");
        assert_eq!(d.direction, "richting Bergen op Zoom");
    }

    #[test]
    fn test_direction_trims_trailing_label() {
        let d = places().direction("A2 richting Weert Ongeval");
        assert_eq!(d.direction, "richting Weert");
    }

    #[test]
    fn test_direction_arrow() {
        let d = places().direction("A67 Venlo → Eindhoven");
        assert_eq!(d.direction, "richting Eindhoven");
        assert_eq!(d.source.as_deref(), Some("Venlo"));
        assert_eq!(d.destination.as_deref(), Some("Eindhoven"));

        let d = places().direction("A2 Eindhoven -> Weert");
        assert_eq!(d.source.as_deref(), Some("Eindhoven"));
    }

    #[test]
    fn test_direction_cardinal_and_city_fallback() {
        assert_eq!(
            places().direction("zuidelijke rijbaan dicht").direction,
            "richting Zuid"
        );
        assert_eq!(
            places().direction("drukte rond tilburg").direction,
            "richting Tilburg"
        );
    }

    #[test]
    fn test_direction_unknown() {
        let d = places().direction("stilstaand verkeer");
        assert_eq!(d.direction, DIRECTION_UNKNOWN);
        assert!(!d.is_known());
    }

    // ── places ──────────────────────────────────────────────────────────

    #[test]
    fn test_place_index_word_boundaries() {
        let idx = PlaceIndex::new(vec!["Best".into(), "Oss".into()]);
        assert_eq!(idx.first_in("de beste route"), None);
        assert_eq!(idx.first_in("afrit Best"), Some("Best"));
        assert_eq!(idx.all_in("Oss en Best"), vec!["Oss", "Best"]);
    }

    #[test]
    fn test_place_index_apostrophe_name() {
        let idx = places();
        assert_eq!(
            idx.first_in("A2 bij 's-Hertogenbosch"),
            Some("'s-Hertogenbosch")
        );
    }

    // ── cause ───────────────────────────────────────────────────────────

    #[test]
    fn test_cause_single_label() {
        assert_eq!(cause("A2 werkzaamheden bij Weert", 12), "Werkzaamheden");
        assert_eq!(cause("kettingbotsing op de A16", 12), "Kettingbotsing");
    }

    #[test]
    fn test_cause_composite_accident_first() {
        let text = "A2 Eindhoven richting Weert tussen afrit 30 en afrit 31 ongeval \
                    op de linkerrijstrook en mist op het wegdek, het verkeer staat \
                    stil tot aan Weert + 25 min";
        assert_eq!(cause(text, 12), "Ongeval + Mist");
    }

    #[test]
    fn test_cause_short_fragment_ties_on_position() {
        // both spans reach the fragment edges, so the earlier keyword leads
        assert_eq!(cause("A2 ongeval en mist + 10 min", 12), "Ongeval + Mist");
        assert_eq!(cause("A67 ijzel na aanrijding", 12), "Gladheid + Ongeval");
    }

    #[test]
    fn test_cause_longest_window_wins() {
        // "pech" sits mid-fragment, "ongeval" at the very start
        let text = "Ongeval eerder opgeruimd, nu staat er nog een auto met pech op de \
                    vluchtstrook bij Venlo richting Eindhoven, verkeer rijdt langzaam";
        assert_eq!(cause_from_table(text).as_deref(), Some("Pechgeval + Ongeval"));
    }

    #[test]
    fn test_cause_fallbacks() {
        assert_eq!(cause("A67 file + 10 min", 12), "Drukte");
        assert_eq!(cause("A67 afzetting + 10 min", 12), "Werkzaamheden");
        assert_eq!(cause("A67 file bij Venlo", 8), "Spitsuur");
        assert_eq!(cause("A67 file bij Venlo", 17), "Spitsuur");
        assert_eq!(cause("A67 file bij Venlo", 12), traffic_types::CAUSE_UNKNOWN);
        assert_eq!(cause("A67 bij Venlo", 8), traffic_types::CAUSE_UNKNOWN);
    }

    // ── hectometer ──────────────────────────────────────────────────────

    #[test]
    fn test_hectometer_km_with_comma() {
        assert_eq!(hectometer("A16, km 102,8"), "km 102.8");
        assert_eq!(hectometer("hmp 45"), "km 45");
        assert_eq!(hectometer("hectometerpaal 12.3"), "km 12.3");
        assert_eq!(hectometer("bij 88 km"), "km 88");
    }

    #[test]
    fn test_hectometer_range_midpoint() {
        assert_eq!(hectometer("tussen km 40 en 45"), "km 42.5");
        assert_eq!(hectometer("tussen km 40,2 en km 41"), "km 40.6");
    }

    #[test]
    fn test_hectometer_out_of_range_skipped() {
        assert_eq!(hectometer("km 450, later km 120"), "km 120");
        assert_eq!(hectometer("km 999"), HECTOMETER_UNKNOWN);
    }

    #[test]
    fn test_hectometer_contextual() {
        assert_eq!(hectometer("flitser bij paal 57"), "km 57");
        assert_eq!(hectometer("flitser ter hoogte van 57"), "km 57 (geschat)");
        assert_eq!(hectometer("flitser richting Venlo + 12 min"), HECTOMETER_UNKNOWN);
        assert_eq!(hectometer("mobiele flitser"), HECTOMETER_UNKNOWN);
    }

    // ── location ────────────────────────────────────────────────────────

    #[test]
    fn test_location_camera_example() {
        let text = "Flitser A16 richting Rotterdam, Zevenbergschen Hoek, km 102,8";
        let loc = places().location(text, "km 102.8", "richting Rotterdam");
        assert!(loc.contains("Zevenbergschen Hoek"));
        assert!(loc.contains("km 102.8"));
    }

    #[test]
    fn test_location_exit_and_interchange() {
        let loc = places().location(
            "A2 tussen afrit 27 en knooppunt Leenderheide",
            HECTOMETER_UNKNOWN,
            DIRECTION_UNKNOWN,
        );
        assert_eq!(loc, "afrit 27, knooppunt Leenderheide");
    }

    #[test]
    fn test_location_appends_direction_when_short() {
        let loc = places().location("flitser bij Venlo", HECTOMETER_UNKNOWN, "richting Venlo");
        assert_eq!(loc, "Venlo, richting Venlo");
    }

    #[test]
    fn test_location_unknown() {
        let loc = places().location("flitser", HECTOMETER_UNKNOWN, DIRECTION_UNKNOWN);
        assert_eq!(loc, LOCATION_UNKNOWN);
    }

    // ── camera kind / state ─────────────────────────────────────────────

    #[test]
    fn test_flitser_type() {
        assert_eq!(flitser_type("vaste flitser A2"), FlitserType::Fixed);
        assert_eq!(flitser_type("trajectcontrole A2"), FlitserType::SpeedControl);
        assert_eq!(flitser_type("mobiele flitser A2"), FlitserType::Mobile);
        assert_eq!(flitser_type("flitser actief op A2"), FlitserType::Active);
        assert_eq!(flitser_type("flitser A2"), FlitserType::Mobile);
    }

    #[test]
    fn test_is_active() {
        assert!(is_active("Flitser A16 richting Rotterdam"));
        assert!(!is_active("flitser A16 verwijderd"));
        assert!(!is_active("flitser niet meer actief"));
    }
}
