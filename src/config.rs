//! Runtime configuration and the monitored road/city set.
//!
//! The monitored set is an immutable value handed to the classifier and the
//! extractor when they are built; nothing reads it from global state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::vocab::{DEFAULT_CITIES, DEFAULT_ROADS, EXTRA_PLACES};

// ── Monitored roads and cities ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredSet {
    roads: Vec<String>,
    cities: Vec<String>,
}

impl MonitoredSet {
    /// Roads are uppercased and deduplicated; order is preserved.
    pub fn new<R, C>(roads: R, cities: C) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let mut norm_roads: Vec<String> = Vec::new();
        for r in roads {
            let r = r.as_ref().trim().to_uppercase();
            if !r.is_empty() && !norm_roads.contains(&r) {
                norm_roads.push(r);
            }
        }
        let mut norm_cities: Vec<String> = Vec::new();
        for c in cities {
            let c = c.as_ref().trim().to_string();
            if !c.is_empty() && !norm_cities.iter().any(|x| x.eq_ignore_ascii_case(&c)) {
                norm_cities.push(c);
            }
        }
        Self {
            roads: norm_roads,
            cities: norm_cities,
        }
    }

    pub fn roads(&self) -> &[String] {
        &self.roads
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// The canonical (configured) spelling of a road token, if monitored.
    pub fn canonical_road(&self, token: &str) -> Option<&str> {
        self.roads
            .iter()
            .find(|r| r.eq_ignore_ascii_case(token))
            .map(String::as_str)
    }

    pub fn is_monitored_road(&self, token: &str) -> bool {
        self.canonical_road(token).is_some()
    }

    /// Monitored cities followed by the extra place list, deduplicated.
    /// Used for direction and location lookups.
    pub fn known_places(&self) -> Vec<String> {
        let mut places = self.cities.clone();
        for p in EXTRA_PLACES {
            if !places.iter().any(|x| x.eq_ignore_ascii_case(p)) {
                places.push((*p).to_string());
            }
        }
        places
    }
}

impl Default for MonitoredSet {
    fn default() -> Self {
        Self::new(DEFAULT_ROADS.iter(), DEFAULT_CITIES.iter())
    }
}

// ── Jam acceptance rule ──────────────────────────────────────────────────

/// When a jam fragment carries enough signal to become a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JamAcceptance {
    /// `delay_minutes > 0`
    #[default]
    DelayOnly,
    /// `delay_minutes > 0 || length_km > 0`
    DelayOrLength,
}

impl JamAcceptance {
    pub fn accepts(&self, delay_minutes: u32, length_km: f64) -> bool {
        match self {
            Self::DelayOnly => delay_minutes > 0,
            Self::DelayOrLength => delay_minutes > 0 || length_km > 0.0,
        }
    }
}

// ── Session retry ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub traffic_url: String,
    pub cameras_url: String,
    pub database: PathBuf,
    pub bind: String,
    pub scrape_interval_secs: u64,
    pub page_timeout_secs: u64,
    pub user_agent: String,
    pub session_retry: RetrySettings,
    pub jam_acceptance: JamAcceptance,
    pub monitored: MonitoredSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            traffic_url: "https://www.anwb.nl/verkeer/filelijst".to_string(),
            cameras_url: "https://www.anwb.nl/verkeer/flitsers".to_string(),
            database: PathBuf::from("verkeer.db"),
            bind: "0.0.0.0:8001".to_string(),
            scrape_interval_secs: 300,
            page_timeout_secs: 15,
            user_agent: format!("verkeer_monitor/{}", env!("CARGO_PKG_VERSION")),
            session_retry: RetrySettings::default(),
            jam_acceptance: JamAcceptance::default(),
            monitored: MonitoredSet::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validated()
    }

    /// Normalise the monitored set and reject unusable values.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let monitored = MonitoredSet::new(self.monitored.roads(), self.monitored.cities());
        if monitored.roads().is_empty() {
            return Err(ConfigError::Invalid("monitored road set is empty".into()));
        }
        if self.scrape_interval_secs == 0 {
            return Err(ConfigError::Invalid("scrape_interval_secs must be > 0".into()));
        }
        if self.page_timeout_secs == 0 {
            return Err(ConfigError::Invalid("page_timeout_secs must be > 0".into()));
        }
        if self.session_retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "session_retry.max_attempts must be > 0".into(),
            ));
        }
        Ok(Self { monitored, ..self })
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_monitored_set_normalises_roads() {
        let set = MonitoredSet::new(["a2", " A16 ", "A2", ""], ["Breda", "breda"]);
        assert_eq!(set.roads(), &["A2".to_string(), "A16".to_string()]);
        assert_eq!(set.cities(), &["Breda".to_string()]);
        assert_eq!(set.canonical_road("a16"), Some("A16"));
        assert!(!set.is_monitored_road("A1"));
    }

    #[test]
    fn test_known_places_extend_cities() {
        let set = MonitoredSet::new(["A2"], ["Weert", "Utrecht"]);
        let places = set.known_places();
        assert_eq!(places[0], "Weert");
        assert_eq!(places.iter().filter(|p| p.as_str() == "Utrecht").count(), 1);
        assert!(places.iter().any(|p| p == "Amsterdam"));
    }

    #[test]
    fn test_acceptance_rules() {
        assert!(JamAcceptance::DelayOnly.accepts(5, 0.0));
        assert!(!JamAcceptance::DelayOnly.accepts(0, 3.0));
        assert!(JamAcceptance::DelayOrLength.accepts(0, 3.0));
        assert!(!JamAcceptance::DelayOrLength.accepts(0, 0.0));
    }

    #[test]
    fn test_config_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"scrape_interval_secs": 60, "jam_acceptance": "delay_or_length",
                "monitored": {{"roads": ["a67"], "cities": ["Venlo"]}}}}"#
        )
        .unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.scrape_interval(), Duration::from_secs(60));
        assert_eq!(config.jam_acceptance, JamAcceptance::DelayOrLength);
        assert_eq!(config.monitored.roads(), &["A67".to_string()]);
        assert_eq!(config.page_timeout_secs, 15);
    }

    #[test]
    fn test_config_rejects_empty_roads() {
        let config = Config {
            monitored: MonitoredSet::new(Vec::<String>::new(), ["Breda"]),
            ..Config::default()
        };
        assert!(matches!(config.validated(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_rejects_zero_interval() {
        let config = Config {
            scrape_interval_secs: 0,
            ..Config::default()
        };
        assert!(config.validated().is_err());
    }
}
