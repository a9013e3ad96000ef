//! Keeps fragments that plausibly describe a jam or a camera.

use tracing::debug;

use crate::config::MonitoredSet;
use crate::patterns::road_tokens;
use crate::types::{Candidate, PipelineKind};
use crate::vocab::{
    FLITSER_KEYWORDS, FLITSER_LOCATION_KEYWORDS, JAM_DELAY_KEYWORDS, JAM_TRAFFIC_KEYWORDS,
};

pub struct Classifier {
    monitored: MonitoredSet,
}

fn has_keyword(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lowered.contains(k))
}

impl Classifier {
    pub fn new(monitored: MonitoredSet) -> Self {
        Self { monitored }
    }

    fn mentions_monitored_road(&self, candidate: &Candidate) -> bool {
        if candidate
            .road
            .as_deref()
            .is_some_and(|r| self.monitored.is_monitored_road(r))
        {
            return true;
        }
        road_tokens(&candidate.text)
            .iter()
            .any(|t| self.monitored.is_monitored_road(t))
    }

    /// `(delay_kw && road) || (road && traffic_kw)`
    pub fn is_jam(&self, candidate: &Candidate) -> bool {
        if candidate.text.chars().count() < PipelineKind::Traffic.min_fragment_chars() {
            return false;
        }
        if !self.mentions_monitored_road(candidate) {
            return false;
        }
        let lowered = candidate.text.to_lowercase();
        has_keyword(&lowered, JAM_DELAY_KEYWORDS) || has_keyword(&lowered, JAM_TRAFFIC_KEYWORDS)
    }

    /// `(flitser_kw && road) || (flitser_kw && location_kw)`
    pub fn is_camera(&self, candidate: &Candidate) -> bool {
        if candidate.text.chars().count() < PipelineKind::Cameras.min_fragment_chars() {
            return false;
        }
        let lowered = candidate.text.to_lowercase();
        if !has_keyword(&lowered, FLITSER_KEYWORDS) {
            return false;
        }
        self.mentions_monitored_road(candidate) || has_keyword(&lowered, FLITSER_LOCATION_KEYWORDS)
    }

    pub fn accepts(&self, kind: PipelineKind, candidate: &Candidate) -> bool {
        match kind {
            PipelineKind::Traffic => self.is_jam(candidate),
            PipelineKind::Cameras => self.is_camera(candidate),
        }
    }

    pub fn classify(&self, kind: PipelineKind, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let before = candidates.len();
        let kept: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| self.accepts(kind, c))
            .collect();
        debug!(
            pipeline = kind.as_str(),
            before,
            kept = kept.len(),
            "classified fragments"
        );
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(MonitoredSet::default())
    }

    #[test]
    fn test_jam_with_delay() {
        let c = Candidate::from_text("A67 Venlo → Eindhoven + 12 min");
        assert!(classifier().is_jam(&c));
    }

    #[test]
    fn test_jam_requires_monitored_road() {
        let c = Candidate::from_text("A1 Amsterdam richting Amersfoort + 12 min");
        assert!(!classifier().is_jam(&c));
    }

    #[test]
    fn test_jam_road_from_dedicated_element() {
        let c = Candidate::from_text("Venlo → Eindhoven + 12 min").with_road("A67");
        assert!(classifier().is_jam(&c));
    }

    #[test]
    fn test_jam_too_short() {
        assert!(!classifier().is_jam(&Candidate::from_text("A2 file")));
    }

    #[test]
    fn test_jam_keyword_is_case_insensitive() {
        let c = Candidate::from_text("A2 FILE tussen Weert en Eindhoven");
        assert!(classifier().is_jam(&c));
    }

    #[test]
    fn test_camera_with_road() {
        let c = Candidate::from_text("Flitser A16 richting Rotterdam");
        assert!(classifier().is_camera(&c));
    }

    #[test]
    fn test_camera_with_location_keyword_only() {
        let c = Candidate::from_text("Mobiele flitser bij hmp 45");
        assert!(classifier().is_camera(&c));
    }

    #[test]
    fn test_camera_needs_flitser_keyword() {
        let c = Candidate::from_text("A16 richting Rotterdam km 102");
        assert!(!classifier().is_camera(&c));
    }

    #[test]
    fn test_classify_filters_batch() {
        let batch = vec![
            Candidate::from_text("A67 Venlo → Eindhoven + 12 min"),
            Candidate::from_text("Bekijk ook onze app"),
            Candidate::from_text("A2 Weert richting Eindhoven + 5 min"),
        ];
        let kept = classifier().classify(PipelineKind::Traffic, batch);
        assert_eq!(kept.len(), 2);
    }
}
