use serde::Serialize;

// ── Which pipeline a fragment belongs to ───────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Filelijst: traffic jams
    Traffic,
    /// Flitsers: speed cameras
    Cameras,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traffic => "traffic",
            Self::Cameras => "cameras",
        }
    }

    /// Minimum fragment length (in characters) before classification.
    pub fn min_fragment_chars(&self) -> usize {
        match self {
            Self::Traffic => 10,
            Self::Cameras => 5,
        }
    }
}

// ── Structured hints lifted from the source element ────────────────

/// Text pulled from specific parts of a structured list entry. Any field
/// may be missing or too short to be useful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuredHints {
    /// Heading, e.g. "Venlo → Eindhoven"
    pub heading: Option<String>,
    /// Emphasised text, usually the cause
    pub emphasis: Option<String>,
    /// Body / route text
    pub body: Option<String>,
}

/// Non-space characters a hint needs before it is trusted.
const MIN_HINT_CHARS: usize = 3;

fn usable(hint: &Option<String>) -> Option<&str> {
    hint.as_deref()
        .filter(|h| h.chars().filter(|c| !c.is_whitespace()).count() >= MIN_HINT_CHARS)
}

impl StructuredHints {
    pub fn heading(&self) -> Option<&str> {
        usable(&self.heading)
    }

    pub fn emphasis(&self) -> Option<&str> {
        usable(&self.emphasis)
    }

    pub fn body(&self) -> Option<&str> {
        usable(&self.body)
    }

    pub fn is_empty(&self) -> bool {
        self.heading().is_none() && self.emphasis().is_none() && self.body().is_none()
    }
}

// ── Candidate fragment ─────────────────────────────────────────────

/// A page fragment that may describe a jam or a camera. Lives for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<StructuredHints>,
    /// Road read from a dedicated element; `None` until resolved from text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
}

impl Candidate {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: normalize_ws(&text.into()),
            hints: None,
            road: None,
        }
    }

    pub fn with_hints(mut self, hints: StructuredHints) -> Self {
        if !hints.is_empty() {
            self.hints = Some(hints);
        }
        self
    }

    pub fn with_road(mut self, road: impl Into<String>) -> Self {
        let road = road.into().trim().to_uppercase();
        if !road.is_empty() {
            self.road = Some(road);
        }
        self
    }
}

/// Collapse runs of whitespace (page text is full of newlines and
/// indentation) into single spaces.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_needs_three_non_space_chars() {
        let hints = StructuredHints {
            heading: Some(" a b ".into()),
            emphasis: Some("mist".into()),
            body: None,
        };
        assert_eq!(hints.heading(), None);
        assert_eq!(hints.emphasis(), Some("mist"));
        assert!(!hints.is_empty());
    }

    #[test]
    fn test_empty_hints_are_dropped() {
        let c = Candidate::from_text("A2 file").with_hints(StructuredHints::default());
        assert!(c.hints.is_none());
    }

    #[test]
    fn test_candidate_normalizes_text_and_road() {
        let c = Candidate::from_text("  A67\n   Venlo  →\tEindhoven ").with_road(" a67 ");
        assert_eq!(c.text, "A67 Venlo → Eindhoven");
        assert_eq!(c.road.as_deref(), Some("A67"));
    }

    #[test]
    fn test_min_fragment_chars() {
        assert_eq!(PipelineKind::Traffic.min_fragment_chars(), 10);
        assert_eq!(PipelineKind::Cameras.min_fragment_chars(), 5);
    }
}
