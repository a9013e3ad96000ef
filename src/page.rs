//! Loaded pages and candidate discovery.
//!
//! A `PageDocument` keeps the raw HTML and parses it on demand, so it can
//! move between threads (`scraper::Html` cannot). Discovery runs three
//! strategies in sequence and unions their output:
//!
//!   1. structured selectors on the list markup, with hints
//!   2. innermost block elements whose text contains a road / flitser token
//!   3. fixed-size windows around road / flitser tokens in the page text

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;

use crate::types::{normalize_ws, Candidate, PipelineKind, StructuredHints};

// ── Selectors ────────────────────────────────────────────────────────────

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static SEL_ROAD_ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| selector("article[data-test-id='traffic-list-road']"));
static SEL_ROAD_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| selector("[data-test-id='traffic-list-road-road-number']"));
static SEL_CAMERA_ARTICLE: LazyLock<Selector> = LazyLock::new(|| {
    selector("article[data-accordion-road], [data-test-id*='flitser'], [data-test-id*='speed-camera']")
});
static SEL_ENTRY: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static SEL_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h2, h3, h4"));
static SEL_EMPHASIS: LazyLock<Selector> =
    LazyLock::new(|| selector("[data-test-id*='cause'], [data-test='cause'], strong, em, b"));
static SEL_BODY: LazyLock<Selector> =
    LazyLock::new(|| selector("[data-test='body-text'], [data-test-id*='body'], p"));
static SEL_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| selector("li, p, td, dd, article, section, div"));
static SEL_BODY_ROOT: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static SEL_CHECKBOX: LazyLock<Selector> = LazyLock::new(|| selector("input[type='checkbox']"));
static SEL_BUTTON: LazyLock<Selector> =
    LazyLock::new(|| selector("button, [role='button'], summary"));
static SEL_LABEL: LazyLock<Selector> = LazyLock::new(|| selector("label"));

static RE_ROAD_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[AN]\d{1,3}\b").expect("road anchor regex"));
static RE_FLITSER_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)flitser").expect("flitser anchor regex"));

/// Elements with more text than this are containers, not entries.
const MAX_BLOCK_CHARS: usize = 300;
/// Characters taken on each side of an anchor by the window strategy.
const WINDOW_CHARS: usize = 120;
/// Characters after an anchor used to test whether it is already covered.
const ANCHOR_LOOKAHEAD_CHARS: usize = 20;

fn element_text(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<Vec<_>>().join(" "))
}

fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

// ── Document ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PageDocument {
    url: String,
    html: String,
}

impl PageDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Plain-text snapshots become a single `<pre>` block.
    pub fn from_text(url: impl Into<String>, text: &str) -> Self {
        let escaped = text
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        Self::new(url, format!("<html><body><pre>{escaped}</pre></body></html>"))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }

    pub fn matches(&self, css: &str) -> bool {
        match Selector::parse(css) {
            Ok(sel) => self.parse().select(&sel).next().is_some(),
            Err(_) => false,
        }
    }

    /// Visible page text (script / style content skipped), whitespace
    /// collapsed.
    pub fn visible_text(&self) -> String {
        let doc = self.parse();
        let Some(body) = doc.select(&SEL_BODY_ROOT).next() else {
            return String::new();
        };
        let mut parts: Vec<&str> = Vec::new();
        for node in body.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node.ancestors().any(|a| {
                a.value().as_element().is_some_and(|e| {
                    matches!(e.name(), "script" | "style" | "noscript" | "template")
                })
            });
            if !hidden {
                parts.push(&**text);
            }
        }
        normalize_ws(&parts.join(" "))
    }

    /// Checkbox / button / label controls whose text contains `trigger`
    /// (case-insensitive).
    pub fn toggle_candidates(&self, trigger: &str) -> Vec<Toggle> {
        let doc = self.parse();
        let needle = trigger.to_lowercase();
        let mut toggles: Vec<Toggle> = Vec::new();

        for input in doc.select(&SEL_CHECKBOX) {
            let attrs = input.value();
            let id = attrs.attr("id").map(str::to_string);
            let label = id
                .as_deref()
                .and_then(|id| {
                    doc.select(&SEL_LABEL)
                        .find(|l| l.value().attr("for") == Some(id))
                        .map(element_text)
                })
                .and_then(non_empty)
                .or_else(|| attrs.attr("aria-label").map(str::to_string))
                .or_else(|| {
                    input
                        .ancestors()
                        .filter_map(ElementRef::wrap)
                        .find(|a| a.value().name() == "label")
                        .map(element_text)
                })
                .or_else(|| attrs.attr("name").map(str::to_string))
                .unwrap_or_default();
            toggles.push(Toggle {
                kind: ToggleKind::Checkbox,
                label,
                id,
                name: attrs.attr("name").map(str::to_string),
                value: attrs.attr("value").map(str::to_string),
                href: None,
            });
        }

        for button in doc.select(&SEL_BUTTON) {
            let attrs = button.value();
            let label = non_empty(element_text(button))
                .or_else(|| attrs.attr("aria-label").map(str::to_string))
                .unwrap_or_default();
            toggles.push(Toggle {
                kind: ToggleKind::Button,
                label,
                id: attrs.attr("id").map(str::to_string),
                name: attrs.attr("name").map(str::to_string),
                value: attrs.attr("value").map(str::to_string),
                href: attrs
                    .attr("href")
                    .or_else(|| attrs.attr("data-href"))
                    .map(str::to_string),
            });
        }

        // Labels not already attached to a checkbox above
        for label in doc.select(&SEL_LABEL) {
            let text = element_text(label);
            if toggles.iter().any(|t| t.label == text) {
                continue;
            }
            toggles.push(Toggle {
                kind: ToggleKind::Label,
                label: text,
                id: label.value().attr("for").map(str::to_string),
                name: None,
                value: None,
                href: None,
            });
        }

        toggles.retain(|t| t.label.to_lowercase().contains(&needle));
        toggles
    }
}

// ── Toggles ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleKind {
    Checkbox,
    Button,
    Label,
}

/// A click-to-expand control found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toggle {
    pub kind: ToggleKind,
    pub label: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub href: Option<String>,
}

// ── Discovery ────────────────────────────────────────────────────────────

/// Accumulates candidates across strategies, dropping exact text repeats.
/// Near-duplicates are left to `Deduplicator`.
#[derive(Default)]
struct CandidateSet {
    items: Vec<Candidate>,
    texts: HashSet<String>,
}

impl CandidateSet {
    /// Rejects empty text and exact repeats.
    fn push(&mut self, candidate: Candidate) -> bool {
        if candidate.text.is_empty() || self.texts.contains(&candidate.text) {
            return false;
        }
        self.texts.insert(candidate.text.clone());
        self.items.push(candidate);
        true
    }

    /// Like `push`, but also rejects a window that contains or is contained
    /// in an earlier candidate.
    fn push_window(&mut self, candidate: Candidate) -> bool {
        let overlaps = self
            .items
            .iter()
            .any(|c| c.text.contains(&candidate.text) || candidate.text.contains(&c.text));
        !overlaps && self.push(candidate)
    }

    fn covers(&self, lookahead: &str) -> bool {
        self.items.iter().any(|c| c.text.contains(lookahead))
    }
}

fn hints_for(entry: ElementRef<'_>, article: ElementRef<'_>) -> StructuredHints {
    StructuredHints {
        heading: first_text(entry, &SEL_HEADING).or_else(|| first_text(article, &SEL_HEADING)),
        emphasis: first_text(entry, &SEL_EMPHASIS),
        body: first_text(entry, &SEL_BODY),
    }
}

/// Strategy 1: list markup. One candidate per `li` entry, or per article
/// when it has no entries. Every visited entry lands in `claimed`.
fn structured<'a>(
    kind: PipelineKind,
    doc: &'a Html,
    out: &mut CandidateSet,
    claimed: &mut Vec<ElementRef<'a>>,
) -> usize {
    let article_sel: &Selector = match kind {
        PipelineKind::Traffic => &*SEL_ROAD_ARTICLE,
        PipelineKind::Cameras => &*SEL_CAMERA_ARTICLE,
    };
    let mut added = 0;
    for article in doc.select(article_sel) {
        let road = first_text(article, &SEL_ROAD_NUMBER)
            .or_else(|| article.value().attr("data-accordion-road").map(str::to_string));
        let entries: Vec<ElementRef<'_>> = article.select(&SEL_ENTRY).collect();
        let entries = if entries.is_empty() { vec![article] } else { entries };
        for entry in entries {
            let mut candidate =
                Candidate::from_text(element_text(entry)).with_hints(hints_for(entry, article));
            if let Some(road) = &road {
                candidate = candidate.with_road(road.as_str());
            }
            claimed.push(entry);
            if out.push(candidate) {
                added += 1;
            }
        }
    }
    added
}

/// True when `el` is a claimed entry, sits inside one, or wraps one.
fn overlaps_claimed(el: ElementRef<'_>, claimed: &[ElementRef<'_>]) -> bool {
    claimed.iter().any(|c| {
        c.id() == el.id()
            || el.ancestors().any(|a| a.id() == c.id())
            || c.ancestors().any(|a| a.id() == el.id())
    })
}

fn anchor_for(kind: PipelineKind) -> &'static Regex {
    match kind {
        PipelineKind::Traffic => &*RE_ROAD_ANCHOR,
        PipelineKind::Cameras => &*RE_FLITSER_ANCHOR,
    }
}

/// Strategy 2: innermost block elements whose text mentions the anchor
/// token, outside the markup strategy 1 already claimed.
fn text_contains(
    kind: PipelineKind,
    doc: &Html,
    out: &mut CandidateSet,
    claimed: &[ElementRef<'_>],
) -> usize {
    let anchor = anchor_for(kind);
    let min = kind.min_fragment_chars();
    let matching: Vec<(ElementRef<'_>, String)> = doc
        .select(&SEL_BLOCK)
        .filter_map(|el| {
            let text = element_text(el);
            let len = text.chars().count();
            (len >= min && len <= MAX_BLOCK_CHARS && anchor.is_match(&text)).then_some((el, text))
        })
        .collect();
    let ids: HashSet<_> = matching.iter().map(|(el, _)| el.id()).collect();

    let mut added = 0;
    for (el, text) in matching {
        let has_matching_child = el
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .any(|d| ids.contains(&d.id()));
        if has_matching_child || overlaps_claimed(el, claimed) {
            continue;
        }
        if out.push(Candidate::from_text(text)) {
            added += 1;
        }
    }
    added
}

fn char_window(text: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let from = if before == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(before - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let to = text[end..]
        .char_indices()
        .nth(after)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    &text[from..to]
}

/// Strategy 3: windows around anchor tokens in the visible text, skipping
/// anchors an earlier strategy already covered.
fn regex_windows(kind: PipelineKind, page_text: &str, out: &mut CandidateSet) -> usize {
    let anchor = anchor_for(kind);
    let mut added = 0;
    for m in anchor.find_iter(page_text) {
        let lookahead = char_window(page_text, m.start(), m.end(), 0, ANCHOR_LOOKAHEAD_CHARS);
        if out.covers(lookahead.trim()) {
            continue;
        }
        let window = char_window(page_text, m.start(), m.end(), WINDOW_CHARS, WINDOW_CHARS);
        if out.push_window(Candidate::from_text(window)) {
            added += 1;
        }
    }
    added
}

/// All candidate fragments for one pipeline, in strategy order.
pub fn discover(kind: PipelineKind, page: &PageDocument) -> Vec<Candidate> {
    let mut out = CandidateSet::default();
    let page_text = page.visible_text();
    let doc = page.parse();

    let mut claimed = Vec::new();
    let n_structured = structured(kind, &doc, &mut out, &mut claimed);
    let n_contains = text_contains(kind, &doc, &mut out, &claimed);
    let n_windows = regex_windows(kind, &page_text, &mut out);

    debug!(
        pipeline = kind.as_str(),
        url = page.url(),
        structured = n_structured,
        text_contains = n_contains,
        regex_windows = n_windows,
        "discovered candidates"
    );
    out.items
}
