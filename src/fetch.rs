//! Page-fetch collaborators.
//!
//! The pipelines only see `PageSource` / `PageSession`: load a URL, and
//! "click" a toggle found on a loaded page. `HttpPageSource` does this
//! with a blocking reqwest client; `StaticPageSource` serves pages from
//! memory for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::error::FetchError;
use crate::page::{PageDocument, Toggle, ToggleKind};

// ── Contract ─────────────────────────────────────────────────────────────

/// What to wait for after a load.
#[derive(Debug, Clone)]
pub struct WaitCondition {
    /// CSS selector expected on the loaded page, if any
    pub selector: Option<String>,
    pub timeout: Duration,
}

impl WaitCondition {
    pub fn new(timeout: Duration) -> Self {
        Self {
            selector: None,
            timeout,
        }
    }

    pub fn for_selector(mut self, css: impl Into<String>) -> Self {
        self.selector = Some(css.into());
        self
    }
}

pub trait PageSession {
    fn load(&mut self, url: &str, wait: &WaitCondition) -> Result<PageDocument, FetchError>;

    /// Activate a toggle on `page` and return the page as it reads after.
    fn activate(&mut self, page: &PageDocument, toggle: &Toggle)
    -> Result<PageDocument, FetchError>;
}

pub trait PageSource: Send + Sync {
    fn open_session(&self) -> Result<Box<dyn PageSession + '_>, FetchError>;
}

impl FetchError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Session { .. } | Self::Timeout(_) => true,
            Self::NotFound(_) => false,
        }
    }
}

// ── Retry ────────────────────────────────────────────────────────────────

/// Exponential backoff for opening sessions.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
            Duration::from_millis(settings.max_delay_ms),
        )
    }

    /// Delay before attempt `attempt` (0-indexed): zero, then
    /// `base * 2^(attempt-1)` capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let multiplier = 2u32.saturating_pow(attempt - 1);
        std::cmp::min(self.base_delay.saturating_mul(multiplier), self.max_delay)
    }

    pub fn run<T, F>(&self, what: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Result<T, FetchError>,
    {
        let mut last_error = String::new();
        for attempt in 0..self.max_attempts {
            let delay = self.delay_for_attempt(attempt);
            if !delay.is_zero() {
                debug!(what, attempt, ?delay, "retrying after delay");
                std::thread::sleep(delay);
            }
            match operation() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() => {
                    warn!(
                        what,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "attempt failed"
                    );
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }
        Err(FetchError::Session {
            attempts: self.max_attempts,
            message: last_error,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

// ── HTTP ─────────────────────────────────────────────────────────────────

pub struct HttpPageSource {
    client: Client,
    timeout: Duration,
}

impl HttpPageSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }
}

impl PageSource for HttpPageSource {
    fn open_session(&self) -> Result<Box<dyn PageSession + '_>, FetchError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            timeout: self.timeout,
        }))
    }
}

struct HttpSession {
    client: Client,
    timeout: Duration,
}

/// Where a plain HTTP client has to go to see the page with `toggle`
/// switched on: the toggle's own link, or the page URL with the form
/// field set. `None` when the toggle changes nothing server-side.
pub fn activation_url(page_url: &str, toggle: &Toggle) -> Option<String> {
    let base = url::Url::parse(page_url).ok()?;
    if let Some(href) = &toggle.href {
        return base.join(href).ok().map(String::from);
    }
    match (toggle.kind, &toggle.name) {
        (ToggleKind::Checkbox | ToggleKind::Button, Some(name)) => {
            let mut url = base;
            let value = toggle.value.as_deref().unwrap_or("on");
            url.query_pairs_mut().append_pair(name, value);
            Some(url.into())
        }
        _ => None,
    }
}

impl PageSession for HttpSession {
    fn load(&mut self, url: &str, wait: &WaitCondition) -> Result<PageDocument, FetchError> {
        let response = self.client.get(url).timeout(wait.timeout).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let page = PageDocument::new(url, response.text()?);
        if let Some(sel) = &wait.selector
            && !page.matches(sel)
        {
            debug!(url, selector = %sel, "wait selector not present on page");
        }
        Ok(page)
    }

    fn activate(
        &mut self,
        page: &PageDocument,
        toggle: &Toggle,
    ) -> Result<PageDocument, FetchError> {
        match activation_url(page.url(), toggle) {
            Some(target) => {
                debug!(label = %toggle.label, %target, "following toggle");
                let wait = WaitCondition::new(self.timeout);
                self.load(&target, &wait)
            }
            None => Ok(page.clone()),
        }
    }
}

// ── Static ───────────────────────────────────────────────────────────────

/// In-memory pages keyed by URL.
#[derive(Default)]
pub struct StaticPageSource {
    pages: HashMap<String, String>,
    /// (page url, lowercased toggle label) → page after activation
    activated: HashMap<(String, String), String>,
    load_delay: Option<Duration>,
    failing_opens: AtomicU32,
}

impl StaticPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Page served after activating a toggle whose label is `label`.
    pub fn with_activation(
        mut self,
        url: impl Into<String>,
        label: &str,
        html: impl Into<String>,
    ) -> Self {
        self.activated
            .insert((url.into(), label.to_lowercase()), html.into());
        self
    }

    /// Sleep this long on every load.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// The next `n` calls to `open_session` fail with a retryable error.
    pub fn failing_opens(self, n: u32) -> Self {
        self.failing_opens.store(n, Ordering::SeqCst);
        self
    }
}

impl PageSource for StaticPageSource {
    fn open_session(&self) -> Result<Box<dyn PageSession + '_>, FetchError> {
        let pending = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(FetchError::Timeout(Duration::ZERO));
        }
        Ok(Box::new(StaticSession { source: self }))
    }
}

struct StaticSession<'a> {
    source: &'a StaticPageSource,
}

impl PageSession for StaticSession<'_> {
    fn load(&mut self, url: &str, _wait: &WaitCondition) -> Result<PageDocument, FetchError> {
        if let Some(delay) = self.source.load_delay {
            std::thread::sleep(delay);
        }
        self.source
            .pages
            .get(url)
            .map(|html| PageDocument::new(url, html.as_str()))
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }

    fn activate(
        &mut self,
        page: &PageDocument,
        toggle: &Toggle,
    ) -> Result<PageDocument, FetchError> {
        let key = (page.url().to_string(), toggle.label.to_lowercase());
        Ok(match self.source.activated.get(&key) {
            Some(html) => PageDocument::new(page.url(), html.as_str()),
            None => page.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(kind: ToggleKind, label: &str) -> Toggle {
        Toggle {
            kind,
            label: label.into(),
            id: None,
            name: None,
            value: None,
            href: None,
        }
    }

    #[test]
    fn test_delay_for_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_recovers_after_failures() {
        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);
        let source = StaticPageSource::new()
            .with_page("u", "<p>x</p>")
            .failing_opens(2);
        assert!(policy.run("open", || source.open_session()).is_ok());
    }

    #[test]
    fn test_retry_gives_up() {
        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);
        let source = StaticPageSource::new().failing_opens(5);
        match policy.run("open", || source.open_session()) {
            Err(FetchError::Session { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected session error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_retry_stops_on_permanent_error() {
        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), _> = policy.run("load", || {
            calls += 1;
            Err(FetchError::NotFound("u".into()))
        });
        assert!(matches!(result, Err(FetchError::NotFound(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_static_load_and_missing() {
        let source = StaticPageSource::new().with_page("https://x.test/a", "<p>hi</p>");
        let mut session = source.open_session().unwrap();
        let wait = WaitCondition::new(Duration::from_secs(1));
        let page = session.load("https://x.test/a", &wait).unwrap();
        assert!(page.html().contains("hi"));
        assert!(matches!(
            session.load("https://x.test/b", &wait),
            Err(FetchError::NotFound(_))
        ));
    }

    #[test]
    fn test_static_activation() {
        let source = StaticPageSource::new()
            .with_page("u", "<button>Flitsers</button>")
            .with_activation("u", "Flitsers", "<li>Flitser A2</li>");
        let mut session = source.open_session().unwrap();
        let page = session
            .load("u", &WaitCondition::new(Duration::from_secs(1)))
            .unwrap();
        let after = session
            .activate(&page, &toggle(ToggleKind::Button, "flitsers"))
            .unwrap();
        assert!(after.html().contains("Flitser A2"));
        let unchanged = session
            .activate(&page, &toggle(ToggleKind::Button, "Files"))
            .unwrap();
        assert_eq!(unchanged.html(), page.html());
    }

    #[test]
    fn test_activation_url() {
        let mut t = toggle(ToggleKind::Button, "Flitsers");
        t.href = Some("/verkeer/flitsers?open=1".into());
        assert_eq!(
            activation_url("https://www.anwb.nl/verkeer/filelijst", &t).as_deref(),
            Some("https://www.anwb.nl/verkeer/flitsers?open=1")
        );

        let mut c = toggle(ToggleKind::Checkbox, "Toon flitsers");
        c.name = Some("show".into());
        assert_eq!(
            activation_url("https://www.anwb.nl/verkeer/filelijst", &c).as_deref(),
            Some("https://www.anwb.nl/verkeer/filelijst?show=on")
        );

        let l = toggle(ToggleKind::Label, "Flitsers");
        assert_eq!(activation_url("https://www.anwb.nl/", &l), None);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(
            FetchError::Status {
                status: 503,
                url: "u".into()
            }
            .is_retryable()
        );
        assert!(
            !FetchError::Status {
                status: 404,
                url: "u".into()
            }
            .is_retryable()
        );
        assert!(FetchError::Timeout(Duration::ZERO).is_retryable());
    }
}
