//! Read API over the latest stored run, plus on-demand scrape triggers.
//!
//! Routing is a pure function from (method, url) to a status and JSON body;
//! the server loop only moves bytes.

use std::io;
use std::sync::Arc;
use std::thread;

use serde_json::{Value, json};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, error, info, warn};
use traffic_types::{SpeedCamera, TrafficJam};
use url::form_urlencoded;

use crate::config::MonitoredSet;
use crate::pipeline::Orchestrator;

const SERVICE_NAME: &str = "verkeer_monitor";

// ── Filters ──────────────────────────────────────────────────────────────

/// Query filters shared by the list endpoints. `road`/`roads` and
/// `city`/`cities` both accept comma-separated values.
#[derive(Debug, Default, PartialEq)]
pub struct TrafficFilter {
    roads: Vec<String>,
    cities: Vec<String>,
    min_delay: Option<u32>,
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl TrafficFilter {
    pub fn from_query(query: &str) -> Result<Self, String> {
        let mut filter = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "road" | "roads" => filter
                    .roads
                    .extend(split_list(&value).map(str::to_uppercase)),
                "city" | "cities" => filter.cities.extend(split_list(&value).map(str::to_string)),
                "min_delay" if !value.trim().is_empty() => {
                    let min = value
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| format!("min_delay must be a non-negative integer, got {value:?}"))?;
                    filter.min_delay = Some(min);
                }
                _ => {}
            }
        }
        Ok(filter)
    }

    fn road_matches(&self, road: &str) -> bool {
        self.roads.is_empty() || self.roads.iter().any(|r| r.eq_ignore_ascii_case(road))
    }

    pub fn matches_jam(&self, jam: &TrafficJam) -> bool {
        self.road_matches(&jam.road)
            && (self.cities.is_empty() || self.cities.iter().any(|c| jam.mentions_city(c)))
            && self.min_delay.is_none_or(|min| jam.delay_minutes >= min)
    }

    /// Cameras have no delay; only road and city apply.
    pub fn matches_camera(&self, camera: &SpeedCamera) -> bool {
        self.road_matches(&camera.road)
            && (self.cities.is_empty() || self.cities.iter().any(|c| camera.mentions_city(c)))
    }
}

// ── Routing ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": detail.into() }),
        }
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }
}

/// Shared by every request thread.
pub struct ApiState {
    orchestrator: Arc<Orchestrator>,
    monitored: MonitoredSet,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, monitored: MonitoredSet) -> Self {
        Self {
            orchestrator,
            monitored,
        }
    }

    pub fn handle(&self, method: &Method, url: &str) -> ApiResponse {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };

        if *method == Method::Options {
            return ApiResponse::no_content();
        }

        match (method, path) {
            (Method::Get, "/api") => ApiResponse::ok(json!({
                "message": "ANWB Traffic Monitor API",
                "status": "active",
            })),
            (Method::Get, "/api/health") => self.health(),
            (Method::Get, "/api/status") => self.status(),
            (Method::Get, "/api/traffic") => self.traffic(query),
            (Method::Get, "/api/speed-cameras") => self.speed_cameras(query),
            (Method::Get, "/api/roads") => ApiResponse::ok(json!({ "roads": self.monitored.roads() })),
            (Method::Get, "/api/cities") => {
                ApiResponse::ok(json!({ "cities": self.monitored.cities() }))
            }
            (Method::Post, "/api/scrape-optimized" | "/api/traffic/refresh" | "/api/refresh") => {
                self.refresh()
            }
            (
                _,
                "/api" | "/api/health" | "/api/status" | "/api/traffic" | "/api/speed-cameras"
                | "/api/roads" | "/api/cities" | "/api/scrape-optimized" | "/api/traffic/refresh"
                | "/api/refresh",
            ) => ApiResponse::error(405, format!("method {method} not allowed on {path}")),
            _ => ApiResponse::error(404, format!("no route for {path}")),
        }
    }

    fn health(&self) -> ApiResponse {
        ApiResponse::ok(json!({
            "status": "ok",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "scrape_in_progress": self.orchestrator.is_running(),
        }))
    }

    fn status(&self) -> ApiResponse {
        match self.orchestrator.store().status() {
            Ok(status) => ApiResponse::ok(json!({
                "status": "active",
                "last_updated": status.last_updated,
                "traffic_jams_count": status.traffic_jams,
                "speed_cameras_count": status.speed_cameras,
                "scrape_in_progress": self.orchestrator.is_running(),
                "target_roads": self.monitored.roads(),
                "target_cities": self.monitored.cities(),
            })),
            Err(e) => {
                error!(error = %e, "reading store status failed");
                ApiResponse::error(500, "error getting status")
            }
        }
    }

    fn traffic(&self, query: &str) -> ApiResponse {
        let filter = match TrafficFilter::from_query(query) {
            Ok(f) => f,
            Err(detail) => return ApiResponse::error(400, detail),
        };
        let snapshot = match self.orchestrator.store().latest() {
            Ok(Some(s)) => s,
            Ok(None) => return ApiResponse::error(404, "no traffic data available yet"),
            Err(e) => {
                error!(error = %e, "reading traffic data failed");
                return ApiResponse::error(500, "error retrieving traffic data");
            }
        };

        let total_jams = snapshot.traffic_jams.len();
        let jams: Vec<&TrafficJam> = snapshot
            .traffic_jams
            .iter()
            .filter(|j| filter.matches_jam(j))
            .collect();
        let cameras: Vec<&SpeedCamera> = snapshot
            .speed_cameras
            .iter()
            .filter(|c| filter.matches_camera(c))
            .collect();
        debug!(total_jams, filtered_jams = jams.len(), "traffic query");

        ApiResponse::ok(json!({
            "filtered_jams": jams.len(),
            "traffic_jams": jams,
            "speed_cameras": cameras,
            "last_updated": snapshot.last_updated,
            "total_jams": total_jams,
        }))
    }

    fn speed_cameras(&self, query: &str) -> ApiResponse {
        let filter = match TrafficFilter::from_query(query) {
            Ok(f) => f,
            Err(detail) => return ApiResponse::error(400, detail),
        };
        match self.orchestrator.store().latest() {
            Ok(Some(snapshot)) => {
                let total = snapshot.speed_cameras.len();
                let cameras: Vec<&SpeedCamera> = snapshot
                    .speed_cameras
                    .iter()
                    .filter(|c| filter.matches_camera(c))
                    .collect();
                ApiResponse::ok(json!({
                    "filtered_cameras": cameras.len(),
                    "speed_cameras": cameras,
                    "last_updated": snapshot.last_updated,
                    "total_cameras": total,
                }))
            }
            Ok(None) => ApiResponse::error(404, "no speed camera data available yet"),
            Err(e) => {
                error!(error = %e, "reading speed camera data failed");
                ApiResponse::error(500, "error retrieving speed camera data")
            }
        }
    }

    /// Failures are reported in the summary body, always with 200.
    fn refresh(&self) -> ApiResponse {
        let summary = self.orchestrator.run();
        match serde_json::to_value(&summary) {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => ApiResponse::ok(json!({ "success": false, "error": e.to_string() })),
        }
    }
}

// ── Server loop ──────────────────────────────────────────────────────────

fn respond(request: Request, reply: ApiResponse) {
    let body = if reply.body.is_null() {
        String::new()
    } else {
        reply.body.to_string()
    };
    let mut response = Response::from_string(body).with_status_code(reply.status);
    for (name, value) in [
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
        ("Access-Control-Allow-Headers", "*"),
    ] {
        if let Ok(header) = Header::from_bytes(name, value) {
            response.add_header(header);
        }
    }
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to send response");
    }
}

/// Serve until the listener fails. Each request gets its own thread so a
/// triggered scrape does not block reads.
pub fn serve(bind: &str, state: Arc<ApiState>) -> io::Result<()> {
    let server = Server::http(bind).map_err(|e| io::Error::other(format!("server: {e}")))?;
    info!(%bind, "API listening");

    for request in server.incoming_requests() {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            let method = request.method().clone();
            let url = request.url().to_string();
            let reply = state.handle(&method, &url);
            debug!(%method, %url, status = reply.status, "request");
            respond(request, reply);
        });
    }
    Ok(())
}
