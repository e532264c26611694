//! ============================================================================
//! Campaign Server - LAN document store over tiny_http
//! ============================================================================
//! Routes:
//! - `GET  /health`                 -> `{ "status": "ok" }`
//! - `GET  /api/campaign`           -> stored document (flat default if none)
//! - `PUT  /api/campaign`           -> whole-document replace
//! - `GET  /api/locations`          -> `[{ id, name, settingId }]`, `?settingId=` filter
//! - `GET  /api/shop/:locationId`   -> player shop view
//!
//! Routing is `CampaignServer::handle`, a plain function over a
//! `DocumentStore`; `serve` only moves bytes between it and the socket.
//! ============================================================================

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::io::Read;
use tiny_http::{Header, Method, Response, Server};
use tracing::{debug, info, warn};

use crate::campaign::normalize_campaign;
use crate::config::RuntimeConfig;
use crate::db::DocumentStore;
use crate::shop_view::{list_locations, shop_view_for};
use crate::types::LEGACY_SCHEMA_VERSION;

/// Request bodies above this are refused with 413
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "message": message }),
        }
    }

    fn not_found() -> Self {
        Self::error(404, "Not found")
    }
}

/// The flat document served before anything has been stored
pub fn empty_campaign_document() -> Value {
    json!({
        "schemaVersion": LEGACY_SCHEMA_VERSION,
        "catalog": [],
        "locations": [],
    })
}

pub struct CampaignServer<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> CampaignServer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Route one request. `url` is the raw request target (path + query).
    pub fn handle(&self, method: &Method, url: &str, body: &str) -> ApiResponse {
        let Ok(parsed) = url::Url::parse(&format!("http://localhost{}", url)) else {
            return ApiResponse::error(400, "Malformed request URL");
        };
        let segments: Vec<&str> = parsed
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        let result = match (method, segments.as_slice()) {
            (Method::Get, ["health"]) => Ok(ApiResponse::ok(json!({ "status": "ok" }))),
            (Method::Get, ["api", "campaign"]) => self.get_campaign(),
            (Method::Put, ["api", "campaign"]) => self.put_campaign(body),
            (Method::Get, ["api", "locations"]) => {
                let setting_id = parsed
                    .query_pairs()
                    .find(|(key, _)| key == "settingId")
                    .map(|(_, value)| value.into_owned());
                self.get_locations(setting_id.as_deref())
            }
            (Method::Get, ["api", "shop", location_id]) => self.get_shop(location_id),
            _ => Ok(ApiResponse::not_found()),
        };

        result.unwrap_or_else(|e| {
            warn!("Request {} {} failed: {}", method, url, e);
            ApiResponse::error(500, "Internal server error")
        })
    }

    fn stored_document(&self) -> Result<Value> {
        Ok(self.store.load()?.unwrap_or_else(empty_campaign_document))
    }

    fn get_campaign(&self) -> Result<ApiResponse> {
        Ok(ApiResponse::ok(self.stored_document()?))
    }

    fn put_campaign(&self, body: &str) -> Result<ApiResponse> {
        let document: Value = match serde_json::from_str(body) {
            Ok(document @ Value::Object(_)) => document,
            Ok(_) | Err(_) => {
                debug!("Rejected campaign upload that is not a JSON object");
                return Ok(ApiResponse::error(400, "Campaign payload must be a JSON object"));
            }
        };

        self.store.save(&document)?;
        info!("Campaign document replaced ({} bytes)", body.len());
        Ok(ApiResponse::ok(json!({ "ok": true })))
    }

    fn get_locations(&self, setting_id: Option<&str>) -> Result<ApiResponse> {
        let campaign = normalize_campaign(&self.stored_document()?);
        let locations = list_locations(&campaign, setting_id);
        Ok(ApiResponse::ok(serde_json::to_value(locations)?))
    }

    fn get_shop(&self, location_id: &str) -> Result<ApiResponse> {
        let campaign = normalize_campaign(&self.stored_document()?);
        match shop_view_for(&campaign, location_id) {
            Some(view) => Ok(ApiResponse::ok(serde_json::to_value(view)?)),
            None => Ok(ApiResponse::error(404, "Location not found")),
        }
    }
}

// ============================================================================
// Socket Loop
// ============================================================================

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn respond(request: tiny_http::Request, status: u16, body: Option<&Value>) {
    let mut response = Response::from_string(body.map(Value::to_string).unwrap_or_default())
        .with_status_code(status);

    let headers = [
        header("Content-Type", "application/json"),
        header("Access-Control-Allow-Origin", "*"),
        header("Access-Control-Allow-Methods", "GET, PUT, OPTIONS"),
        header("Access-Control-Allow-Headers", "Content-Type"),
    ];
    for h in headers.into_iter().flatten() {
        response.add_header(h);
    }

    if let Err(e) = request.respond(response) {
        debug!("Client went away before the response was sent: {}", e);
    }
}

impl<S: DocumentStore> CampaignServer<S> {
    /// Serve until the listener fails. Blocking; run it on a dedicated
    /// thread (`spawn_blocking`) from async code.
    pub fn serve(&self, config: &RuntimeConfig) -> Result<()> {
        let addr = config.bind_address();
        let server = Server::http(&addr)
            .map_err(|e| anyhow!("Failed to start campaign server on {}: {}", addr, e))?;

        info!(
            "Campaign server listening on {} ({})",
            addr,
            if config.allow_lan { "LAN" } else { "local only" }
        );

        for mut request in server.incoming_requests() {
            let method = request.method().clone();
            let url = request.url().to_string();

            if method == Method::Options {
                respond(request, 204, None);
                continue;
            }

            if request.body_length().unwrap_or(0) > MAX_BODY_BYTES {
                warn!("Refusing {} {}: body too large", method, url);
                respond(request, 413, Some(&json!({ "message": "Payload too large" })));
                continue;
            }

            let mut body = String::new();
            let read = request
                .as_reader()
                .take(MAX_BODY_BYTES as u64 + 1)
                .read_to_string(&mut body);
            if let Err(e) = read {
                warn!("Failed to read body of {} {}: {}", method, url, e);
                respond(request, 400, Some(&json!({ "message": "Unreadable request body" })));
                continue;
            }
            if body.len() > MAX_BODY_BYTES {
                respond(request, 413, Some(&json!({ "message": "Payload too large" })));
                continue;
            }

            let response = self.handle(&method, &url, &body);
            debug!("{} {} -> {}", method, url, response.status);
            respond(request, response.status, Some(&response.body));
        }

        Ok(())
    }
}
