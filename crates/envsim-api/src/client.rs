// Hand-crafted async HTTP client for the environment simulation API.
//
// Base path: {gateway}/api/
// Auth: X-Api-Key header

use std::str::FromStr;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::FanStatus;
use crate::transport::TransportConfig;

const API_KEY_HEADER: &str = "X-Api-Key";
/// Characters of an undecodable body quoted in the error message.
const BODY_PREVIEW_CHARS: usize = 200;

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the environment simulation.
///
/// Reads sensors, fans and heaters and writes actuator commands. Every
/// request carries the static API key; there is no session state.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GatewayClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `X-Api-Key` as a sensitive default header on every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|_| Error::InvalidApiKey)?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The gateway root every endpoint path is joined onto.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Guarantee a trailing slash so relative joins keep the full path.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_text(&self, path: &str) -> Result<String, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = body
                .char_indices()
                .nth(BODY_PREVIEW_CHARS)
                .map_or(body.as_str(), |(end, _)| &body[..end]);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    /// POST a raw JSON scalar (`true`, `3`, ...) and expect a 2xx.
    async fn post_scalar(&self, path: &str, body: String) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url} body={body}");

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Self::check_status(resp).await.map(drop)
    }

    async fn post_empty(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).send().await?;
        Self::check_status(resp).await.map(drop)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::InvalidApiKey);
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = if raw.trim().is_empty() {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_owned)
        } else {
            raw
        };
        Err(Error::Gateway {
            status: status.as_u16(),
            message,
        })
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Sensors ──────────────────────────────────────────────────────

    /// Current temperature of a sensor, in degrees Celsius.
    ///
    /// `GET api/sensor/{id}`
    pub async fn read_sensor(&self, sensor_id: u32) -> Result<f64, Error> {
        let body = self.get_text(&format!("api/sensor/{sensor_id}")).await?;
        parse_scalar(&body)
    }

    // ── Fans ─────────────────────────────────────────────────────────

    /// `GET api/fans/{id}/state`
    pub async fn fan_state(&self, fan_id: u32) -> Result<FanStatus, Error> {
        self.get_json(&format!("api/fans/{fan_id}/state")).await
    }

    /// `POST api/fans/{id}` with body `true` / `false`.
    pub async fn set_fan_state(&self, fan_id: u32, on: bool) -> Result<(), Error> {
        debug!(fan_id, on, "setting fan state");
        self.post_scalar(&format!("api/fans/{fan_id}"), on.to_string())
            .await
    }

    // ── Heaters ──────────────────────────────────────────────────────

    /// Raw heater level as reported by the simulation.
    ///
    /// `GET api/heat/{id}/level`. Values outside 0..=5 are passed through
    /// untouched; interpreting them is the caller's job.
    pub async fn heater_level(&self, heater_id: u32) -> Result<i64, Error> {
        let body = self.get_text(&format!("api/heat/{heater_id}/level")).await?;
        parse_scalar(&body)
    }

    /// `POST api/heat/{id}` with the integer level as body.
    pub async fn set_heater_level(&self, heater_id: u32, level: u8) -> Result<(), Error> {
        debug!(heater_id, level, "setting heater level");
        self.post_scalar(&format!("api/heat/{heater_id}"), level.to_string())
            .await
    }

    // ── Simulation ───────────────────────────────────────────────────

    /// Reset every device of this client to the simulation defaults.
    ///
    /// `POST api/Envo/reset`
    pub async fn reset(&self) -> Result<(), Error> {
        debug!("resetting simulation");
        self.post_empty("api/Envo/reset").await
    }
}

/// Parse a plain-text scalar body, tolerating whitespace and JSON quoting.
fn parse_scalar<T: FromStr>(body: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    let trimmed = body.trim().trim_matches('"');
    trimmed.parse::<T>().map_err(|e| Error::Deserialization {
        message: format!("expected a number: {e}"),
        body: body.to_owned(),
    })
}
