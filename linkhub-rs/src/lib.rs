//! # linkhub-rs
//!
//! Wire types and a small Rust client for the linkhub admin API.
//!
//! The admin API manages shortened URLs, the partners they belong to, and
//! exposes per-code click analytics. Every call is authenticated with the
//! shared admin secret sent as a bearer token.
//!
//! ## Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), linkhub_rs::LinkhubApiError> {
//! use linkhub_rs::{CreateUrlRequest, LinkhubApi};
//!
//! let api = LinkhubApi::new("admin-secret".to_string()).with_url("http://localhost:8080");
//!
//! let created = api
//!     .create_url(&CreateUrlRequest {
//!         url: Some("https://example.com/very/long/url".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("created code: {}", created.code);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Request payload for creating a shortened URL.
///
/// Every field is optional on the wire so the server can answer a missing
/// `url` with a proper validation error. Empty strings are read as absent.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateUrlRequest {
    /// The target URL.
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// A custom code. A random one is generated when absent.
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "de::optional_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<i32>,
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_url: Option<String>,
    #[serde(default, deserialize_with = "de::optional_timestamp")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request payload for replacing the mutable fields of a shortened URL.
///
/// Fields left out are cleared on the server.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateUrlRequest {
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "de::optional_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<i32>,
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_url: Option<String>,
    #[serde(default, deserialize_with = "de::optional_timestamp")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request payload for registering a partner.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreatePartnerRequest {
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::empty_string_as_none")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// A shortened URL as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortUrl {
    pub code: String,
    pub url: String,
    pub partner_id: Option<i32>,
    pub referrer_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    /// Redirect counter, maintained by the redirect service.
    pub clicks: i32,
}

/// A shortened URL joined with the partner it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortUrlListing {
    #[serde(flatten)]
    pub url: ShortUrl,
    pub partner_name: Option<String>,
    pub partner_domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: i32,
    pub name: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCount {
    pub device: String,
    pub count: i64,
}

/// A single recorded redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub id: i64,
    pub code: String,
    pub country: Option<String>,
    pub device: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

/// Summary of the detection-evasion attempts logged for a code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BypassAttempts {
    pub count: i64,
    pub latest: Option<DateTime<Utc>>,
}

/// Click analytics for a single code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_clicks: i32,
    pub top_countries: Vec<CountryCount>,
    pub devices: Vec<DeviceCount>,
    pub recent_clicks: Vec<ClickEvent>,
    pub bypass_attempts: BypassAttempts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A client for the linkhub admin API.
///
/// # Example
///
/// ```rust,no_run
/// # async fn example() -> Result<(), linkhub_rs::LinkhubApiError> {
/// use linkhub_rs::LinkhubApi;
///
/// let api = LinkhubApi::new("admin-secret".to_string());
/// for partner in api.list_partners().await? {
///     println!("{} -> {}", partner.name, partner.domain);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LinkhubApi {
    url: String,
    secret: String,
    client: reqwest::Client,
}

/// Errors that can occur when talking to the admin API.
#[derive(Debug, Error)]
pub enum LinkhubApiError {
    /// The endpoint URL could not be built.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// Sending the request or receiving the response failed.
    #[error("Request error: {0}")]
    RequestError(String),
    /// The response body did not match the expected shape.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    /// The server answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: StatusCode, message: String },
}

impl LinkhubApi {
    /// Creates a client pointing at `http://localhost:8080`.
    ///
    /// * `secret` - the admin secret, sent as `Authorization: Bearer <secret>`
    pub fn new(secret: String) -> Self {
        Self {
            url: String::from("http://localhost:8080"),
            secret,
            client: reqwest::Client::new(),
        }
    }

    /// Sets the base URL of the server.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.trim_end_matches('/').into();
        self
    }

    /// Lists all shortened URLs, newest first.
    pub async fn list_urls(&self) -> Result<Vec<ShortUrlListing>, LinkhubApiError> {
        self.send(Method::GET, "urls_api", None::<&()>).await
    }

    /// Creates a shortened URL.
    ///
    /// # Errors
    ///
    /// Returns [`LinkhubApiError::Api`] with status 409 when the code is taken
    /// and 400 when `url` is missing.
    pub async fn create_url(&self, req: &CreateUrlRequest) -> Result<ShortUrl, LinkhubApiError> {
        self.send(Method::POST, "urls_api", Some(req)).await
    }

    pub async fn update_url(
        &self,
        code: &str,
        req: &UpdateUrlRequest,
    ) -> Result<ShortUrl, LinkhubApiError> {
        self.send(Method::PUT, &format!("urls_api/{code}"), Some(req))
            .await
    }

    /// Deletes a shortened URL. Succeeds even if the code does not exist.
    pub async fn delete_url(&self, code: &str) -> Result<DeleteResponse, LinkhubApiError> {
        self.send(Method::DELETE, &format!("urls_api/{code}"), None::<&()>)
            .await
    }

    pub async fn list_partners(&self) -> Result<Vec<Partner>, LinkhubApiError> {
        self.send(Method::GET, "partners", None::<&()>).await
    }

    pub async fn create_partner(
        &self,
        req: &CreatePartnerRequest,
    ) -> Result<Partner, LinkhubApiError> {
        self.send(Method::POST, "partners", Some(req)).await
    }

    /// Fetches click analytics for `code`.
    pub async fn analytics(&self, code: &str) -> Result<Analytics, LinkhubApiError> {
        self.send(Method::GET, &format!("analytics_api/{code}"), None::<&()>)
            .await
    }

    fn endpoint(&self, path: &str) -> Result<Url, LinkhubApiError> {
        Url::parse(&format!("{}/{}", self.url, path))
            .map_err(|e| LinkhubApiError::ConfigurationError(e.to_string()))
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, LinkhubApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .request(method, self.endpoint(path)?)
            .bearer_auth(&self.secret);

        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| LinkhubApiError::RequestError(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(LinkhubApiError::Api { status, message });
        }

        resp.json::<T>()
            .await
            .map_err(|e| LinkhubApiError::DeserializationError(e.to_string()))
    }
}

mod de {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    /// A number or a numeric string; `null`, `""` and `0` read as `None`.
    pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = match Option::<RawId>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(RawId::Number(n)) => n,
            Some(RawId::Text(s)) if s.trim().is_empty() => return Ok(None),
            Some(RawId::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid id: {s}")))?,
        };

        if id == 0 {
            return Ok(None);
        }

        i32::try_from(id)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("id out of range: {id}")))
    }

    /// `null`, a missing field and `""` all read as `None`.
    pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|s| !s.is_empty()))
    }

    /// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM[:SS]` read as UTC, or a
    /// bare `YYYY-MM-DD` read as midnight UTC.
    pub fn optional_timestamp<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = empty_string_as_none(deserializer)? else {
            return Ok(None);
        };

        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }

        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .map(|naive| Some(naive.and_utc()))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
