//! Mandata API client.
//!
//! The main entry point for interacting with the Mandata registry API.
//! A `Client` holds the shared HTTP connection pool plus the selected
//! environment, API key and artifact directory; per-resource sub-clients
//! are handed out via `orgs()`, `poas()`, `drafts()`, `operations()` and
//! `gov()`. All configuration is immutable once the client is built, so
//! a clone can be shared freely across tasks.

use crate::drafts::DraftsClient;
use crate::error::{MandataError, Result};
use crate::gov::GovClient;
use crate::operations::OperationsClient;
use crate::orgs::OrgsClient;
use crate::poas::PoasClient;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

const STAGING_BASE_URL: &str = "https://api.staging.mandata.io";
const PRODUCTION_BASE_URL: &str = "https://api.mandata.io";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the static API key on every request.
pub const APIKEY_HEADER: &str = "X-Mandata-Apikey";
/// Header carrying the external-identity bearer token on gov requests.
pub const IDENTITY_TOKEN_HEADER: &str = "X-Identity-Token";

/// Environment variable read by [`Client::from_env`] for the API key.
pub const API_KEY_ENV: &str = "MANDATA_API_KEY";
/// Environment variable read by [`Client::from_env`] for the environment
/// name (`staging` or `production`; staging when unset).
pub const ENVIRONMENT_ENV: &str = "MANDATA_ENVIRONMENT";

/// Target deployment of the registry service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Test contour.
    #[default]
    Staging,
    /// Production contour.
    Production,
}

impl Environment {
    /// Base URL of the registry API in this environment.
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Staging => STAGING_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        }
    }
}

/// Mandata API client.
///
/// # Example
///
/// ```rust,no_run
/// use mandata::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new("mnd_live_xxxxx");
///
///     let org_id = client.orgs().select(1).await?;
///     let meta = client.poas().meta(&org_id, "poa-number", None).await?;
///     println!("{meta}");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) http: HttpClient,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) download_dir: PathBuf,
}

/// Configuration options for the client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Which deployment to talk to (default: staging).
    pub environment: Environment,
    /// Explicit base URL override; wins over `environment`. Mostly
    /// useful for pointing tests at a mock server.
    pub base_url: Option<String>,
    /// Request timeout (default: 30 seconds).
    pub timeout: Option<Duration>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Directory where fetched artifacts (archives, XML files) are
    /// written (default: current directory).
    pub download_dir: Option<PathBuf>,
}

impl Client {
    /// Create a new Mandata client for the staging environment with
    /// default configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(api_key, ClientConfig::default())
    }

    /// Create a new Mandata client with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use mandata::{Client, ClientConfig, Environment};
    ///
    /// let client = Client::with_config("mnd_live_xxxxx", ClientConfig {
    ///     environment: Environment::Production,
    ///     download_dir: Some("/var/poa".into()),
    ///     ..Default::default()
    /// });
    /// ```
    pub fn with_config(api_key: impl Into<String>, config: ClientConfig) -> Self {
        let timeout = config
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let user_agent = config
            .user_agent
            .unwrap_or_else(|| format!("mandata-rust/{}", env!("CARGO_PKG_VERSION")));

        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config
                .base_url
                .unwrap_or_else(|| config.environment.base_url().to_string()),
            api_key: api_key.into(),
            download_dir: config.download_dir.unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Build a client from `MANDATA_API_KEY` and `MANDATA_ENVIRONMENT`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            MandataError::InvalidArgument(format!("{API_KEY_ENV} is not set"))
        })?;
        let environment = match std::env::var(ENVIRONMENT_ENV).ok().as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Staging,
        };
        Ok(Self::with_config(
            api_key,
            ClientConfig {
                environment,
                ..Default::default()
            },
        ))
    }

    /// Get the base URL for the API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Directory where fetched artifacts are written.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Get the orgs client for organization selection.
    pub fn orgs(&self) -> OrgsClient {
        OrgsClient::new(self.clone())
    }

    /// Get the poas client for synchronous POA operations.
    pub fn poas(&self) -> PoasClient {
        PoasClient::new(self.clone())
    }

    /// Get the drafts client for draft management.
    pub fn drafts(&self) -> DraftsClient {
        DraftsClient::new(self.clone())
    }

    /// Get the operations client for asynchronous operations.
    pub fn operations(&self) -> OperationsClient {
        OperationsClient::new(self.clone())
    }

    /// Get the gov client for externally-routed registrations.
    pub fn gov(&self) -> GovClient {
        GovClient::new(self.clone())
    }

    /// Path prefix for resources scoped to one organization.
    pub(crate) fn org_path(&self, org_id: &Uuid, rest: &str) -> String {
        format!("/v1/organizations/{org_id}{rest}")
    }

    /// Start an authenticated GET request.
    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        tracing::debug!(path, "GET");
        self.http
            .get(format!("{}{}", self.base_url, path))
            .header(APIKEY_HEADER, &self.api_key)
    }

    /// Start an authenticated POST request.
    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        tracing::debug!(path, "POST");
        self.http
            .post(format!("{}{}", self.base_url, path))
            .header(APIKEY_HEADER, &self.api_key)
    }

    /// Send a request and check it against the endpoint's documented
    /// status code. Any other status is surfaced as
    /// [`MandataError::Http`] with the raw response body; nothing is
    /// retried.
    pub(crate) async fn send(&self, request: RequestBuilder, expect: u16) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        if status != expect {
            let body = response.text().await.unwrap_or_default();
            return Err(MandataError::Http { status, body });
        }
        Ok(response)
    }
}
