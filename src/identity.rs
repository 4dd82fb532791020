//! External-identity device-authorization flow.
//!
//! The externally-routed registrations (tax authority, social fund)
//! require a bearer token from a separate identity provider, obtained
//! via the OAuth device-authorization grant: start the device flow,
//! have a human approve it out of band, exchange the device code for a
//! token, refresh when expired. The identity provider lives on its own
//! host, so this client is built independently of [`crate::Client`].

use crate::client::Environment;
use crate::error::{MandataError, Result};
use crate::operations::PollPolicy;
use crate::types::{DeviceAuthorization, IdentityToken};
use reqwest::Client as HttpClient;
use serde_json::Value;

const STAGING_IDENTITY_URL: &str = "https://identity.staging.mandata.io";
const PRODUCTION_IDENTITY_URL: &str = "https://identity.mandata.io";
const DEVICE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const SCOPE: &str = "registry.api offline_access";

/// Configuration for the identity client.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Which deployment to talk to (default: staging).
    pub environment: Environment,
    /// Explicit base URL override; wins over `environment`.
    pub base_url: Option<String>,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

/// Client for the device-authorization token flow.
///
/// # Example
///
/// ```rust,no_run
/// use mandata::{IdentityClient, IdentityConfig, PollPolicy};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let identity = IdentityClient::new(IdentityConfig {
///         client_id: "my-client".into(),
///         client_secret: "s3cret".into(),
///         ..IdentityConfig::default()
///     });
///
///     let auth = identity.start_device_authorization().await?;
///     println!("approve at: {}", auth.verification_uri);
///     let token = identity.wait_for_token(&auth, &PollPolicy::default()).await?;
///     println!("token obtained, expires in {:?}s", token.expires_in);
///     Ok(())
/// }
/// ```
pub struct IdentityClient {
    http: HttpClient,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Staging,
            base_url: None,
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

impl IdentityClient {
    /// Create a new identity client.
    pub fn new(config: IdentityConfig) -> Self {
        let base_url = config.base_url.unwrap_or_else(|| {
            match config.environment {
                Environment::Staging => STAGING_IDENTITY_URL,
                Environment::Production => PRODUCTION_IDENTITY_URL,
            }
            .to_string()
        });
        Self {
            http: HttpClient::new(),
            base_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
        }
    }

    /// Get the base URL of the identity provider.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a device-authorization flow. The returned
    /// `verification_uri` (or `verification_uri_complete`) must be
    /// opened by a human; the SDK does not launch a browser.
    pub async fn start_device_authorization(&self) -> Result<DeviceAuthorization> {
        let response = self
            .http
            .post(format!("{}/connect/deviceauthorization", self.base_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", SCOPE),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(MandataError::Http { status, body });
        }
        Ok(response.json().await?)
    }

    /// Exchange the device code for a token, polling until the user
    /// approves the request.
    ///
    /// The provider answers `400 authorization_pending` while approval
    /// is outstanding; that is the non-terminal state and the loop
    /// sleeps and retries under `policy`. Any other non-200 answer is a
    /// transport error.
    pub async fn wait_for_token(
        &self,
        authorization: &DeviceAuthorization,
        policy: &PollPolicy,
    ) -> Result<IdentityToken> {
        policy.validate()?;
        let started = std::time::Instant::now();
        let mut attempts: u64 = 0;

        loop {
            let response = self
                .http
                .post(format!("{}/connect/token", self.base_url))
                .form(&[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("device_code", authorization.device_code.as_str()),
                    ("grant_type", DEVICE_GRANT),
                    ("scope", SCOPE),
                ])
                .send()
                .await?;

            let status = response.status().as_u16();
            if status == 200 {
                return Ok(response.json().await?);
            }

            let body = response.text().await.unwrap_or_default();
            if status != 400 || !is_authorization_pending(&body) {
                return Err(MandataError::Http { status, body });
            }

            attempts += 1;
            tracing::debug!(attempts, "authorization pending");
            if let Some(max) = policy.max_attempts {
                if attempts >= max {
                    return Err(MandataError::PollBudgetExhausted { attempts });
                }
            }
            if let Some(deadline) = policy.deadline {
                if started.elapsed() >= deadline {
                    return Err(MandataError::PollBudgetExhausted { attempts });
                }
            }
            tokio::time::sleep(policy.interval).await;
        }
    }

    /// Obtain a fresh token pair from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IdentityToken> {
        let response = self
            .http
            .post(format!("{}/connect/token", self.base_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", SCOPE),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(MandataError::Http { status, body });
        }
        Ok(response.json().await?)
    }
}

fn is_authorization_pending(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str().map(String::from)))
        .is_some_and(|e| e == "authorization_pending")
}
