//! Asynchronous operations and the polling contract.
//!
//! Five operation kinds share one control-flow contract: submit the
//! payload, extract the operation id, then poll the status endpoint at
//! a fixed interval until the server reports a terminal status (`done`
//! or `error`). A terminal `error` is a business-level outcome and is
//! returned as a normal value; only transport-level failures raise
//! [`crate::MandataError`].
//!
//! State machine per operation: Created -> Pending -> {Done, Error}.
//! Pending self-loops under polling; no operation leaves a terminal
//! state.

use crate::client::Client;
use crate::error::{MandataError, Result};
use crate::poas::validation_payload;
use crate::types::{
    DownloadMode, DownloadOutcome, Operation, OperationKind, OperationStatus, PoaSource,
    Principal, RepresentativeIdentity,
};
use crate::util::file_part;
use reqwest::multipart::Form;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How an operation is polled to its terminal status.
///
/// The default policy matches the service's own guidance: one-second
/// interval, no attempt ceiling and no deadline, so polling runs until
/// the server reaches a terminal state. Callers that need a bound opt
/// into one with [`PollPolicy::max_attempts`] or [`PollPolicy::deadline`].
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Sleep between poll attempts. Must be positive.
    pub interval: Duration,
    /// Optional ceiling on poll attempts.
    pub max_attempts: Option<u64>,
    /// Optional overall deadline, measured from the first poll.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl PollPolicy {
    /// Unbounded polling at the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            deadline: None,
        }
    }

    /// Cap the number of poll attempts.
    pub fn max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Cap the total polling time.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Check the policy before any request is issued.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(MandataError::InvalidArgument(
                "polling interval must be positive".into(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(MandataError::InvalidArgument(
                "poll attempt budget must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Client for asynchronous operations.
///
/// Access via `client.operations()`.
pub struct OperationsClient {
    client: Client,
}

impl OperationsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the current status document of one operation, without
    /// polling.
    pub async fn status(
        &self,
        org_id: &Uuid,
        kind: OperationKind,
        operation_id: &Uuid,
    ) -> Result<Operation> {
        self.fetch_status(org_id, kind.segment(), operation_id, None)
            .await
    }

    /// Register a POA from a local document and detached signature,
    /// then poll the registration to its terminal status.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use mandata::{Client, PollPolicy};
    /// use uuid::Uuid;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::new("mnd_live_xxxxx");
    ///     let org = Uuid::parse_str("...")?;
    ///
    ///     let operation = client
    ///         .operations()
    ///         .register(&org, "poa.xml", "poa.xml.sig", &PollPolicy::default())
    ///         .await?;
    ///     println!("registration finished: {:?}", operation.status);
    ///     Ok(())
    /// }
    /// ```
    pub async fn register(
        &self,
        org_id: &Uuid,
        poa_path: impl AsRef<Path>,
        signature_path: impl AsRef<Path>,
        policy: &PollPolicy,
    ) -> Result<Operation> {
        policy.validate()?;
        let form = Form::new()
            .part("poa", file_part(poa_path).await?)
            .part("signature", file_part(signature_path).await?);

        let id = self
            .submit_multipart(org_id, OperationKind::Registration.segment(), form)
            .await?;
        self.poll(org_id, OperationKind::Registration.segment(), &id, policy, None)
            .await
    }

    /// Import a POA from the federal registry by number, then poll the
    /// import to its terminal status.
    pub async fn import(
        &self,
        org_id: &Uuid,
        number: &str,
        principal_inn: &str,
        representative_inn: &str,
        policy: &PollPolicy,
    ) -> Result<Operation> {
        policy.validate()?;
        let payload = identity_parameters(number, principal_inn, representative_inn);
        let id = self
            .submit_json(org_id, OperationKind::Import.segment(), &payload)
            .await?;
        self.poll(org_id, OperationKind::Import.segment(), &id, policy, None)
            .await
    }

    /// Revoke a POA from a local revocation document and detached
    /// signature, then poll the revocation to its terminal status.
    pub async fn revoke(
        &self,
        org_id: &Uuid,
        revocation_path: impl AsRef<Path>,
        signature_path: impl AsRef<Path>,
        policy: &PollPolicy,
    ) -> Result<Operation> {
        policy.validate()?;
        let form = Form::new()
            .part("revocation", file_part(revocation_path).await?)
            .part("signature", file_part(signature_path).await?);

        let id = self
            .submit_multipart(org_id, OperationKind::Revocation.segment(), form)
            .await?;
        self.poll(org_id, OperationKind::Revocation.segment(), &id, policy, None)
            .await
    }

    /// Validate a POA through the federal registry, then poll the
    /// validation to its terminal status. The report is in the
    /// operation's `result` field.
    pub async fn validate(
        &self,
        org_id: &Uuid,
        principal: &Principal,
        source: &PoaSource,
        representative: &RepresentativeIdentity,
        policy: &PollPolicy,
    ) -> Result<Operation> {
        policy.validate()?;
        let payload = validation_payload(principal, source, representative).await?;
        let id = self
            .submit_json(org_id, OperationKind::Validation.segment(), &payload)
            .await?;
        self.poll(org_id, OperationKind::Validation.segment(), &id, policy, None)
            .await
    }

    /// Download a POA by number. On success the result is resolved per
    /// `mode`: the ZIP archive is written to
    /// `{download_dir}/poa_{number}.zip`, or the metadata document is
    /// returned as JSON. A terminal `error` status is returned verbatim
    /// as [`DownloadOutcome::Failed`] with no resolution fetch.
    pub async fn download(
        &self,
        org_id: &Uuid,
        number: &str,
        principal_inn: &str,
        representative_inn: &str,
        mode: DownloadMode,
        policy: &PollPolicy,
    ) -> Result<DownloadOutcome> {
        policy.validate()?;
        let payload = identity_parameters(number, principal_inn, representative_inn);
        let segment = OperationKind::Download.segment();
        let id = self.submit_json(org_id, segment, &payload).await?;
        let operation = self.poll(org_id, segment, &id, policy, None).await?;

        if operation.status == OperationStatus::Error {
            return Ok(DownloadOutcome::Failed(operation));
        }

        match mode {
            DownloadMode::Archive => {
                let path = self
                    .client
                    .org_path(org_id, &format!("/operations/{segment}/{id}/zip-archive"));
                let response = self.client.send(self.client.get(&path), 200).await?;
                let bytes = response.bytes().await?;

                let target = self
                    .client
                    .download_dir()
                    .join(format!("poa_{number}.zip"));
                tokio::fs::write(&target, &bytes).await?;
                tracing::debug!(path = %target.display(), "wrote downloaded archive");
                Ok(DownloadOutcome::Archive {
                    operation,
                    path: target,
                })
            }
            DownloadMode::Meta => {
                let path = self
                    .client
                    .org_path(org_id, &format!("/operations/{segment}/{id}/meta"));
                let response = self.client.send(self.client.get(&path), 200).await?;
                let meta = response.json().await?;
                Ok(DownloadOutcome::Meta { operation, meta })
            }
        }
    }

    /// Submit a JSON operation payload; expects 201 and returns the
    /// operation id from the response body.
    pub(crate) async fn submit_json(
        &self,
        org_id: &Uuid,
        segment: &str,
        payload: &Value,
    ) -> Result<Uuid> {
        let path = self.client.org_path(org_id, &format!("/operations/{segment}"));
        let response = self
            .client
            .send(self.client.post(&path).json(payload), 201)
            .await?;
        let created: Operation = response.json().await?;
        Ok(created.id)
    }

    /// Submit a multipart operation payload; expects 201 and returns
    /// the operation id from the response body.
    pub(crate) async fn submit_multipart(
        &self,
        org_id: &Uuid,
        segment: &str,
        form: Form,
    ) -> Result<Uuid> {
        let path = self.client.org_path(org_id, &format!("/operations/{segment}"));
        let response = self
            .client
            .send(self.client.post(&path).multipart(form), 201)
            .await?;
        let created: Operation = response.json().await?;
        Ok(created.id)
    }

    /// Poll one operation until it reports a terminal status.
    ///
    /// The caller validates the policy before submitting; this loop
    /// only enforces the optional attempt and deadline budgets. The
    /// identity token header is added when `token` is given (gov
    /// operations).
    pub(crate) async fn poll(
        &self,
        org_id: &Uuid,
        segment: &str,
        operation_id: &Uuid,
        policy: &PollPolicy,
        token: Option<&str>,
    ) -> Result<Operation> {
        let started = Instant::now();
        let mut attempts: u64 = 0;

        loop {
            let operation = self.fetch_status(org_id, segment, operation_id, token).await?;
            attempts += 1;
            tracing::debug!(%operation_id, attempts, status = ?operation.status, "polled operation");

            if operation.status.is_terminal() {
                return Ok(operation);
            }
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

    async fn fetch_status(
        &self,
        org_id: &Uuid,
        segment: &str,
        operation_id: &Uuid,
        token: Option<&str>,
    ) -> Result<Operation> {
        let path = self
            .client
            .org_path(org_id, &format!("/operations/{segment}/{operation_id}"));
        let mut request = self.client.get(&path);
        if let Some(token) = token {
            request = request.header(crate::client::IDENTITY_TOKEN_HEADER, token);
        }
        let response = self.client.send(request, 200).await?;
        Ok(response.json().await?)
    }
}

/// The `{parameters: {poaIdentity, representativeRequisites}}` payload
/// shared by import and download submissions.
fn identity_parameters(number: &str, principal_inn: &str, representative_inn: &str) -> Value {
    json!({
        "parameters": {
            "poaIdentity": {
                "number": number,
                "principalInn": principal_inn,
            },
            "representativeRequisites": {
                "inn": representative_inn,
            }
        }
    })
}
