//! Synchronous POA operations.
//!
//! Every method here completes within a single HTTP exchange (the
//! revocation form is the one two-step exception: it reads the
//! organization and POA metadata first). Binary and XML responses are
//! persisted under the client's download directory, overwriting any
//! file already at the target path.

use crate::client::Client;
use crate::error::{MandataError, Result};
use crate::types::{PoaSource, Principal, RepresentativeIdentity};
use crate::util::{base64_file, to_camel_case};
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

/// Default bound, in milliseconds, on how long the server may wait
/// synchronously before answering with partial results.
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 1000;

/// Client for synchronous POA operations.
///
/// Access via `client.poas()`.
pub struct PoasClient {
    client: Client,
}

impl PoasClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Search POAs by free-form criteria.
    ///
    /// Keys are given in `snake_case` and converted to the `CamelCase`
    /// query-parameter names the API expects. `sync_timeout_ms` bounds
    /// the server-side wait, not the client.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use mandata::Client;
    /// use uuid::Uuid;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::new("mnd_live_xxxxx");
    ///     let org = Uuid::parse_str("...")?;
    ///
    ///     let found = client
    ///         .poas()
    ///         .search(&org, None, &[("principal_inn", "4401165141")])
    ///         .await?;
    ///     println!("{found}");
    ///     Ok(())
    /// }
    /// ```
    pub async fn search(
        &self,
        org_id: &Uuid,
        sync_timeout_ms: Option<u64>,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        let mut query: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| (to_camel_case(key), value.to_string()))
            .collect();
        query.push((
            "SyncTimeoutMs".to_string(),
            sync_timeout_ms.unwrap_or(DEFAULT_SYNC_TIMEOUT_MS).to_string(),
        ));

        let path = self.client.org_path(org_id, "/poas");
        let response = self
            .client
            .send(self.client.get(&path).query(&query), 200)
            .await?;
        Ok(response.json().await?)
    }

    /// Fetch the full metadata document for one POA by number.
    pub async fn meta(
        &self,
        org_id: &Uuid,
        number: &str,
        sync_timeout_ms: Option<u64>,
    ) -> Result<Value> {
        let path = self.client.org_path(org_id, &format!("/poas/{number}"));
        let query = [(
            "SyncTimeoutMs",
            sync_timeout_ms.unwrap_or(DEFAULT_SYNC_TIMEOUT_MS).to_string(),
        )];
        let response = self
            .client
            .send(self.client.get(&path).query(&query), 200)
            .await?;
        Ok(response.json().await?)
    }

    /// Fetch the ZIP archive with the POA files and write it to
    /// `{download_dir}/poa_{number}.zip`. Returns the path written.
    pub async fn archive(&self, org_id: &Uuid, number: &str) -> Result<PathBuf> {
        let path = self
            .client
            .org_path(org_id, &format!("/poas/{number}/zip-archive"));
        let response = self.client.send(self.client.get(&path), 200).await?;
        let bytes = response.bytes().await?;

        let target = self.client.download_dir().join(format!("poa_{number}.zip"));
        tokio::fs::write(&target, &bytes).await?;
        tracing::debug!(path = %target.display(), "wrote POA archive");
        Ok(target)
    }

    /// Generate the revocation XML for a POA and write it to
    /// `{download_dir}/revocation_poa_{number}.xml`.
    ///
    /// Reads the organization's legal-entity details and the POA's
    /// declared type first, then posts the reason-plus-identity payload.
    pub async fn revocation_xml(
        &self,
        org_id: &Uuid,
        number: &str,
        reason: Option<&str>,
    ) -> Result<PathBuf> {
        let organization = self.client.orgs().info(org_id).await?.ok_or_else(|| {
            MandataError::InvalidArgument(format!(
                "organization {org_id} is not accessible with this API key"
            ))
        })?;
        let meta = self.meta(org_id, number, None).await?;
        let poa_type = meta.pointer("/poa/poaType").cloned().unwrap_or(Value::Null);

        let entity = &organization.legal_entity;
        let payload = json!({
            "reason": reason,
            "inn": entity.inn,
            "ogrn": entity.ogrn,
            "kpp": entity.kpp,
            "name": entity.full_name,
            "poaType": poa_type,
        });

        let path = self
            .client
            .org_path(org_id, &format!("/poas/{number}/revocation/form-xml"));
        let response = self
            .client
            .send(self.client.post(&path).json(&payload), 200)
            .await?;
        let bytes = response.bytes().await?;

        let target = self
            .client
            .download_dir()
            .join(format!("revocation_poa_{number}.xml"));
        tokio::fs::write(&target, &bytes).await?;
        Ok(target)
    }

    /// Validate a POA locally (within the registry, without routing to
    /// the federal registry). Returns the validation report.
    ///
    /// The POA and representative are each given in exactly one
    /// representation; see [`PoaSource`] and [`RepresentativeIdentity`].
    pub async fn validate_local(
        &self,
        org_id: &Uuid,
        principal: &Principal,
        source: &PoaSource,
        representative: &RepresentativeIdentity,
        sync_timeout_ms: Option<u64>,
    ) -> Result<Value> {
        let mut payload = validation_payload(principal, source, representative).await?;
        payload["syncTimeoutMs"] = json!(sync_timeout_ms.unwrap_or(DEFAULT_SYNC_TIMEOUT_MS));

        let path = self.client.org_path(org_id, "/poas/validate-local");
        let response = self
            .client
            .send(self.client.post(&path).json(&payload), 200)
            .await?;
        Ok(response.json().await?)
    }

    /// Generate a POA XML document from its structured JSON form and
    /// write it to `{download_dir}/{name}.xml`. Returns the path written.
    pub async fn form_xml(&self, org_id: &Uuid, document: &Value, name: &str) -> Result<PathBuf> {
        let path = self.client.org_path(org_id, "/poas/form-xml");
        let response = self
            .client
            .send(self.client.post(&path).json(document), 200)
            .await?;
        let bytes = response.bytes().await?;

        let target = self.client.download_dir().join(format!("{name}.xml"));
        tokio::fs::write(&target, &bytes).await?;
        Ok(target)
    }

    /// Same as [`PoasClient::form_xml`], reading the structured form
    /// from a local JSON file.
    pub async fn form_xml_from_file(
        &self,
        org_id: &Uuid,
        json_path: impl AsRef<std::path::Path>,
        name: &str,
    ) -> Result<PathBuf> {
        let content = tokio::fs::read(json_path).await?;
        let document: Value = serde_json::from_slice(&content)
            .map_err(|e| MandataError::Decode(format!("input file is not valid JSON: {e}")))?;
        self.form_xml(org_id, &document, name).await
    }
}

/// Build the shared validation payload, populating exactly one of the
/// `poaIdentity`/`poaFiles` pair and exactly one representative
/// representation. File-based inputs are read and base64-encoded here.
pub(crate) async fn validation_payload(
    principal: &Principal,
    source: &PoaSource,
    representative: &RepresentativeIdentity,
) -> Result<Value> {
    let (poa_identity, poa_files) = match source {
        PoaSource::Identity(identity) => (json!(identity), Value::Null),
        PoaSource::Files(files) => (
            Value::Null,
            json!({
                "poaContent": base64_file(&files.poa_path).await?,
                "signatureContent": base64_file(&files.signature_path).await?,
            }),
        ),
    };

    let representative_value = match representative {
        RepresentativeIdentity::Requisites(requisites) => json!({
            "requisites": requisites,
            "certificate": Value::Null,
        }),
        RepresentativeIdentity::Thumbprint(thumbprint) => json!({
            "requisites": Value::Null,
            "certificate": { "thumbprint": thumbprint },
        }),
        RepresentativeIdentity::CertificateFile(path) => json!({
            "requisites": Value::Null,
            "certificate": { "body": base64_file(path).await? },
        }),
    };

    Ok(json!({
        "parameters": {
            "poaIdentity": poa_identity,
            "principal": principal,
            "representative": representative_value,
        },
        "poaFiles": poa_files,
    }))
}
