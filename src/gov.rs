//! Externally-routed registrations.
//!
//! Registrations routed through the national tax authority (`fns`) or
//! the social fund (`fss`) reuse the submit/poll contract of
//! [`crate::operations`], with two additions: every call carries an
//! external-identity bearer token (see [`crate::identity`]), and the
//! social-fund flow is a three-phase pipeline — generate a SOAP
//! document server-side, sign it locally, then submit the final
//! registration. Nothing is rolled back on a mid-pipeline failure;
//! artifacts already written to disk or submitted stay in place.

use crate::client::{Client, IDENTITY_TOKEN_HEADER};
use crate::error::{MandataError, Result};
use crate::operations::PollPolicy;
use crate::signer::Signer;
use crate::types::{GovRegistration, Operation, OperationStatus};
use crate::util::file_part;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use uuid::Uuid;

/// Client for externally-routed registrations.
///
/// Access via `client.gov()`.
pub struct GovClient {
    client: Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SoapDocument {
    draft_id: Uuid,
    document_id: Uuid,
}

impl GovClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Register a POA with the national tax authority, then poll to a
    /// terminal status. `token` is the external-identity access token.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use mandata::{Client, GovRegistration, PollPolicy};
    /// use uuid::Uuid;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::new("mnd_live_xxxxx");
    ///     let org = Uuid::parse_str("...")?;
    ///     let params = GovRegistration {
    ///         authority_code: "0087".into(),
    ///         registration_number: None,
    ///         payer_inn: "4401165141".into(),
    ///         payer_kpp: "440101001".into(),
    ///         payer_ogrn: "1164401052722".into(),
    ///         payer_snils: Some("170-978-650 12".into()),
    ///         sender_inn: "4401165141".into(),
    ///         sender_kpp: "440101001".into(),
    ///         extern_account_id: "acc-1".into(),
    ///         sender_certificate: "bW9jaw==".into(),
    ///         sender_ip: "203.0.113.7".into(),
    ///     };
    ///
    ///     let operation = client
    ///         .gov()
    ///         .register_tax(&org, "token", &params, "poa.xml", "poa.xml.sig",
    ///                       &PollPolicy::default())
    ///         .await?;
    ///     println!("{:?}", operation.status);
    ///     Ok(())
    /// }
    /// ```
    pub async fn register_tax(
        &self,
        org_id: &Uuid,
        token: &str,
        params: &GovRegistration,
        poa_path: impl AsRef<Path>,
        signature_path: impl AsRef<Path>,
        policy: &PollPolicy,
    ) -> Result<Operation> {
        policy.validate()?;
        let form = registration_form(params, false)
            .part("poa", file_part(poa_path).await?)
            .part("signature", file_part(signature_path).await?);

        let id = self
            .submit_multipart(org_id, "fns/registrations", token, form)
            .await?;
        self.client
            .operations()
            .poll(org_id, "fns/registrations", &id, policy, Some(token))
            .await
    }

    /// Register a POA with the social fund: generate the SOAP document,
    /// sign it locally via `signer`, then submit and poll the final
    /// registration.
    ///
    /// When the document-generation operation ends in the `error`
    /// status, that status document is returned and the remaining
    /// phases are skipped.
    pub async fn register_fund(
        &self,
        org_id: &Uuid,
        token: &str,
        params: &GovRegistration,
        poa_path: impl AsRef<Path>,
        signature_path: impl AsRef<Path>,
        signer: &dyn Signer,
        policy: &PollPolicy,
    ) -> Result<Operation> {
        policy.validate()?;

        // Phase 1: server-side SOAP document generation.
        let form = registration_form(params, true)
            .part("poa", file_part(&poa_path).await?)
            .part("signature", file_part(signature_path).await?);
        let soap_id = self
            .submit_multipart(org_id, "fss/soap-messages", token, form)
            .await?;
        let soap_operation = self
            .client
            .operations()
            .poll(org_id, "fss/soap-messages", &soap_id, policy, None)
            .await?;
        if soap_operation.status == OperationStatus::Error {
            return Ok(soap_operation);
        }

        let document: SoapDocument = serde_json::from_value(
            soap_operation.result.clone().unwrap_or(Value::Null),
        )
        .map_err(|e| {
            MandataError::Decode(format!(
                "soap-message result is missing draft/document ids: {e}"
            ))
        })?;
        let soap_file = self.fetch_soap_content(org_id, &soap_id, token, poa_path.as_ref()).await?;

        // Phase 2: local signature. The raw GOST signature comes out of
        // the utility in reversed byte order relative to what the
        // service expects.
        let local_signature = signer.sign_detached(&soap_file).await?;
        let mut raw = tokio::fs::read(&local_signature).await?;
        raw.reverse();
        let encoded = BASE64.encode(&raw);

        // Phase 3: final registration.
        let payload = json!({
            "externAccountId": params.extern_account_id,
            "draftId": document.draft_id,
            "documentId": document.document_id,
            "base64SoapMessageSignature": encoded,
            "payerInn": params.payer_inn,
        });
        let path = self.client.org_path(org_id, "/operations/fss/registrations");
        let response = self
            .client
            .send(
                self.client
                    .post(&path)
                    .header(IDENTITY_TOKEN_HEADER, token)
                    .json(&payload),
                201,
            )
            .await?;
        let created: Operation = response.json().await?;
        self.client
            .operations()
            .poll(org_id, "fss/registrations", &created.id, policy, Some(token))
            .await
    }

    async fn submit_multipart(
        &self,
        org_id: &Uuid,
        segment: &str,
        token: &str,
        form: Form,
    ) -> Result<Uuid> {
        let path = self.client.org_path(org_id, &format!("/operations/{segment}"));
        let response = self
            .client
            .send(
                self.client
                    .post(&path)
                    .header(IDENTITY_TOKEN_HEADER, token)
                    .multipart(form),
                201,
            )
            .await?;
        let created: Operation = response.json().await?;
        Ok(created.id)
    }

    /// Fetch the generated SOAP document and write it to
    /// `{download_dir}/soap_fund_{stem}.xml`, named after the POA file.
    async fn fetch_soap_content(
        &self,
        org_id: &Uuid,
        soap_id: &Uuid,
        token: &str,
        poa_path: &Path,
    ) -> Result<std::path::PathBuf> {
        let path = self.client.org_path(
            org_id,
            &format!("/operations/fss/soap-messages/{soap_id}/content"),
        );
        let response = self
            .client
            .send(
                self.client.get(&path).header(IDENTITY_TOKEN_HEADER, token),
                200,
            )
            .await?;
        let bytes = response.bytes().await?;

        let stem = poa_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("poa");
        let target = self
            .client
            .download_dir()
            .join(format!("soap_fund_{stem}.xml"));
        tokio::fs::write(&target, &bytes).await?;
        tracing::debug!(path = %target.display(), "wrote SOAP document");
        Ok(target)
    }
}

/// Assemble the form fields shared by both flows. The authority-code
/// field name differs per destination, and only the fund flow carries a
/// registration number.
fn registration_form(params: &GovRegistration, fund: bool) -> Form {
    let mut form = Form::new();
    if fund {
        form = form.text("fssCode", params.authority_code.clone());
        if let Some(number) = &params.registration_number {
            form = form.text("fssRegistrationNumber", number.clone());
        }
    } else {
        form = form.text("fnsCode", params.authority_code.clone());
    }
    form = form
        .text("payerInn", params.payer_inn.clone())
        .text("payerKpp", params.payer_kpp.clone())
        .text("payerOgrn", params.payer_ogrn.clone());
    if let Some(snils) = &params.payer_snils {
        form = form.text("payerSnils", snils.clone());
    }
    form.text("senderInn", params.sender_inn.clone())
        .text("senderKpp", params.sender_kpp.clone())
        .text("externAccountId", params.extern_account_id.clone())
        .text("senderCertificateContent", params.sender_certificate.clone())
        .text("senderIpAddress", params.sender_ip.clone())
}
