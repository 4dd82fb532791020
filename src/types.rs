//! Type definitions for the Mandata SDK.
//!
//! Known payload shapes get typed structs; open-ended server documents
//! (POA metadata, operation results) stay as `serde_json::Value` since
//! the service treats them as opaque pass-through data.
//!
//! The "exactly one of" payload fields (POA identity vs. raw files,
//! representative requisites vs. certificate) are modelled as tagged
//! unions so conflicting combinations cannot be constructed; the
//! `from_parts` constructors exist for callers that start from optional
//! inputs and want the mutual-exclusivity check up front.

use crate::error::{MandataError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

/// An organization accessible to the API key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Organization identifier, used to scope every other call.
    pub id: Uuid,
    /// Legal-entity details of the organization.
    pub legal_entity: LegalEntity,
}

/// Legal-entity details as the registry reports them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalEntity {
    /// Tax id.
    pub inn: String,
    /// State registration number.
    pub ogrn: String,
    /// Tax registration code.
    pub kpp: String,
    /// Full legal name.
    pub full_name: String,
}

/// One page of the organization listing, in server order.
#[derive(Debug, Clone)]
pub struct OrganizationPage {
    /// Total number of organizations the API key can see.
    pub total_count: u64,
    /// Listed organizations; ordering is whatever the server returned.
    pub items: Vec<Organization>,
}

/// The principal (grantor) of a power of attorney.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    /// Principal tax id.
    pub inn: String,
    /// Principal tax registration code.
    pub kpp: String,
}

/// Reference to a registered POA by number and principal tax id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoaIdentity {
    /// POA number.
    pub number: String,
    /// Tax id of the principal.
    pub principal_inn: String,
}

/// A POA supplied as raw files: the document plus a detached signature.
#[derive(Debug, Clone)]
pub struct PoaFiles {
    /// Path to the POA XML document.
    pub poa_path: PathBuf,
    /// Path to the detached signature file.
    pub signature_path: PathBuf,
}

/// Exactly one way of identifying the POA under validation or download.
#[derive(Debug, Clone)]
pub enum PoaSource {
    /// By registered number and principal tax id.
    Identity(PoaIdentity),
    /// By raw document and signature files.
    Files(PoaFiles),
}

impl PoaSource {
    /// Assemble a source from optional inputs, enforcing that exactly
    /// one representation is present.
    pub fn from_parts(identity: Option<PoaIdentity>, files: Option<PoaFiles>) -> Result<Self> {
        match (identity, files) {
            (Some(id), None) => Ok(PoaSource::Identity(id)),
            (None, Some(f)) => Ok(PoaSource::Files(f)),
            (Some(_), Some(_)) => Err(MandataError::InvalidArgument(
                "only one of 'poaIdentity' or 'poaFiles' may be supplied".into(),
            )),
            (None, None) => Err(MandataError::InvalidArgument(
                "one of 'poaIdentity' or 'poaFiles' must be supplied".into(),
            )),
        }
    }
}

/// Free-form requisites of the representative (attorney).
#[derive(Debug, Clone, Serialize)]
pub struct RepresentativeRequisites {
    /// First name.
    pub name: String,
    /// Surname.
    pub surname: String,
    /// Patronymic, when the representative has one.
    #[serde(rename = "middlename", skip_serializing_if = "Option::is_none")]
    pub patronymic: Option<String>,
    /// National insurance number.
    pub snils: String,
    /// Personal tax id.
    pub inn: String,
    /// Corporate tax registration code, for corporate representatives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpp: Option<String>,
    /// Corporate registration number, for corporate representatives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ogrn: Option<String>,
}

/// Exactly one way of identifying the representative.
#[derive(Debug, Clone)]
pub enum RepresentativeIdentity {
    /// Free-form requisites.
    Requisites(RepresentativeRequisites),
    /// Certificate referenced by thumbprint.
    Thumbprint(String),
    /// Certificate supplied as a local file, sent base64-encoded.
    CertificateFile(PathBuf),
}

impl RepresentativeIdentity {
    /// Assemble a representative identity from optional inputs,
    /// enforcing that exactly one representation is present.
    pub fn from_parts(
        requisites: Option<RepresentativeRequisites>,
        thumbprint: Option<String>,
        certificate_path: Option<PathBuf>,
    ) -> Result<Self> {
        match (requisites, thumbprint, certificate_path) {
            (Some(r), None, None) => Ok(RepresentativeIdentity::Requisites(r)),
            (None, Some(t), None) => Ok(RepresentativeIdentity::Thumbprint(t)),
            (None, None, Some(p)) => Ok(RepresentativeIdentity::CertificateFile(p)),
            (None, None, None) => Err(MandataError::InvalidArgument(
                "one of 'representative', 'thumbprint' or 'certificate_path' must be supplied"
                    .into(),
            )),
            _ => Err(MandataError::InvalidArgument(
                "only one of 'representative', 'thumbprint' or 'certificate_path' may be supplied"
                    .into(),
            )),
        }
    }
}

/// Kind of server-side long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// POA registration.
    Registration,
    /// POA import from the federal registry.
    Import,
    /// POA validation.
    Validation,
    /// POA revocation.
    Revocation,
    /// POA download.
    Download,
}

impl OperationKind {
    /// URL path segment under `/operations/` for this kind.
    pub fn segment(&self) -> &'static str {
        match self {
            OperationKind::Registration => "registrations",
            OperationKind::Import => "imports",
            OperationKind::Validation => "validations",
            OperationKind::Revocation => "revocations",
            OperationKind::Download => "downloads",
        }
    }
}

/// Status of a server-side operation.
///
/// `done` and `error` are terminal; anything else the server may report
/// is treated as still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Terminal success.
    Done,
    /// Terminal business-level failure. Returned as a normal value,
    /// never raised as an SDK error.
    Error,
    /// Non-terminal; the operation is still in progress.
    #[serde(other)]
    Pending,
}

impl OperationStatus {
    /// Returns true when polling should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Done | OperationStatus::Error)
    }
}

/// A server-side operation status document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Operation {
    /// Opaque operation id.
    pub id: Uuid,
    /// Current status.
    pub status: OperationStatus,
    /// Result payload, present once the operation is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// What to resolve a finished download operation into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Fetch the ZIP archive and persist it to disk.
    Archive,
    /// Fetch the metadata document and return it.
    Meta,
}

/// Outcome of a download operation.
#[derive(Debug, Clone)]
pub enum DownloadOutcome {
    /// The operation finished and the archive was written to `path`.
    Archive {
        /// Terminal status document.
        operation: Operation,
        /// Where the ZIP archive was written.
        path: PathBuf,
    },
    /// The operation finished and the metadata document was fetched.
    Meta {
        /// Terminal status document.
        operation: Operation,
        /// POA metadata as returned by the server.
        meta: Value,
    },
    /// The operation reached the `error` status; no resolution fetch
    /// was attempted. The status document is returned verbatim.
    Failed(Operation),
}

/// Response to a device-authorization request.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    /// Code the SDK exchanges for a token once the user approves.
    pub device_code: String,
    /// Short code the user enters at the verification URI.
    pub user_code: String,
    /// Where the user completes the approval.
    pub verification_uri: String,
    /// Verification URI with the user code pre-filled.
    pub verification_uri_complete: Option<String>,
    /// Lifetime of the device code, in seconds.
    pub expires_in: Option<u64>,
    /// Server-suggested polling interval, in seconds.
    pub interval: Option<u64>,
}

/// An external-identity bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityToken {
    /// Bearer token sent in the `X-Identity-Token` header.
    pub access_token: String,
    /// Token used to obtain a fresh access token once this one expires.
    pub refresh_token: String,
    /// Access token lifetime, in seconds.
    pub expires_in: Option<u64>,
}

/// Parameters shared by the externally-routed (tax authority / social
/// fund) registration flows. Assembled by the caller; the SDK does not
/// discover the sender IP or the external account id itself.
#[derive(Debug, Clone)]
pub struct GovRegistration {
    /// Authority office code (tax office or fund branch).
    pub authority_code: String,
    /// Fund registration number; only used by the social-fund flow.
    pub registration_number: Option<String>,
    /// Payer tax id.
    pub payer_inn: String,
    /// Payer tax registration code.
    pub payer_kpp: String,
    /// Payer state registration number.
    pub payer_ogrn: String,
    /// Payer national insurance number, when required.
    pub payer_snils: Option<String>,
    /// Sender tax id.
    pub sender_inn: String,
    /// Sender tax registration code.
    pub sender_kpp: String,
    /// Account id in the external routing system.
    pub extern_account_id: String,
    /// Base64-encoded sender certificate body.
    pub sender_certificate: String,
    /// Public IP address of the sender.
    pub sender_ip: String,
}
