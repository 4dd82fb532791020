//! # Mandata Rust SDK
//!
//! Official Rust SDK for the Mandata power-of-attorney (POA) registry
//! API: registration, validation, revocation, import and download of
//! POA documents, plus draft management and the externally-routed
//! registration flows.
//!
//! The SDK is a thin, fully async wrapper: every method maps directly
//! to one authenticated HTTP call (or one submit-then-poll sequence for
//! long-running server-side operations) and persists returned artifacts
//! (ZIP archives, XML documents) under a configurable directory. There
//! is no automatic retry and no caching; any unexpected HTTP status is
//! surfaced immediately as [`MandataError::Http`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mandata::{Client, DownloadMode, PollPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Staging environment, API key from the environment.
//!     let client = Client::from_env()?;
//!
//!     // Pick the first organization the key can see.
//!     let org = client.orgs().select(1).await?;
//!
//!     // Register a POA and wait for the terminal status.
//!     let operation = client
//!         .operations()
//!         .register(&org, "poa.xml", "poa.xml.sig", &PollPolicy::default())
//!         .await?;
//!     println!("registration: {:?}", operation.status);
//!
//!     // Download the archive for a registered POA.
//!     let outcome = client
//!         .operations()
//!         .download(&org, "poa-number", "4401165141", "477704523710",
//!                   DownloadMode::Archive, &PollPolicy::default())
//!         .await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Operations and polling
//!
//! A server-side operation moves `pending -> {done, error}`. The SDK
//! polls at the interval of the supplied [`PollPolicy`] until a
//! terminal status appears; `error` is a business-level outcome and is
//! returned as a normal value, so callers inspect the returned status
//! document rather than catching an error. Polling is unbounded by
//! default; cap it with [`PollPolicy::max_attempts`] or
//! [`PollPolicy::deadline`].
//!
//! ## Error handling
//!
//! All operations return `Result<T, MandataError>`:
//!
//! ```rust,no_run
//! use mandata::{Client, MandataError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new("mnd_live_xxxxx");
//!
//!     match client.orgs().list().await {
//!         Ok(page) => println!("{} organizations", page.total_count),
//!         Err(MandataError::EmptyResult(_)) => println!("no usable account"),
//!         Err(MandataError::Http { status, body }) => println!("HTTP {status}: {body}"),
//!         Err(e) => println!("error: {e}"),
//!     }
//! }
//! ```

pub mod client;
pub mod drafts;
pub mod error;
pub mod gov;
pub mod identity;
pub mod operations;
pub mod orgs;
pub mod poas;
pub mod signer;
pub mod types;

mod util;

// Re-export main types at the crate root
pub use client::{Client, ClientConfig, Environment};
pub use error::{MandataError, Result};
pub use identity::{IdentityClient, IdentityConfig};
pub use operations::PollPolicy;
pub use signer::{CryptoProSigner, SignMode, Signer};

// Re-export types module for easy access
pub use types::{
    DeviceAuthorization, DownloadMode, DownloadOutcome, GovRegistration, IdentityToken,
    LegalEntity, Operation, OperationKind, OperationStatus, Organization, OrganizationPage,
    PoaFiles, PoaIdentity, PoaSource, Principal, RepresentativeIdentity,
    RepresentativeRequisites,
};
