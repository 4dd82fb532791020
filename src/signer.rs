//! Local document signing.
//!
//! The social-fund registration pipeline needs the generated SOAP
//! document signed locally before the final submission. Signing is
//! delegated to an external CryptoPro-style command-line utility run as
//! a subprocess; the [`Signer`] trait is the seam that lets tests
//! substitute a fake.

use crate::error::{MandataError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Produces a detached signature file for a local document.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign the file at `path`, writing the detached signature next to
    /// it as `<path>.sig`. Returns the signature path.
    async fn sign_detached(&self, path: &Path) -> Result<PathBuf>;
}

/// How the signing utility selects the key material.
#[derive(Debug, Clone)]
pub enum SignMode {
    /// Detached CMS signature by certificate thumbprint (`cryptcp`).
    Thumbprint(String),
    /// Raw GOST signature by key container name (`csptest`).
    Container(String),
}

/// Signer backed by an external CryptoPro command-line utility.
#[derive(Debug, Clone)]
pub struct CryptoProSigner {
    tool: PathBuf,
    mode: SignMode,
}

impl CryptoProSigner {
    /// Create a signer shelling out to the utility at `tool`.
    pub fn new(tool: impl Into<PathBuf>, mode: SignMode) -> Self {
        Self {
            tool: tool.into(),
            mode,
        }
    }
}

#[async_trait]
impl Signer for CryptoProSigner {
    async fn sign_detached(&self, path: &Path) -> Result<PathBuf> {
        if !self.tool.exists() {
            return Err(MandataError::Signing(format!(
                "signing utility not found: {}",
                self.tool.display()
            )));
        }

        let signature_path = PathBuf::from(format!("{}.sig", path.display()));
        let mut command = Command::new(&self.tool);
        match &self.mode {
            SignMode::Thumbprint(thumbprint) => {
                command
                    .args(["-sign", "-thumbprint", thumbprint])
                    .arg(path)
                    .args(["-der", "-strict", "-detached", "-fext", ".sig"]);
            }
            SignMode::Container(container) => {
                command
                    .args(["-keys", "-sign", "GOST12_256", "-cont", container])
                    .args(["-keytype", "exchange", "-in"])
                    .arg(path)
                    .arg("-out")
                    .arg(&signature_path);
            }
        }

        let status = command.status().await.map_err(|e| {
            MandataError::Signing(format!(
                "failed to run {}: {e}",
                self.tool.display()
            ))
        })?;
        if !status.success() {
            return Err(MandataError::Signing(format!(
                "{} exited with {status}",
                self.tool.display()
            )));
        }
        Ok(signature_path)
    }
}
