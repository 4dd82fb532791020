//! Draft management.
//!
//! A draft is a server-side staging object created from a POA XML
//! document; it can be flagged for signing submission at creation time.

use crate::client::Client;
use crate::error::Result;
use crate::util::file_part;
use reqwest::multipart::Form;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Client for draft management.
///
/// Access via `client.drafts()`.
pub struct DraftsClient {
    client: Client,
}

impl DraftsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a draft from a local POA XML file. With `send_to_sign`,
    /// the draft is submitted for signing right away. Returns the
    /// draft id.
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
    ///     let draft_id = client.drafts().create_from_xml(&org, "poa.xml", true).await?;
    ///     println!("Created draft {draft_id}");
    ///     Ok(())
    /// }
    /// ```
    pub async fn create_from_xml(
        &self,
        org_id: &Uuid,
        xml_path: impl AsRef<Path>,
        send_to_sign: bool,
    ) -> Result<Uuid> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            draft_id: Uuid,
        }

        let form = Form::new()
            .text("sendToSign", send_to_sign.to_string())
            .part("poa", file_part(xml_path).await?);

        let path = self.client.org_path(org_id, "/drafts");
        let response = self
            .client
            .send(self.client.post(&path).multipart(form), 200)
            .await?;
        let created: Response = response.json().await?;
        Ok(created.draft_id)
    }

    /// Fetch the XML document of a draft and write it to
    /// `{download_dir}/draft_{number}.xml`. Returns the path written.
    pub async fn download_xml(&self, org_id: &Uuid, number: &str) -> Result<PathBuf> {
        let path = self.client.org_path(org_id, &format!("/drafts/{number}/xml"));
        let response = self.client.send(self.client.get(&path), 200).await?;
        let bytes = response.bytes().await?;

        let target = self
            .client
            .download_dir()
            .join(format!("draft_{number}.xml"));
        tokio::fs::write(&target, &bytes).await?;
        Ok(target)
    }
}
