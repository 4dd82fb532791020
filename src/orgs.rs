//! Organization selection.
//!
//! Every other API call is scoped to one organization id; this module
//! lists the organizations the API key can see and resolves one by
//! ordinal position or id. Organizations are never created or mutated
//! through this client.

use crate::client::Client;
use crate::error::{MandataError, Result};
use crate::types::{Organization, OrganizationPage};
use serde::Deserialize;
use uuid::Uuid;

/// Client for organization selection.
///
/// Access via `client.orgs()`.
pub struct OrgsClient {
    client: Client,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingResponse {
    total_count: u64,
    organizations: ListingItems,
}

#[derive(Deserialize)]
struct ListingItems {
    items: Vec<Organization>,
}

impl OrgsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// List the organizations accessible to the API key, in server order.
    ///
    /// Fails with [`MandataError::EmptyResult`] when the listing is
    /// empty — the key has no usable account.
    pub async fn list(&self) -> Result<OrganizationPage> {
        let response = self.client.send(self.client.get("/v1/organizations"), 200).await?;
        let listing: ListingResponse = response.json().await?;
        if listing.total_count == 0 {
            return Err(MandataError::EmptyResult(
                "no organizations are available for this API key".into(),
            ));
        }
        Ok(OrganizationPage {
            total_count: listing.total_count,
            items: listing.organizations.items,
        })
    }

    /// Resolve the organization id at the given 1-based position of the
    /// listing.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use mandata::Client;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::new("mnd_live_xxxxx");
    ///     let org_id = client.orgs().select(1).await?;
    ///     println!("Using organization {org_id}");
    ///     Ok(())
    /// }
    /// ```
    pub async fn select(&self, ordinal: usize) -> Result<Uuid> {
        if ordinal < 1 {
            return Err(MandataError::InvalidArgument(
                "organization ordinal is 1-based".into(),
            ));
        }
        let page = self.list().await?;
        if ordinal as u64 > page.total_count {
            return Err(MandataError::InvalidArgument(format!(
                "only {} organizations are available, ordinal {} is out of range",
                page.total_count, ordinal
            )));
        }
        // The listing may report more organizations than it returned;
        // an ordinal inside totalCount but past the items is a server
        // inconsistency, not a caller error.
        page.items.get(ordinal - 1).map(|org| org.id).ok_or_else(|| {
            MandataError::Decode(format!(
                "listing reports {} organizations but returned only {}",
                page.total_count,
                page.items.len()
            ))
        })
    }

    /// Look up one organization of the listing by id. A miss is a
    /// normal `None`, not an error.
    pub async fn info(&self, org_id: &Uuid) -> Result<Option<Organization>> {
        let page = self.list().await?;
        Ok(page.items.into_iter().find(|org| org.id == *org_id))
    }
}
