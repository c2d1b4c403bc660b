//! VM attributes from the instance metadata service.

use anyhow::Context;
use log::debug;
use serde::Deserialize;

/// Header the metadata service requires on every request.
const METADATA_HEADER: (&str, &str) = ("Metadata", "true");

/// Attributes of the VM the benchmark ran on. All empty when the metadata
/// service could not be reached or answered with something unexpected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostMetadata {
    pub region: String,
    pub vm_size: String,
    pub os_sku: String,
    pub vm_id: String,
    pub os_distro: String,
    /// "True"/"False", or empty when unknown.
    pub is_linux: String,
}

#[derive(Debug, Deserialize)]
struct InstanceDocument {
    compute: Compute,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Compute {
    location: String,
    vm_size: String,
    sku: String,
    vm_id: String,
    offer: String,
    os_type: String,
}

impl HostMetadata {
    /// Read the `compute` section of an instance metadata document.
    pub fn from_document(text: &str) -> anyhow::Result<Self> {
        let doc: InstanceDocument =
            serde_json::from_str(text).context("parse instance metadata document")?;
        let c = doc.compute;
        let is_linux = if c.os_type == "Linux" { "True" } else { "False" };
        Ok(Self {
            region: c.location,
            vm_size: c.vm_size,
            os_sku: c.sku,
            vm_id: c.vm_id,
            os_distro: c.offer,
            is_linux: is_linux.to_string(),
        })
    }
}

/// Query the metadata service once. Any failure yields empty attributes so
/// the row can still be inserted.
pub async fn gather_metadata(client: &reqwest::Client, url: &str) -> HostMetadata {
    match fetch_metadata(client, url).await {
        Ok(metadata) => {
            debug!("instance metadata: {:?}", metadata);
            metadata
        }
        Err(e) => {
            debug!("metadata request failed, using empty values: {:#}", e);
            HostMetadata::default()
        }
    }
}

async fn fetch_metadata(client: &reqwest::Client, url: &str) -> anyhow::Result<HostMetadata> {
    let (name, value) = METADATA_HEADER;
    let body = client
        .get(url)
        .header(name, value)
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?
        .text()
        .await
        .context("read metadata response")?;
    HostMetadata::from_document(&body)
}

/// Release string of the running kernel, empty if the platform has none.
pub fn kernel_release() -> String {
    sysinfo::System::kernel_version().unwrap_or_default()
}
