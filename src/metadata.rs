/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::metadata
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Define the contract for the package transport: version
    metadata retrieval, delta download, and post-download
    initialization.

  Security / Safety Notes:
    Decryption keys are passed through to the transport only;
    this module stores nothing.

  Dependencies:
    async-trait for object-safe async collaborator methods.

  Operational Scope:
    Implemented by the HTTP transport and by test doubles;
    consumed by the resolver, coordinator, and session.

  Revision History:
    2026-10-12 COD  Declared MetadataClient contract.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Narrow interfaces at I/O boundaries
    - Explicit error paths for every suspension point
============================================================*/

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::error::Result;
use crate::package_info::{DownloadProgressSample, PackageVersionInfo};

/// Progress callback handed to [`MetadataClient::download`] for the
/// duration of one transfer.
pub type ProgressCallback<'a> = dyn FnMut(DownloadProgressSample) + Send + 'a;

/// Source of package versions and the means to bring them up to date.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Retrieve local and remote metadata for every requested package.
    ///
    /// Failures should be reported as `SynpakError::MetadataUnavailable`;
    /// a successful fetch may still omit packages it knows nothing about.
    async fn fetch_version_info(
        &self,
        package_names: &BTreeSet<String>,
        check_integrity: bool,
    ) -> Result<HashMap<String, PackageVersionInfo>>;

    /// Transfer the delta described by `info`.
    ///
    /// Samples must arrive with non-decreasing `finished_bytes` and strictly
    /// increasing timestamps; the last sample of a completed transfer
    /// reports 100%.
    async fn download(
        &self,
        info: &PackageVersionInfo,
        decryption_key: Option<&str>,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<()>;

    /// Prepare downloaded content for use.
    async fn initialize(&self, package_name: &str, decryption_key: Option<&str>) -> Result<()>;
}
