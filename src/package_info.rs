/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::package_info
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing package version metadata and
    download progress samples.

  Security / Safety Notes:
    Pure data container; no I/O performed in this module.

  Dependencies:
    serde for report output.

  Operational Scope:
    Produced by metadata clients, reconciled by the resolver,
    and consumed by the download coordinator and session.

  Revision History:
    2026-10-12 COD  Introduced PackageVersionInfo and samples.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Serializable structures for reports
============================================================*/

use serde::Serialize;

/// Version and delta metadata for a single package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVersionInfo {
    pub package_name: String,
    pub local_version: u32,
    pub remote_version: u32,
    pub need_update: bool,
    pub need_download_count: u32,
    pub need_update_size_bytes: u64,
}

impl PackageVersionInfo {
    pub fn new(
        package_name: impl Into<String>,
        local_version: u32,
        remote_version: u32,
        need_download_count: u32,
        need_update_size_bytes: u64,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            local_version,
            remote_version,
            need_update: local_version != remote_version,
            need_download_count,
            need_update_size_bytes,
        }
    }

    /// Re-derive `need_update` from the versions and zero the delta fields
    /// when nothing needs to move.
    pub fn reconciled(self) -> Self {
        let need_update = self.local_version != self.remote_version;
        Self {
            need_update,
            need_download_count: if need_update { self.need_download_count } else { 0 },
            need_update_size_bytes: if need_update {
                self.need_update_size_bytes
            } else {
                0
            },
            ..self
        }
    }
}

/// One progress report from an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgressSample {
    pub finished_bytes: u64,
    pub total_bytes: u64,
    /// 0–100.
    pub percentage: f64,
    pub timestamp_millis: i64,
}

impl DownloadProgressSample {
    /// Build a sample whose percentage is derived from the byte counts.
    pub fn from_bytes(finished_bytes: u64, total_bytes: u64, timestamp_millis: i64) -> Self {
        let percentage = if total_bytes == 0 {
            100.0
        } else {
            (finished_bytes as f64 / total_bytes as f64 * 100.0).min(100.0)
        };
        Self {
            finished_bytes,
            total_bytes,
            percentage,
            timestamp_millis,
        }
    }
}
