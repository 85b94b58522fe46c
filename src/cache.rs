/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::cache
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Locate per-package storage beneath the cache root and clear
    it on operator request.

  Security / Safety Notes:
    Package names are validated before any path is built, so a
    clear can never reach outside the cache root.

  Dependencies:
    None beyond std.

  Operational Scope:
    Used by the HTTP transport, the scene loader, and the CLI
    `clear` command.

  Revision History:
    2026-10-12 COD  Added package directory helpers and clear.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Validate before destructive operations
    - Explicit success/failure for every filesystem effect
============================================================*/

use std::path::{Path, PathBuf};

use crate::config::validate_package_name;
use crate::error::{Result, SynpakError};

/// Installed manifest file name inside a package directory.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Manifest staged by a download, promoted by initialization.
pub const PENDING_MANIFEST_FILE: &str = "manifest.pending.json";

/// Directory holding the content of `package`.
pub fn package_dir(root: &Path, package: &str) -> Result<PathBuf> {
    validate_package_name(package)?;
    Ok(root.join(package.trim()))
}

/// Delete all cached content for `package`.
///
/// Returns `true` if a directory was removed, `false` if none existed.
pub fn clear_package(root: &Path, package: &str) -> Result<bool> {
    let dir = package_dir(root, package)?;
    if !dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(&dir).map_err(|err| {
        SynpakError::Filesystem(format!("Failed to remove {}: {err}", dir.display()))
    })?;
    Ok(true)
}
