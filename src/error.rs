/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Syn-Pak-Core error types so update sessions,
    transports, and the CLI share one failure taxonomy.

  Security / Safety Notes:
    Error contexts never carry decryption keys; only package
    names, scene identifiers, and high-level paths are exposed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate session failures and to
    consolidate exit codes for the binary entry point.

  Revision History:
    2026-10-12 COD  Established update error taxonomy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::fmt;
use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Syn-Pak-Core operations.
pub type Result<T> = std::result::Result<T, SynpakError>;

/// Which side of the version metadata could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFault {
    /// Server metadata endpoint unavailable.
    RemoteUnreachable,
    /// On-disk manifest unreadable.
    LocalCorrupt,
}

impl fmt::Display for MetadataFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataFault::RemoteUnreachable => f.write_str("remote unreachable"),
            MetadataFault::LocalCorrupt => f.write_str("local manifest corrupt"),
        }
    }
}

/// Enumerates high-level error domains surfaced by Syn-Pak-Core.
#[derive(Debug, Error)]
pub enum SynpakError {
    #[error("Metadata for `{package}` unavailable ({fault}): {detail}")]
    MetadataUnavailable {
        package: String,
        fault: MetadataFault,
        detail: String,
    },
    #[error("No version entry for package `{package}`")]
    VersionUnknown { package: String },
    #[error("Download of `{package}` failed: {detail}")]
    DownloadFailed { package: String, detail: String },
    #[error("Initialization of `{package}` failed: {detail}")]
    InitializationFailed { package: String, detail: String },
    #[error("Scene `{scene}` failed to load: {detail}")]
    SceneLoadFailed { scene: String, detail: String },
    #[error("Update of `{package}` declined by operator")]
    UserDeclined { package: String },
    #[error("Prompt for `{package}` superseded by a newer session")]
    Superseded { package: String },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SynpakError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Numeric form of [`SynpakError::exit_code`].
    pub fn exit_status(&self) -> u8 {
        match self {
            SynpakError::MetadataUnavailable { .. } => 12,
            SynpakError::VersionUnknown { .. } => 13,
            SynpakError::DownloadFailed { .. } => 14,
            SynpakError::InitializationFailed { .. } => 15,
            SynpakError::SceneLoadFailed { .. } => 16,
            SynpakError::UserDeclined { .. } => 17,
            SynpakError::Superseded { .. } => 18,
            SynpakError::Config(_) => 20,
            SynpakError::Network(_) => 30,
            SynpakError::Serialization(_) => 31,
            SynpakError::Filesystem(_) => 40,
            SynpakError::Io(_) => 41,
            SynpakError::Runtime(_) => 50,
        }
    }

    /// Only a failed metadata fetch is worth a fresh attempt by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SynpakError::MetadataUnavailable { .. })
    }

    /// Fold a transport failure into `MetadataUnavailable` for `package`.
    ///
    /// Errors that already carry a metadata classification pass through
    /// untouched; anything else is treated as an unreachable remote.
    pub fn into_metadata_unavailable(self, package: &str) -> SynpakError {
        match self {
            err @ SynpakError::MetadataUnavailable { .. } => err,
            SynpakError::Filesystem(detail) | SynpakError::Serialization(detail) => {
                SynpakError::MetadataUnavailable {
                    package: package.to_string(),
                    fault: MetadataFault::LocalCorrupt,
                    detail,
                }
            }
            other => SynpakError::MetadataUnavailable {
                package: package.to_string(),
                fault: MetadataFault::RemoteUnreachable,
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_metadata_failures_are_retryable() {
        let unavailable = SynpakError::MetadataUnavailable {
            package: "Main".into(),
            fault: MetadataFault::RemoteUnreachable,
            detail: "timeout".into(),
        };
        assert!(unavailable.is_retryable());
        assert!(!SynpakError::VersionUnknown {
            package: "Main".into()
        }
        .is_retryable());
    }

    #[test]
    fn filesystem_errors_fold_into_local_corrupt() {
        let err = SynpakError::Filesystem("bad manifest".into()).into_metadata_unavailable("Main");
        match err {
            SynpakError::MetadataUnavailable { fault, package, .. } => {
                assert_eq!(fault, MetadataFault::LocalCorrupt);
                assert_eq!(package, "Main");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn network_errors_fold_into_remote_unreachable() {
        let err = SynpakError::Network("refused".into()).into_metadata_unavailable("Main");
        assert!(matches!(
            err,
            SynpakError::MetadataUnavailable {
                fault: MetadataFault::RemoteUnreachable,
                ..
            }
        ));
        assert_eq!(err.exit_status(), 12);
    }
}
