/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Client-side content-update orchestrator. Decides whether a
    newer version of a content package exists, coordinates the
    incremental download with live progress, then hands off to
    initialization and scene loading.

  Security / Safety Notes:
    Network and disk access live behind the MetadataClient and
    SceneLoader seams; the session logic itself performs none.

  Dependencies:
    tokio, async-trait, reqwest, serde, sha2, chrono, thiserror.

  Operational Scope:
    Embedded by host applications or driven by the bundled CLI.

  Revision History:
    2026-10-12 COD  Split library surface from the binary.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Narrow collaborator interfaces
    - Explicit configuration, no hidden globals
============================================================*/

pub mod cache;
pub mod config;
pub mod confirm;
pub mod download;
pub mod error;
pub mod format;
pub mod host;
pub mod http_client;
pub mod logger;
pub mod metadata;
pub mod notify;
pub mod package_info;
pub mod resolver;
pub mod scene;
pub mod session;
pub mod speed;

pub use config::{ExecutionMode, SynpakConfig};
pub use confirm::{Choice, Confirmation, Prompt};
pub use error::{MetadataFault, Result, SynpakError};
pub use host::HostControl;
pub use logger::Logger;
pub use metadata::MetadataClient;
pub use notify::{CallbackSink, NotificationSink};
pub use package_info::{DownloadProgressSample, PackageVersionInfo};
pub use resolver::VersionResolver;
pub use scene::SceneLoader;
pub use session::{SessionReport, SessionState, UpdateRequest, UpdateSession, Updater};
pub use speed::SpeedTracker;
