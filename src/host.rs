/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::host
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Host process control for hard-stop outcomes (declined
    mandatory update, operator-chosen quit).

  Security / Safety Notes:
    Terminates the current process only; no signals are sent
    to other processes.

  Dependencies:
    None beyond std and the crate error taxonomy.

  Operational Scope:
    Called by the update session; replaced by recording doubles
    in tests.

  Revision History:
    2026-10-12 COD  Added HostControl and process exit impl.
    2026-10-19 COD  Exit status now follows the quit cause.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Terminal actions isolated behind one seam
============================================================*/

use crate::error::SynpakError;

/// Terminates the host application.
pub trait HostControl: Send + Sync {
    /// Stop the host because of `cause`.
    fn quit(&self, cause: &SynpakError);
}

/// Exits the current process with the status mapped from the cause.
///
/// A declined update exits with the `UserDeclined` status, while a quit
/// from the resolution-failure notice carries the status of the fetch
/// error, so the two stay distinguishable to operators.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl ProcessExit {
    pub fn new() -> Self {
        Self
    }

    pub fn status_for(cause: &SynpakError) -> i32 {
        i32::from(cause.exit_status())
    }
}

impl HostControl for ProcessExit {
    fn quit(&self, cause: &SynpakError) {
        std::process::exit(Self::status_for(cause));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataFault;

    #[test]
    fn outage_quit_differs_from_declined_quit() {
        let declined = SynpakError::UserDeclined {
            package: "Main".into(),
        };
        let outage = SynpakError::MetadataUnavailable {
            package: "Main".into(),
            fault: MetadataFault::RemoteUnreachable,
            detail: "connection refused".into(),
        };

        assert_eq!(ProcessExit::status_for(&declined), 17);
        assert_eq!(ProcessExit::status_for(&outage), 12);
    }
}
