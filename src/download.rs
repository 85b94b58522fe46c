/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::download
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Drive the delta transfer through the MetadataClient and turn
    raw samples into speed/percent status lines and a monotone
    0–1 progress stream.

  Security / Safety Notes:
    The decryption key is forwarded to the transport only and
    never appears in messages or logs.

  Dependencies:
    None beyond crate modules.

  Operational Scope:
    Invoked by the update session once the operator accepts a
    mandatory download.

  Revision History:
    2026-10-12 COD  Authored download coordinator.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Progress callback scoped to a single transfer
    - Transport failures folded into DownloadFailed
============================================================*/

use crate::error::{Result, SynpakError};
use crate::format::display_speed;
use crate::logger::Logger;
use crate::metadata::MetadataClient;
use crate::notify::NotificationSink;
use crate::package_info::{DownloadProgressSample, PackageVersionInfo};
use crate::speed::{MonotonicProgress, SpeedTracker};

/// Totals observed over one transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadSummary {
    pub samples: usize,
    pub finished_bytes: u64,
    pub average_speed: f64,
}

/// Forwards transfer progress from the transport to a notification sink.
pub struct DownloadCoordinator<'a> {
    client: &'a dyn MetadataClient,
    logger: Logger,
}

impl<'a> DownloadCoordinator<'a> {
    pub fn new(client: &'a dyn MetadataClient, logger: Logger) -> Self {
        Self { client, logger }
    }

    /// Status line shown for each sample.
    pub fn status_line(speed: f64, percentage: f64) -> String {
        format!(
            "Downloading... {}, progress: {:.2}%",
            display_speed(speed),
            percentage.clamp(0.0, 100.0)
        )
    }

    /// Transfer `info`'s delta, timing speed from `started_at_millis`.
    pub async fn run(
        &self,
        info: &PackageVersionInfo,
        decryption_key: Option<&str>,
        started_at_millis: i64,
        sink: &dyn NotificationSink,
    ) -> Result<DownloadSummary> {
        let mut tracker = SpeedTracker::new(started_at_millis);
        let mut progress = MonotonicProgress::new();
        let mut summary = DownloadSummary {
            samples: 0,
            finished_bytes: 0,
            average_speed: 0.0,
        };

        self.logger.info(
            "DOWNLOAD",
            format!(
                "Fetching {} bundles ({} bytes) for v{}",
                info.need_download_count, info.need_update_size_bytes, info.remote_version
            ),
        );

        let mut on_progress = |sample: DownloadProgressSample| {
            let speed = tracker.update(&sample);
            let fraction = progress.advance_percentage(sample.percentage);
            summary.samples += 1;
            summary.finished_bytes = summary.finished_bytes.max(sample.finished_bytes);
            summary.average_speed = speed;
            sink.on_message(&Self::status_line(speed, sample.percentage));
            sink.on_progress(fraction);
        };

        self.client
            .download(info, decryption_key, &mut on_progress)
            .await
            .map_err(|err| match err {
                failed @ SynpakError::DownloadFailed { .. } => failed,
                other => SynpakError::DownloadFailed {
                    package: info.package_name.clone(),
                    detail: other.to_string(),
                },
            })
            .inspect_err(|err| self.logger.error("DOWNLOAD", err.to_string()))?;

        self.logger.info(
            "DOWNLOAD",
            format!(
                "Transfer complete: {} bytes over {} samples",
                summary.finished_bytes, summary.samples
            ),
        );
        Ok(summary)
    }
}
