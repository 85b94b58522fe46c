/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::resolver
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Reconcile local and remote package versions and decide
    whether an update is required.

  Security / Safety Notes:
    Performs no I/O itself; all reads go through the supplied
    MetadataClient.

  Dependencies:
    None beyond crate modules.

  Operational Scope:
    Invoked once per update session and by the CLI `check`
    command.

  Revision History:
    2026-10-12 COD  Implemented version reconciliation.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Distinct failure kinds for fetch vs. missing entry
    - Single metadata round-trip per resolution
============================================================*/

use std::collections::{BTreeSet, HashMap};

use crate::error::{Result, SynpakError};
use crate::logger::Logger;
use crate::metadata::MetadataClient;
use crate::package_info::PackageVersionInfo;

/// Outcome of one successful metadata fetch.
#[derive(Debug, Clone, Default)]
pub struct ResolvedMetadata {
    entries: HashMap<String, PackageVersionInfo>,
}

impl ResolvedMetadata {
    pub fn new(entries: HashMap<String, PackageVersionInfo>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, info)| (name, info.reconciled()))
            .collect();
        Self { entries }
    }

    /// Reconciled entry for `package`, if the fetch returned one.
    pub fn get(&self, package: &str) -> Option<&PackageVersionInfo> {
        self.entries.get(package)
    }

    /// `(local, remote)` for `package`.
    pub fn versions(&self, package: &str) -> Option<(u32, u32)> {
        self.get(package)
            .map(|info| (info.local_version, info.remote_version))
    }
}

/// Compares local and remote metadata through a [`MetadataClient`].
pub struct VersionResolver<'a> {
    client: &'a dyn MetadataClient,
    logger: Logger,
}

impl<'a> VersionResolver<'a> {
    pub fn new(client: &'a dyn MetadataClient, logger: Logger) -> Self {
        Self { client, logger }
    }

    /// Fetch metadata for a set of packages in one call.
    pub async fn fetch(
        &self,
        packages: &BTreeSet<String>,
        check_integrity: bool,
    ) -> Result<ResolvedMetadata> {
        let label = packages.iter().cloned().collect::<Vec<_>>().join(",");
        let entries = self
            .client
            .fetch_version_info(packages, check_integrity)
            .await
            .map_err(|err| err.into_metadata_unavailable(&label))?;
        Ok(ResolvedMetadata::new(entries))
    }

    /// Resolve a single package into reconciled version info.
    pub async fn resolve(&self, package: &str, check_integrity: bool) -> Result<PackageVersionInfo> {
        let names = BTreeSet::from([package.to_string()]);
        let resolved = self.fetch(&names, check_integrity).await?;
        let info = resolved
            .get(package)
            .cloned()
            .ok_or_else(|| SynpakError::VersionUnknown {
                package: package.to_string(),
            })?;

        self.logger.info(
            "RESOLVE",
            format!(
                "local=v{} remote=v{} need_update={} bundles={} bytes={}",
                info.local_version,
                info.remote_version,
                info.need_update,
                info.need_download_count,
                info.need_update_size_bytes
            ),
        );
        Ok(info)
    }

    /// Installed version of `package` (0 if never downloaded).
    ///
    /// Uses `resolved` when given, otherwise fetches without an integrity
    /// check.
    pub async fn local_version(
        &self,
        package: &str,
        resolved: Option<&ResolvedMetadata>,
    ) -> Result<u32> {
        self.versions(package, resolved).await.map(|(local, _)| local)
    }

    /// Published version of `package`.
    pub async fn remote_version(
        &self,
        package: &str,
        resolved: Option<&ResolvedMetadata>,
    ) -> Result<u32> {
        self.versions(package, resolved).await.map(|(_, remote)| remote)
    }

    async fn versions(
        &self,
        package: &str,
        resolved: Option<&ResolvedMetadata>,
    ) -> Result<(u32, u32)> {
        let fetched;
        let metadata = match resolved {
            Some(metadata) => metadata,
            None => {
                fetched = self
                    .fetch(&BTreeSet::from([package.to_string()]), false)
                    .await?;
                &fetched
            }
        };
        metadata
            .versions(package)
            .ok_or_else(|| SynpakError::VersionUnknown {
                package: package.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataFault;
    use crate::metadata::ProgressCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClient {
        entries: Option<HashMap<String, PackageVersionInfo>>,
        calls: AtomicUsize,
    }

    impl FixedClient {
        fn with(info: PackageVersionInfo) -> Self {
            Self {
                entries: Some(HashMap::from([(info.package_name.clone(), info)])),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                entries: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetadataClient for FixedClient {
        async fn fetch_version_info(
            &self,
            _package_names: &BTreeSet<String>,
            _check_integrity: bool,
        ) -> Result<HashMap<String, PackageVersionInfo>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entries.clone().ok_or(SynpakError::MetadataUnavailable {
                package: "Main".into(),
                fault: MetadataFault::RemoteUnreachable,
                detail: "offline".into(),
            })
        }

        async fn download(
            &self,
            _info: &PackageVersionInfo,
            _decryption_key: Option<&str>,
            _on_progress: &mut ProgressCallback<'_>,
        ) -> Result<()> {
            Ok(())
        }

        async fn initialize(&self, _package_name: &str, _key: Option<&str>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn resolve_zeroes_delta_for_equal_versions() {
        let mut raw = PackageVersionInfo::new("Main", 5, 5, 4, 900);
        raw.need_update = true;
        let client = FixedClient::with(raw);
        let resolver = VersionResolver::new(&client, Logger::silent());

        let info = resolver.resolve("Main", true).await.unwrap();
        assert!(!info.need_update);
        assert_eq!(info.need_update_size_bytes, 0);
        assert_eq!(info.need_download_count, 0);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_entry_is_version_unknown() {
        let client = FixedClient::with(PackageVersionInfo::new("Other", 1, 2, 1, 10));
        let resolver = VersionResolver::new(&client, Logger::silent());

        let err = resolver.resolve("Main", false).await.unwrap_err();
        assert!(matches!(err, SynpakError::VersionUnknown { .. }));
        let err = resolver.remote_version("Main", None).await.unwrap_err();
        assert!(matches!(err, SynpakError::VersionUnknown { .. }));
    }

    #[tokio::test]
    async fn failed_fetch_is_metadata_unavailable() {
        let client = FixedClient::failing();
        let resolver = VersionResolver::new(&client, Logger::silent());

        let err = resolver.local_version("Main", None).await.unwrap_err();
        assert!(matches!(err, SynpakError::MetadataUnavailable { .. }));
    }

    #[tokio::test]
    async fn accessors_reuse_resolved_metadata() {
        let client = FixedClient::with(PackageVersionInfo::new("Main", 3, 8, 2, 2048));
        let resolver = VersionResolver::new(&client, Logger::silent());
        let resolved = resolver
            .fetch(&BTreeSet::from(["Main".to_string()]), false)
            .await
            .unwrap();

        assert_eq!(resolver.local_version("Main", Some(&resolved)).await.unwrap(), 3);
        assert_eq!(resolver.remote_version("Main", Some(&resolved)).await.unwrap(), 8);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }
}
