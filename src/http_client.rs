/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::http_client
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    HTTP-backed MetadataClient: reads the installed manifest,
    fetches the published manifest, plans the bundle delta,
    streams bundles to disk, and promotes them on initialize.

  Security / Safety Notes:
    Performs plain GET requests against the configured content
    server. Every bundle is verified by SHA-256 before it
    replaces installed content. Keys are never transmitted.

  Dependencies:
    reqwest for HTTP, serde for manifests, sha2 for digests,
    tokio for async file I/O and backoff sleeps.

  Operational Scope:
    Default transport for the Syn-Pak CLI.

  Revision History:
    2026-10-12 COD  Implemented manifest-driven HTTP transport.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Retry logic with exponential backoff for metadata
    - Structured manifest parsing with explicit error paths
    - Atomic replace of verified bundles
============================================================*/

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use urlencoding::encode;

use crate::cache::{package_dir, MANIFEST_FILE, PENDING_MANIFEST_FILE};
use crate::config::SynpakConfig;
use crate::error::{MetadataFault, Result, SynpakError};
use crate::logger::Logger;
use crate::metadata::{MetadataClient, ProgressCallback};
use crate::package_info::{DownloadProgressSample, PackageVersionInfo};

/// Manifest describing one published (or installed) package version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub version: u32,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub bundles: Vec<BundleEntry>,
}

/// One downloadable bundle of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub name: String,
    pub size: u64,
    /// Lowercase hex SHA-256 of the bundle bytes.
    pub digest: String,
}

/// Delta between the installed and published manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub remote: PackageManifest,
    pub pending: Vec<BundleEntry>,
    pub integrity_failures: usize,
}

impl UpdatePlan {
    pub fn total_bytes(&self) -> u64 {
        self.pending.iter().map(|bundle| bundle.size).sum()
    }
}

/// Work out which remote bundles must be fetched.
///
/// A bundle is pending when it is missing locally, its recorded digest
/// differs, or its name is listed in `corrupt`.
pub fn plan_update(
    local: &PackageManifest,
    remote: PackageManifest,
    corrupt: &BTreeSet<String>,
) -> UpdatePlan {
    let installed: HashMap<&str, &str> = local
        .bundles
        .iter()
        .map(|bundle| (bundle.name.as_str(), bundle.digest.as_str()))
        .collect();

    let pending = remote
        .bundles
        .iter()
        .filter(|bundle| {
            corrupt.contains(&bundle.name)
                || installed.get(bundle.name.as_str()) != Some(&bundle.digest.as_str())
        })
        .cloned()
        .collect();

    UpdatePlan {
        remote,
        pending,
        integrity_failures: corrupt.len(),
    }
}

/// Transport talking to a static content server.
pub struct HttpMetadataClient {
    client: reqwest::Client,
    base_url: String,
    cache_root: PathBuf,
    max_retries: usize,
    offline: bool,
    plans: Mutex<HashMap<String, UpdatePlan>>,
    logger: Logger,
}

impl HttpMetadataClient {
    /// Construct a new client from configuration.
    pub fn new(config: &SynpakConfig, logger: Logger) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.timeout))
            .user_agent(concat!("Syn-Pak-Core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SynpakError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.server.base_url.clone(),
            cache_root: config.cache_dir(),
            max_retries: config.server.max_retries.max(1),
            offline: !config.mode.allows_network(),
            plans: Mutex::new(HashMap::new()),
            logger,
        })
    }

    fn package_url(&self, package: &str, file: &str) -> String {
        let path = file.split('/').map(encode).collect::<Vec<_>>().join("/");
        format!("{}{}/{}", self.base_url, encode(package), path)
    }

    fn remember_plan(&self, package: &str, plan: UpdatePlan) {
        if let Ok(mut plans) = self.plans.lock() {
            plans.insert(package.to_string(), plan);
        }
    }

    fn take_plan(&self, package: &str) -> Option<UpdatePlan> {
        self.plans.lock().ok()?.remove(package)
    }

    async fn fetch_remote_manifest(&self, package: &str) -> Result<PackageManifest> {
        let url = self.package_url(package, MANIFEST_FILE);
        let unreachable = |detail: String| SynpakError::MetadataUnavailable {
            package: package.to_string(),
            fault: MetadataFault::RemoteUnreachable,
            detail,
        };

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|err| unreachable(format!("request to {url} failed: {err}")))?;

            if response.status() == StatusCode::OK {
                return response
                    .json::<PackageManifest>()
                    .await
                    .map_err(|err| unreachable(format!("invalid manifest at {url}: {err}")));
            }

            attempt += 1;
            if attempt >= self.max_retries {
                return Err(unreachable(format!(
                    "{url} answered {} after {attempt} attempts",
                    response.status()
                )));
            }
            let exponent = (attempt as u32).min(8);
            let backoff = Duration::from_millis(200_u64.saturating_mul(1_u64 << exponent));
            self.logger.debug(
                "FETCH",
                format!("{url} answered {}; retrying in {backoff:?}", response.status()),
            );
            sleep(backoff).await;
        }
    }

    async fn plan_for(&self, package: &str, check_integrity: bool) -> Result<(u32, UpdatePlan)> {
        let dir = package_dir(&self.cache_root, package)?;
        let local = read_manifest(&dir.join(MANIFEST_FILE))
            .await
            .map_err(|err| SynpakError::MetadataUnavailable {
                package: package.to_string(),
                fault: MetadataFault::LocalCorrupt,
                detail: err.to_string(),
            })?
            .unwrap_or_default();

        let corrupt = if check_integrity {
            verify_bundles(&dir, &local).await
        } else {
            BTreeSet::new()
        };

        let remote = if self.offline {
            local.clone()
        } else {
            self.fetch_remote_manifest(package).await?
        };

        // A corrupt install is reported as "nothing installed" so the version
        // comparison alone drives the update.
        let local_version = if corrupt.is_empty() { local.version } else { 0 };
        if !corrupt.is_empty() {
            self.logger.warn(
                "INTEGRITY",
                format!("{package}: {} bundles failed verification", corrupt.len()),
            );
        }
        Ok((local_version, plan_update(&local, remote, &corrupt)))
    }

    async fn download_bundle(
        &self,
        package: &str,
        dir: &Path,
        bundle: &BundleEntry,
        progress: &mut TransferProgress<'_, '_>,
    ) -> Result<()> {
        let url = self.package_url(package, &bundle.name);
        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| SynpakError::Network(format!("GET {url} failed: {err}")))?;
        if !response.status().is_success() {
            return Err(SynpakError::Network(format!(
                "GET {url} answered {}",
                response.status()
            )));
        }

        let target = bundle_path(dir, &bundle.name)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                SynpakError::Filesystem(format!("Failed to create {}: {err}", parent.display()))
            })?;
        }
        let partial = target.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await.map_err(|err| {
            SynpakError::Filesystem(format!("Failed to create {}: {err}", partial.display()))
        })?;

        let mut hasher = Sha256::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| SynpakError::Network(format!("Reading {url} failed: {err}")))?
        {
            hasher.update(&chunk);
            file.write_all(&chunk).await.map_err(|err| {
                SynpakError::Filesystem(format!("Failed to write {}: {err}", partial.display()))
            })?;
            progress.advance(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        let digest = format!("{:x}", hasher.finalize());
        if !digest.eq_ignore_ascii_case(&bundle.digest) {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(SynpakError::DownloadFailed {
                package: package.to_string(),
                detail: format!("digest mismatch for {}", bundle.name),
            });
        }
        tokio::fs::rename(&partial, &target).await.map_err(|err| {
            SynpakError::Filesystem(format!("Failed to place {}: {err}", target.display()))
        })?;
        Ok(())
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn fetch_version_info(
        &self,
        package_names: &BTreeSet<String>,
        check_integrity: bool,
    ) -> Result<HashMap<String, PackageVersionInfo>> {
        let mut versions = HashMap::new();
        for package in package_names {
            let (local_version, plan) = self.plan_for(package, check_integrity).await?;
            let info = PackageVersionInfo::new(
                package.clone(),
                local_version,
                plan.remote.version,
                plan.pending.len() as u32,
                plan.total_bytes(),
            );
            self.logger.debug(
                "FETCH",
                format!(
                    "{package}: local=v{} remote=v{} pending={}",
                    info.local_version,
                    info.remote_version,
                    plan.pending.len()
                ),
            );
            self.remember_plan(package, plan);
            versions.insert(package.clone(), info);
        }
        Ok(versions)
    }

    async fn download(
        &self,
        info: &PackageVersionInfo,
        _decryption_key: Option<&str>,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<()> {
        let package = info.package_name.as_str();
        if self.offline {
            return Err(SynpakError::Network(
                "offline mode does not download content".into(),
            ));
        }

        let plan = match self.take_plan(package) {
            Some(plan) => plan,
            None => self.plan_for(package, false).await?.1,
        };
        let dir = package_dir(&self.cache_root, package)?;
        let mut progress = TransferProgress::new(plan.total_bytes(), on_progress);

        for bundle in &plan.pending {
            self.download_bundle(package, &dir, bundle, &mut progress)
                .await?;
            self.logger
                .debug("DOWNLOAD", format!("{package}: placed {}", bundle.name));
        }
        progress.finish();

        write_manifest(&dir.join(PENDING_MANIFEST_FILE), &plan.remote).await
    }

    async fn initialize(&self, package_name: &str, decryption_key: Option<&str>) -> Result<()> {
        let dir = package_dir(&self.cache_root, package_name)?;
        let pending_path = dir.join(PENDING_MANIFEST_FILE);
        let installed_path = dir.join(MANIFEST_FILE);

        let failed = |detail: String| SynpakError::InitializationFailed {
            package: package_name.to_string(),
            detail,
        };

        let staged = read_manifest(&pending_path)
            .await
            .map_err(|err| failed(err.to_string()))?;
        let manifest = match staged {
            Some(manifest) => manifest,
            None => read_manifest(&installed_path)
                .await
                .map_err(|err| failed(err.to_string()))?
                .unwrap_or_default(),
        };

        if manifest.encrypted && decryption_key.is_none() {
            return Err(failed("package is encrypted but no key was supplied".into()));
        }
        for bundle in &manifest.bundles {
            let path = bundle_path(&dir, &bundle.name).map_err(|err| failed(err.to_string()))?;
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(failed(format!("bundle {} missing", bundle.name)));
            }
        }

        if tokio::fs::try_exists(&pending_path).await.unwrap_or(false) {
            tokio::fs::rename(&pending_path, &installed_path)
                .await
                .map_err(|err| failed(format!("promoting manifest: {err}")))?;
        }
        self.logger.info(
            "INIT",
            format!("{package_name}: v{} ready", manifest.version),
        );
        Ok(())
    }
}

/// Turns per-chunk byte counts into ordered progress samples.
struct TransferProgress<'cb, 'f> {
    total: u64,
    finished: u64,
    last_timestamp: i64,
    on_progress: &'cb mut ProgressCallback<'f>,
}

impl<'cb, 'f> TransferProgress<'cb, 'f> {
    fn new(total: u64, on_progress: &'cb mut ProgressCallback<'f>) -> Self {
        Self {
            total,
            finished: 0,
            last_timestamp: i64::MIN,
            on_progress,
        }
    }

    fn next_timestamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_timestamp = now.max(self.last_timestamp.saturating_add(1));
        self.last_timestamp
    }

    fn advance(&mut self, bytes: u64) {
        self.finished = self.finished.saturating_add(bytes).min(self.total);
        let at = self.next_timestamp();
        let sample = DownloadProgressSample::from_bytes(self.finished, self.total, at);
        // Only the closing sample may report 100%.
        let sample = DownloadProgressSample {
            percentage: sample.percentage.min(99.99),
            ..sample
        };
        (self.on_progress)(sample);
    }

    fn finish(&mut self) {
        let at = self.next_timestamp();
        let mut sample = DownloadProgressSample::from_bytes(self.total, self.total, at);
        sample.percentage = 100.0;
        (self.on_progress)(sample);
    }
}

fn bundle_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let plain = relative
        .components()
        .all(|part| matches!(part, std::path::Component::Normal(_)));
    if name.is_empty() || !plain {
        return Err(SynpakError::Serialization(format!(
            "bundle name `{name}` is not a relative path"
        )));
    }
    Ok(dir.join(relative))
}

async fn read_manifest(path: &Path) -> Result<Option<PackageManifest>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(SynpakError::Filesystem(format!(
                "Failed to read {}: {err}",
                path.display()
            )))
        }
    };
    serde_json::from_slice(&raw).map(Some).map_err(|err| {
        SynpakError::Serialization(format!("Invalid manifest {}: {err}", path.display()))
    })
}

async fn write_manifest(path: &Path, manifest: &PackageManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(manifest).map_err(|err| {
        SynpakError::Serialization(format!("Failed to encode manifest: {err}"))
    })?;
    tokio::fs::write(path, payload).await.map_err(|err| {
        SynpakError::Filesystem(format!("Failed to write {}: {err}", path.display()))
    })
}

/// Names of installed bundles whose on-disk bytes do not match the manifest.
async fn verify_bundles(dir: &Path, manifest: &PackageManifest) -> BTreeSet<String> {
    let mut corrupt = BTreeSet::new();
    for bundle in &manifest.bundles {
        let intact = match bundle_path(dir, &bundle.name) {
            Ok(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => format!("{:x}", Sha256::digest(&bytes))
                    .eq_ignore_ascii_case(&bundle.digest),
                Err(_) => false,
            },
            Err(_) => false,
        };
        if !intact {
            corrupt.insert(bundle.name.clone());
        }
    }
    corrupt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use tempfile::TempDir;

    fn bundle(name: &str, bytes: &[u8]) -> BundleEntry {
        BundleEntry {
            name: name.into(),
            size: bytes.len() as u64,
            digest: format!("{:x}", Sha256::digest(bytes)),
        }
    }

    fn offline_client(root: &Path) -> HttpMetadataClient {
        let mut config = SynpakConfig::default();
        config.mode = ExecutionMode::Offline;
        config.paths.cache_dir = Some(root.to_path_buf());
        HttpMetadataClient::new(&config, Logger::silent()).unwrap()
    }

    #[test]
    fn plan_lists_missing_and_changed_bundles() {
        let local = PackageManifest {
            version: 5,
            encrypted: false,
            bundles: vec![bundle("ui.bundle", b"old-ui"), bundle("core.bundle", b"core")],
        };
        let remote = PackageManifest {
            version: 7,
            encrypted: false,
            bundles: vec![
                bundle("ui.bundle", b"new-ui"),
                bundle("core.bundle", b"core"),
                bundle("audio.bundle", b"audio!"),
            ],
        };

        let plan = plan_update(&local, remote, &BTreeSet::new());
        let names: Vec<&str> = plan.pending.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["ui.bundle", "audio.bundle"]);
        assert_eq!(plan.total_bytes(), 12);
    }

    #[test]
    fn plan_refetches_corrupt_bundles() {
        let local = PackageManifest {
            version: 7,
            encrypted: false,
            bundles: vec![bundle("core.bundle", b"core")],
        };
        let corrupt = BTreeSet::from(["core.bundle".to_string()]);
        let plan = plan_update(&local, local.clone(), &corrupt);
        assert_eq!(plan.pending.len(), 1);
        assert_eq!(plan.integrity_failures, 1);
    }

    #[test]
    fn bundle_names_cannot_escape() {
        let dir = Path::new("/cache/Main");
        assert!(bundle_path(dir, "../x").is_err());
        assert!(bundle_path(dir, "/etc/passwd").is_err());
        assert_eq!(
            bundle_path(dir, "sub/a.bundle").unwrap(),
            dir.join("sub/a.bundle")
        );
    }

    #[tokio::test]
    async fn offline_fetch_reports_local_version_for_both_sides() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Main");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("core.bundle"), b"core").unwrap();
        let manifest = PackageManifest {
            version: 4,
            encrypted: false,
            bundles: vec![bundle("core.bundle", b"core")],
        };
        std::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec(&manifest).unwrap(),
        )
        .unwrap();

        let client = offline_client(temp.path());
        let names = BTreeSet::from(["Main".to_string()]);
        let info = client.fetch_version_info(&names, true).await.unwrap();
        let main = &info["Main"];
        assert_eq!((main.local_version, main.remote_version), (4, 4));
        assert!(!main.need_update);
    }

    #[tokio::test]
    async fn corrupt_local_manifest_is_local_corrupt() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Main");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), b"{ not json").unwrap();

        let client = offline_client(temp.path());
        let names = BTreeSet::from(["Main".to_string()]);
        let err = client.fetch_version_info(&names, false).await.unwrap_err();
        assert!(matches!(
            err,
            SynpakError::MetadataUnavailable {
                fault: MetadataFault::LocalCorrupt,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn initialize_promotes_staged_manifest() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Main");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("core.bundle"), b"core").unwrap();
        let staged = PackageManifest {
            version: 9,
            encrypted: true,
            bundles: vec![bundle("core.bundle", b"core")],
        };
        write_manifest(&dir.join(PENDING_MANIFEST_FILE), &staged)
            .await
            .unwrap();

        let client = offline_client(temp.path());
        let err = client.initialize("Main", None).await.unwrap_err();
        assert!(matches!(err, SynpakError::InitializationFailed { .. }));

        client.initialize("Main", Some("secret")).await.unwrap();
        let installed = read_manifest(&dir.join(MANIFEST_FILE)).await.unwrap();
        assert_eq!(installed, Some(staged));
        assert!(!dir.join(PENDING_MANIFEST_FILE).exists());
    }

    #[test]
    fn transfer_samples_are_ordered_and_close_at_100() {
        let mut seen = Vec::new();
        {
            let mut callback = |sample: DownloadProgressSample| seen.push(sample);
            let mut progress = TransferProgress::new(10, &mut callback);
            progress.advance(4);
            progress.advance(6);
            progress.finish();
        }
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|pair| {
            pair[0].timestamp_millis < pair[1].timestamp_millis
                && pair[0].finished_bytes <= pair[1].finished_bytes
        }));
        assert!(seen[1].percentage < 100.0);
        assert_eq!(seen[2].percentage, 100.0);
    }
}
