/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::scene
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Scene-load collaborator invoked after a package has been
    initialized, plus a file-backed loader for the CLI.

  Security / Safety Notes:
    Scene paths are resolved beneath the package directory and
    rejected if they try to climb out of it.

  Dependencies:
    async-trait, tokio::fs for streamed reads, sha2 for the
    staged scene digest.

  Operational Scope:
    Final step of an update session when a next scene is set.

  Revision History:
    2026-10-12 COD  Added SceneLoader and FileSceneLoader.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Monotone progress reporting
    - Explicit failure for missing scene assets
============================================================*/

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::cache::package_dir;
use crate::error::{Result, SynpakError};
use crate::logger::Logger;

/// Scene-load progress callback (0–1).
pub type SceneProgress<'a> = dyn FnMut(f32) + Send + 'a;

/// Loads the scene that follows a successful update.
#[async_trait]
pub trait SceneLoader: Send + Sync {
    async fn load_scene(
        &self,
        scene: &str,
        package_name: &str,
        on_progress: &mut SceneProgress<'_>,
    ) -> Result<()>;
}

/// Streams a scene asset from the package cache into memory.
pub struct FileSceneLoader {
    cache_root: PathBuf,
    logger: Logger,
}

const READ_CHUNK: usize = 64 * 1024;

impl FileSceneLoader {
    pub fn new(cache_root: PathBuf, logger: Logger) -> Self {
        Self { cache_root, logger }
    }

    fn scene_path(&self, scene: &str, package_name: &str) -> Result<PathBuf> {
        let relative = Path::new(scene);
        let escapes = relative
            .components()
            .any(|part| !matches!(part, Component::Normal(_) | Component::CurDir));
        if scene.trim().is_empty() || escapes {
            return Err(SynpakError::SceneLoadFailed {
                scene: scene.to_string(),
                detail: "scene path must stay within the package".into(),
            });
        }
        Ok(package_dir(&self.cache_root, package_name)?.join(relative))
    }
}

#[async_trait]
impl SceneLoader for FileSceneLoader {
    async fn load_scene(
        &self,
        scene: &str,
        package_name: &str,
        on_progress: &mut SceneProgress<'_>,
    ) -> Result<()> {
        let path = self.scene_path(scene, package_name)?;
        let failed = |detail: String| SynpakError::SceneLoadFailed {
            scene: scene.to_string(),
            detail,
        };

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|err| failed(format!("{}: {err}", path.display())))?;
        let total = file
            .metadata()
            .await
            .map_err(|err| failed(err.to_string()))?
            .len();

        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; READ_CHUNK];
        let mut read_total = 0u64;
        on_progress(0.0);
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|err| failed(err.to_string()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            read_total += read as u64;
            if total > 0 {
                on_progress((read_total as f64 / total as f64).min(1.0) as f32);
            }
        }
        on_progress(1.0);

        self.logger.info(
            "SCENE",
            format!(
                "Staged {} ({} bytes, sha256 {:x})",
                scene,
                read_total,
                hasher.finalize()
            ),
        );
        Ok(())
    }
}
