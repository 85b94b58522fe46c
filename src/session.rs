/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::session
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Top-level update state machine: resolve versions, confirm,
    download, initialize, and load the next scene, handling
    every failure and abort branch.

  Security / Safety Notes:
    Declining a mandatory update terminates the host through
    HostControl. Keys are forwarded to collaborators only.

  Dependencies:
    tokio::select for prompt supersession, chrono for the
    download start timestamp.

  Operational Scope:
    Entry point for embedders and the CLI `update` command.

  Revision History:
    2026-10-12 COD  Authored UpdateSession and Updater.
    2026-10-19 COD  Prompt handoff waits for disposal; pre-resolved requests.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Forward-only state transitions with absorbing terminals
    - Deterministic sequencing across suspension points
    - No automatic retries; callers decide
============================================================*/

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::config::ExecutionMode;
use crate::confirm::{Choice, Confirmation, Prompt, PromptGate, PromptRelease};
use crate::download::DownloadCoordinator;
use crate::error::{Result, SynpakError};
use crate::format::display_size;
use crate::host::HostControl;
use crate::logger::Logger;
use crate::metadata::MetadataClient;
use crate::notify::NotificationSink;
use crate::package_info::PackageVersionInfo;
use crate::resolver::VersionResolver;
use crate::scene::SceneLoader;
use crate::speed::MonotonicProgress;

/// Lifecycle of one update session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Resolving,
    NoUpdateNeeded,
    AwaitingConfirmation,
    Downloading,
    Initializing,
    LoadingScene,
    Done,
    ResolutionFailed,
    Cancelled,
    UpdateFailed,
}

impl SessionState {
    /// States with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Done
                | SessionState::ResolutionFailed
                | SessionState::Cancelled
                | SessionState::UpdateFailed
        )
    }

    /// Whether `self -> next` is an edge of the session graph.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Resolving, ResolutionFailed | NoUpdateNeeded | AwaitingConfirmation)
                | (NoUpdateNeeded, Initializing)
                | (AwaitingConfirmation, Cancelled | Downloading)
                | (Downloading, Initializing | UpdateFailed)
                | (Initializing, LoadingScene | Done | UpdateFailed)
                | (LoadingScene, Done | UpdateFailed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Parameters of a `start_update` invocation.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub package_name: String,
    pub check_integrity: bool,
    pub decryption_key: Option<String>,
    pub next_scene: Option<String>,
    /// Package info resolved earlier; skips the metadata fetch.
    pub resolved: Option<PackageVersionInfo>,
}

impl UpdateRequest {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            check_integrity: true,
            decryption_key: None,
            next_scene: None,
            resolved: None,
        }
    }

    pub fn with_integrity_check(mut self, check: bool) -> Self {
        self.check_integrity = check;
        self
    }

    /// Empty keys are treated as absent.
    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.decryption_key = key.filter(|value| !value.is_empty());
        self
    }

    /// Reuse `info` instead of fetching metadata again.
    pub fn with_resolved(mut self, info: PackageVersionInfo) -> Self {
        self.resolved = Some(info);
        self
    }

    /// Empty scene identifiers are treated as absent.
    pub fn with_next_scene(mut self, scene: Option<String>) -> Self {
        self.next_scene = scene.filter(|value| !value.is_empty());
        self
    }
}

/// State of one end-to-end update run.
#[derive(Debug, Clone)]
pub struct UpdateSession {
    request: UpdateRequest,
    state: SessionState,
    package: Option<PackageVersionInfo>,
    start_timestamp: Option<i64>,
    history: Vec<SessionState>,
}

impl UpdateSession {
    pub fn new(request: UpdateRequest) -> Self {
        Self {
            request,
            state: SessionState::Idle,
            package: None,
            start_timestamp: None,
            history: vec![SessionState::Idle],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn request(&self) -> &UpdateRequest {
        &self.request
    }

    /// Resolved package info, once resolution succeeded.
    pub fn package(&self) -> Option<&PackageVersionInfo> {
        self.package.as_ref()
    }

    /// Millisecond timestamp at which the download began.
    pub fn start_timestamp(&self) -> Option<i64> {
        self.start_timestamp
    }

    pub fn pending_next_scene(&self) -> Option<&str> {
        self.request.next_scene.as_deref()
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Move to `next`, refusing edges outside the session graph.
    pub fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SynpakError::Runtime(format!(
                "Illegal session transition {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

/// Summary handed back for a session that reached `Done`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub state: SessionState,
    pub package: PackageVersionInfo,
    pub downloaded: bool,
    pub scene_loaded: bool,
}

/// Collaborators and settings shared by every session.
pub struct Updater {
    client: Arc<dyn MetadataClient>,
    confirmation: Arc<dyn Confirmation>,
    scenes: Arc<dyn SceneLoader>,
    host: Arc<dyn HostControl>,
    prompts: PromptGate,
    logger: Logger,
    mode: ExecutionMode,
    app_version: String,
}

impl Updater {
    pub fn new(
        client: Arc<dyn MetadataClient>,
        confirmation: Arc<dyn Confirmation>,
        scenes: Arc<dyn SceneLoader>,
        host: Arc<dyn HostControl>,
        logger: Logger,
        mode: ExecutionMode,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            confirmation,
            scenes,
            host,
            prompts: PromptGate::new(),
            logger,
            mode,
            app_version: app_version.into(),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Whether a prompt from some session is currently live.
    pub fn has_live_prompt(&self) -> bool {
        self.prompts.has_live()
    }

    /// Dispose any live prompt and remove it from the operator's screen.
    pub async fn dispose_prompt(&self) {
        let previous = self.prompts.dispose_live();
        self.retire(previous).await;
    }

    async fn retire(&self, previous: Option<PromptRelease>) {
        if let Some(previous) = previous {
            previous.released().await;
            self.confirmation.dismiss();
        }
    }

    /// Run a fresh session for `request` to completion.
    pub async fn start_update(
        &self,
        request: UpdateRequest,
        sink: &dyn NotificationSink,
    ) -> Result<SessionReport> {
        let mut session = UpdateSession::new(request);
        self.run_session(&mut session, sink).await
    }

    /// Drive `session` from `Idle` to a terminal state.
    pub async fn run_session(
        &self,
        session: &mut UpdateSession,
        sink: &dyn NotificationSink,
    ) -> Result<SessionReport> {
        let package = session.request.package_name.clone();
        let logger = self.logger.for_package(&package);

        self.dispose_prompt().await;
        self.transition(session, SessionState::Resolving, &logger)?;

        let resolver = VersionResolver::new(self.client.as_ref(), logger.clone());
        let resolved = match session.request.resolved.clone() {
            Some(info) if info.package_name == package => {
                logger.info("RESOLVE", "Using pre-resolved package info");
                Ok(info.reconciled())
            }
            Some(_) => Err(SynpakError::VersionUnknown {
                package: package.clone(),
            }),
            None => {
                resolver
                    .resolve(&package, session.request.check_integrity)
                    .await
            }
        };
        let info = match resolved {
            Ok(info) => info,
            Err(err) => return self.fail_resolution(session, sink, &logger, err).await,
        };
        session.package = Some(info.clone());
        sink.on_version(&format!(
            "Resource version: v{}res{}",
            self.app_version, info.remote_version
        ));

        let downloaded = if info.need_update && self.mode.enforces_updates() {
            self.confirm_and_download(session, &info, sink, &logger)
                .await?;
            true
        } else {
            if info.need_update {
                logger.warn(
                    "BYPASS",
                    format!(
                        "v{} -> v{} available but {} mode does not enforce updates",
                        info.local_version, info.remote_version, self.mode
                    ),
                );
            }
            self.transition(session, SessionState::NoUpdateNeeded, &logger)?;
            false
        };

        sink.on_progress(1.0);
        sink.on_message("Download complete");
        self.transition(session, SessionState::Initializing, &logger)?;

        let key = session.request.decryption_key.clone();
        if let Err(err) = self.client.initialize(&package, key.as_deref()).await {
            let err = match err {
                failed @ SynpakError::InitializationFailed { .. } => failed,
                other => SynpakError::InitializationFailed {
                    package: package.clone(),
                    detail: other.to_string(),
                },
            };
            return Err(self.fail_update(session, sink, &logger, err));
        }
        logger.info("INIT", "Package initialized");

        let scene_loaded = match session.request.next_scene.clone() {
            None => false,
            Some(scene) => {
                self.transition(session, SessionState::LoadingScene, &logger)?;
                sink.on_message("Loading scene");
                if let Err(err) = self.load_scene(&scene, &package, sink).await {
                    return Err(self.fail_update(session, sink, &logger, err));
                }
                sink.on_load_scene_finish();
                true
            }
        };

        self.transition(session, SessionState::Done, &logger)?;
        Ok(SessionReport {
            state: session.state,
            package: info,
            downloaded,
            scene_loaded,
        })
    }

    async fn confirm_and_download(
        &self,
        session: &mut UpdateSession,
        info: &PackageVersionInfo,
        sink: &dyn NotificationSink,
        logger: &Logger,
    ) -> Result<()> {
        let package = info.package_name.clone();
        self.transition(session, SessionState::AwaitingConfirmation, logger)?;

        let size = display_size(info.need_update_size_bytes);
        sink.on_message(&format!("Update required, size: {size}"));
        let prompt = Prompt::new(
            "Notice",
            format!(
                "Found {} updated bundles, {} to download in total",
                info.need_download_count, size
            ),
            "Download",
            "Quit",
        );

        match self.ask(&prompt).await {
            Some(Choice::Proceed) => logger.info("CONFIRM", "Operator accepted download"),
            Some(Choice::Abort) => {
                self.transition(session, SessionState::Cancelled, logger)?;
                logger.warn("CONFIRM", "Operator declined mandatory update; quitting");
                let declined = SynpakError::UserDeclined { package };
                self.host.quit(&declined);
                return Err(declined);
            }
            None => {
                self.transition(session, SessionState::Cancelled, logger)?;
                logger.warn("CONFIRM", "Prompt superseded by a newer session");
                return Err(SynpakError::Superseded { package });
            }
        }

        self.transition(session, SessionState::Downloading, logger)?;
        let started = Utc::now().timestamp_millis();
        session.start_timestamp = Some(started);

        let coordinator = DownloadCoordinator::new(self.client.as_ref(), logger.clone());
        let key = session.request.decryption_key.clone();
        if let Err(err) = coordinator.run(info, key.as_deref(), started, sink).await {
            return Err(self.fail_update(session, sink, logger, err));
        }
        Ok(())
    }

    async fn load_scene(
        &self,
        scene: &str,
        package: &str,
        sink: &dyn NotificationSink,
    ) -> Result<()> {
        let mut progress = MonotonicProgress::new();
        let mut on_progress = |fraction: f32| {
            sink.on_load_scene_progress(progress.advance_fraction(fraction));
        };
        self.scenes
            .load_scene(scene, package, &mut on_progress)
            .await
            .map_err(|err| match err {
                failed @ SynpakError::SceneLoadFailed { .. } => failed,
                other => SynpakError::SceneLoadFailed {
                    scene: scene.to_string(),
                    detail: other.to_string(),
                },
            })?;
        if progress.complete() {
            sink.on_load_scene_progress(1.0);
        }
        Ok(())
    }

    /// Show `prompt` through the gate. `None` means it was superseded.
    ///
    /// Any earlier prompt is disposed, dropped and dismissed before this
    /// one is shown.
    async fn ask(&self, prompt: &Prompt) -> Option<Choice> {
        let (mut ticket, previous) = self.prompts.open();
        self.retire(previous).await;
        let choice = tokio::select! {
            biased;
            _ = &mut ticket.disposed => None,
            choice = self.confirmation.confirm(prompt) => Some(choice),
        };
        self.prompts.close(&ticket);
        choice
    }

    async fn fail_resolution(
        &self,
        session: &mut UpdateSession,
        sink: &dyn NotificationSink,
        logger: &Logger,
        err: SynpakError,
    ) -> Result<SessionReport> {
        self.transition(session, SessionState::ResolutionFailed, logger)?;
        logger.error("RESOLVE", err.to_string());

        let prompt = Prompt::new("Error", "Unable to reach the update server", "Back", "Quit");
        match self.ask(&prompt).await {
            Some(Choice::Proceed) => sink.on_update_failed(),
            Some(Choice::Abort) => {
                logger.warn("RESOLVE", "Operator chose to quit after resolution failure");
                self.host.quit(&err);
            }
            None => logger.warn("RESOLVE", "Failure notice superseded by a newer session"),
        }
        Err(err)
    }

    /// Record a fatal post-resolution failure and hand the error back.
    fn fail_update(
        &self,
        session: &mut UpdateSession,
        sink: &dyn NotificationSink,
        logger: &Logger,
        err: SynpakError,
    ) -> SynpakError {
        if let Err(illegal) = self.transition(session, SessionState::UpdateFailed, logger) {
            return illegal;
        }
        logger.error("UPDATE", err.to_string());
        sink.on_update_failed();
        err
    }

    fn transition(
        &self,
        session: &mut UpdateSession,
        next: SessionState,
        logger: &Logger,
    ) -> Result<()> {
        let previous = session.state;
        session.advance(next)?;
        logger.debug("STATE", format!("{previous} -> {next}"));
        Ok(())
    }
}
