//! Recording doubles for the update session collaborators.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use synpak_core::metadata::ProgressCallback;
use synpak_core::scene::SceneProgress;
use synpak_core::{
    Choice, Confirmation, DownloadProgressSample, ExecutionMode, HostControl, Logger,
    MetadataClient, MetadataFault, NotificationSink, PackageVersionInfo, Prompt, Result,
    SceneLoader, SynpakError, Updater,
};

/// Ordered record of collaborator calls shared by every double.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.events().iter().position(|e| e.starts_with(prefix))
    }

    pub fn positions(&self, prefix: &str) -> Vec<usize> {
        self.events()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }
}

pub enum FetchScript {
    Versions(u32, u32),
    Unreachable,
    Empty,
}

pub struct MockClient {
    pub log: EventLog,
    pub fetch: FetchScript,
    pub bundles: u32,
    pub bytes: u64,
    pub fail_download: bool,
    pub fail_initialize: bool,
    pub fetch_delays: Mutex<VecDeque<u64>>,
}

impl MockClient {
    pub fn new(log: EventLog, fetch: FetchScript) -> Self {
        Self {
            log,
            fetch,
            bundles: 3,
            bytes: 3 * 1024 * 1024,
            fail_download: false,
            fail_initialize: false,
            fetch_delays: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl MetadataClient for MockClient {
    async fn fetch_version_info(
        &self,
        package_names: &BTreeSet<String>,
        check_integrity: bool,
    ) -> Result<HashMap<String, PackageVersionInfo>> {
        self.log.push(format!("fetch:{check_integrity}"));
        let delay = self.fetch_delays.lock().unwrap().pop_front();
        if let Some(millis) = delay {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        match self.fetch {
            FetchScript::Versions(local, remote) => Ok(package_names
                .iter()
                .map(|name| {
                    let mut info =
                        PackageVersionInfo::new(name.clone(), local, remote, self.bundles, self.bytes);
                    if local == remote {
                        info.need_download_count = 0;
                        info.need_update_size_bytes = 0;
                    }
                    (name.clone(), info)
                })
                .collect()),
            FetchScript::Unreachable => Err(SynpakError::MetadataUnavailable {
                package: "Main".into(),
                fault: MetadataFault::RemoteUnreachable,
                detail: "connection refused".into(),
            }),
            FetchScript::Empty => Ok(HashMap::new()),
        }
    }

    async fn download(
        &self,
        info: &PackageVersionInfo,
        decryption_key: Option<&str>,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<()> {
        self.log.push(format!("download:{}", decryption_key.unwrap_or("-")));
        let total = info.need_update_size_bytes;
        let start = chrono::Utc::now().timestamp_millis();
        for (step, share) in [0u64, 1, 2, 4].into_iter().enumerate() {
            on_progress(DownloadProgressSample::from_bytes(
                total * share / 4,
                total,
                start + step as i64 + 1,
            ));
        }
        if self.fail_download {
            return Err(SynpakError::Network("connection reset".into()));
        }
        Ok(())
    }

    async fn initialize(&self, package_name: &str, _key: Option<&str>) -> Result<()> {
        self.log.push(format!("initialize:{package_name}"));
        if self.fail_initialize {
            Err(SynpakError::Filesystem("manifest missing".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy)]
pub enum Answer {
    Proceed,
    Abort,
    Hang,
}

/// Counts `confirm` futures that are currently alive.
#[derive(Clone, Default)]
pub struct LivePrompts {
    live: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl LivePrompts {
    fn enter(&self) -> LiveGuard {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        LiveGuard(self.live.clone())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockConfirmation {
    log: EventLog,
    answers: Mutex<VecDeque<Answer>>,
    live: LivePrompts,
}

impl MockConfirmation {
    pub fn new(
        log: EventLog,
        answers: impl IntoIterator<Item = Answer>,
        live: LivePrompts,
    ) -> Self {
        Self {
            log,
            answers: Mutex::new(answers.into_iter().collect()),
            live,
        }
    }
}

#[async_trait]
impl Confirmation for MockConfirmation {
    async fn confirm(&self, prompt: &Prompt) -> Choice {
        let _guard = self.live.enter();
        self.log.push(format!("show:{}", prompt.title));
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Answer::Proceed);
        match answer {
            Answer::Proceed => Choice::Proceed,
            Answer::Abort => Choice::Abort,
            Answer::Hang => std::future::pending::<Choice>().await,
        }
    }

    fn dismiss(&self) {
        self.log.push("dismiss");
    }
}

pub struct MockHost {
    log: EventLog,
}

impl HostControl for MockHost {
    fn quit(&self, cause: &SynpakError) {
        self.log.push(format!("quit:{}", cause.exit_status()));
    }
}

pub struct MockScenes {
    log: EventLog,
    pub fail: bool,
}

#[async_trait]
impl SceneLoader for MockScenes {
    async fn load_scene(
        &self,
        scene: &str,
        _package_name: &str,
        on_progress: &mut SceneProgress<'_>,
    ) -> Result<()> {
        self.log.push(format!("scene:{scene}"));
        for fraction in [0.0, 0.3, 0.2, 0.8] {
            on_progress(fraction);
        }
        if self.fail {
            Err(SynpakError::Filesystem("scene asset missing".into()))
        } else {
            Ok(())
        }
    }
}

/// Sink recording every notification in order.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
    pub progress: Mutex<Vec<f32>>,
    pub versions: Mutex<Vec<String>>,
    pub scene_progress: Mutex<Vec<f32>>,
    pub scene_finished: Mutex<usize>,
    pub failures: Mutex<usize>,
}

impl NotificationSink for RecordingSink {
    fn on_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn on_progress(&self, fraction: f32) {
        self.progress.lock().unwrap().push(fraction);
    }

    fn on_version(&self, text: &str) {
        self.versions.lock().unwrap().push(text.to_string());
    }

    fn on_load_scene_progress(&self, fraction: f32) {
        self.scene_progress.lock().unwrap().push(fraction);
    }

    fn on_load_scene_finish(&self) {
        *self.scene_finished.lock().unwrap() += 1;
    }

    fn on_update_failed(&self) {
        *self.failures.lock().unwrap() += 1;
    }
}

pub fn non_decreasing(values: &[f32]) -> bool {
    values.windows(2).all(|pair| pair[0] <= pair[1])
}

pub struct Harness {
    pub log: EventLog,
    pub prompts: LivePrompts,
    pub updater: Updater,
}

pub struct HarnessBuilder {
    log: EventLog,
    client: MockClient,
    answers: Vec<Answer>,
    mode: ExecutionMode,
    scene_fails: bool,
}

impl HarnessBuilder {
    pub fn new(fetch: FetchScript) -> Self {
        let log = EventLog::default();
        Self {
            client: MockClient::new(log.clone(), fetch),
            log,
            answers: Vec::new(),
            mode: ExecutionMode::Production,
            scene_fails: false,
        }
    }

    pub fn answers(mut self, answers: impl IntoIterator<Item = Answer>) -> Self {
        self.answers = answers.into_iter().collect();
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Delay successive metadata fetches by these many milliseconds.
    pub fn fetch_delays(self, delays: impl IntoIterator<Item = u64>) -> Self {
        *self.client.fetch_delays.lock().unwrap() = delays.into_iter().collect();
        self
    }

    pub fn failing_download(mut self) -> Self {
        self.client.fail_download = true;
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.client.fail_initialize = true;
        self
    }

    pub fn failing_scene(mut self) -> Self {
        self.scene_fails = true;
        self
    }

    pub fn build(self) -> Harness {
        let prompts = LivePrompts::default();
        let updater = Updater::new(
            Arc::new(self.client),
            Arc::new(MockConfirmation::new(
                self.log.clone(),
                self.answers,
                prompts.clone(),
            )),
            Arc::new(MockScenes {
                log: self.log.clone(),
                fail: self.scene_fails,
            }),
            Arc::new(MockHost {
                log: self.log.clone(),
            }),
            Logger::silent(),
            self.mode,
            "1.2.3",
        );
        Harness {
            log: self.log,
            prompts,
            updater,
        }
    }
}
