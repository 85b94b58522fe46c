/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::terminal
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Terminal implementations of the notification sink and the
    confirmation prompt for the Syn-Pak CLI.

  Security / Safety Notes:
    Reads a single line from stdin per prompt; nothing else.

  Dependencies:
    indicatif for progress bars, tokio for async stdin.

  Operational Scope:
    Binary-only adapters wired up by `synpak_core update`.

  Revision History:
    2026-10-12 COD  Added terminal sink and stdin prompt.
    2026-10-19 COD  Withdrawn prompts are announced.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Operator sees every status line
    - Non-interactive runs are explicit (--yes)
============================================================*/

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use synpak_core::{Choice, Confirmation, Logger, NotificationSink, Prompt};

const BAR_SCALE: u64 = 1000;

/// Renders session output as indicatif bars plus log entries.
pub struct TerminalSink {
    download: ProgressBar,
    scene: ProgressBar,
    failed: AtomicBool,
    logger: Logger,
}

impl TerminalSink {
    pub fn new(logger: Logger) -> Self {
        let style = ProgressStyle::with_template("{prefix:>10} [{bar:40}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let download = ProgressBar::new(BAR_SCALE)
            .with_style(style.clone())
            .with_prefix("download");
        let scene = ProgressBar::new(BAR_SCALE)
            .with_style(style)
            .with_prefix("scene");
        download.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        scene.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        Self {
            download,
            scene,
            failed: AtomicBool::new(false),
            logger,
        }
    }

    /// Whether the session signalled `on_update_failed`.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn show(bar: &ProgressBar) {
        if bar.is_hidden() {
            bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
    }

    fn position(fraction: f32) -> u64 {
        (f64::from(fraction.clamp(0.0, 1.0)) * BAR_SCALE as f64).round() as u64
    }
}

impl NotificationSink for TerminalSink {
    fn on_message(&self, text: &str) {
        self.logger.info("STATUS", text);
        if self.download.is_hidden() {
            eprintln!("→ {text}");
        } else {
            self.download.set_message(text.to_string());
        }
    }

    fn on_progress(&self, fraction: f32) {
        Self::show(&self.download);
        self.download.set_position(Self::position(fraction));
        if fraction >= 1.0 {
            self.download.finish();
        }
    }

    fn on_version(&self, text: &str) {
        self.logger.info("VERSION", text);
        eprintln!("→ {text}");
    }

    fn on_load_scene_progress(&self, fraction: f32) {
        Self::show(&self.scene);
        self.scene.set_position(Self::position(fraction));
    }

    fn on_load_scene_finish(&self) {
        self.scene.finish_with_message("scene ready");
        self.logger.info("SCENE", "Scene load finished");
    }

    fn on_update_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
        self.download.abandon_with_message("update failed");
        self.logger.error("UPDATE", "Update failed");
    }
}

/// Asks on stderr and reads the answer from stdin.
pub struct TerminalConfirmation {
    assume_yes: bool,
}

impl TerminalConfirmation {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl Confirmation for TerminalConfirmation {
    async fn confirm(&self, prompt: &Prompt) -> Choice {
        eprintln!("[{}] {}", prompt.title, prompt.message);
        if self.assume_yes {
            eprintln!("→ {} (--yes)", prompt.proceed_label);
            return Choice::Proceed;
        }

        let mut reader = BufReader::new(tokio::io::stdin());
        loop {
            eprint!("[y] {} / [n] {}: ", prompt.proceed_label, prompt.abort_label);
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => return Choice::Abort,
                Ok(_) => match line.trim().to_ascii_lowercase().as_str() {
                    "y" | "yes" => return Choice::Proceed,
                    "n" | "no" => return Choice::Abort,
                    _ => continue,
                },
            }
        }
    }

    /// The pending stdin read is cancelled when its future is dropped;
    /// this only tells the operator why the question went away.
    fn dismiss(&self) {
        eprintln!();
        eprintln!("→ Prompt withdrawn: a newer update session took over.");
    }
}
