/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::confirm
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Binary operator prompts (proceed / abort) and the gate that
    keeps at most one prompt live at a time.

  Security / Safety Notes:
    Prompt text carries sizes and counts only.

  Dependencies:
    async-trait for the collaborator, tokio oneshot channels for
    prompt disposal.

  Operational Scope:
    Used by the update session for download confirmation and
    resolution-failure notices.

  Revision History:
    2026-10-12 COD  Added prompt gate with supersession.
    2026-10-19 COD  New prompts wait for the disposed one to drop.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Exactly two discrete outcomes per prompt
    - Deterministic disposal before a new prompt is shown
============================================================*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::oneshot;

/// Text and button labels for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
    pub proceed_label: String,
    pub abort_label: String,
}

impl Prompt {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        proceed_label: impl Into<String>,
        abort_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            proceed_label: proceed_label.into(),
            abort_label: abort_label.into(),
        }
    }
}

/// The operator's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Proceed,
    Abort,
}

/// Presents prompts to the operator.
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Show `prompt` and wait, without time limit, for a choice.
    async fn confirm(&self, prompt: &Prompt) -> Choice;

    /// Remove whatever prompt is currently on screen.
    fn dismiss(&self) {}
}

struct LivePrompt {
    ticket: u64,
    dispose: oneshot::Sender<()>,
    released: oneshot::Receiver<()>,
}

/// Registry of the single live prompt.
///
/// Opening a prompt disposes the previous one; its holder observes the
/// disposal through [`PromptTicket::disposed`]. The new holder must await
/// the returned [`PromptRelease`] before showing anything, which only
/// resolves once the previous ticket, and with it the previous `confirm`
/// future, has been dropped.
#[derive(Default)]
pub struct PromptGate {
    live: Mutex<Option<LivePrompt>>,
    next_ticket: AtomicU64,
}

/// Handle for a prompt registered with the gate.
pub struct PromptTicket {
    ticket: u64,
    pub disposed: oneshot::Receiver<()>,
    _release: oneshot::Sender<()>,
}

impl PromptTicket {
    pub fn id(&self) -> u64 {
        self.ticket
    }
}

/// Resolves when a disposed prompt's ticket has been dropped.
pub struct PromptRelease {
    released: oneshot::Receiver<()>,
}

impl PromptRelease {
    pub async fn released(self) {
        // The sender is never used; only its drop matters.
        let _ = self.released.await;
    }
}

impl PromptGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<LivePrompt>> {
        match self.live.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn signal(previous: Option<LivePrompt>) -> Option<PromptRelease> {
        previous.map(|live| {
            let _ = live.dispose.send(());
            PromptRelease {
                released: live.released,
            }
        })
    }

    /// Dispose the live prompt, if any, returning its release handle.
    pub fn dispose_live(&self) -> Option<PromptRelease> {
        let previous = self.slot().take();
        Self::signal(previous)
    }

    /// Register a new live prompt, disposing any earlier one.
    pub fn open(&self) -> (PromptTicket, Option<PromptRelease>) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let (dispose, disposed) = oneshot::channel();
        let (release, released) = oneshot::channel();
        let previous = self.slot().replace(LivePrompt {
            ticket,
            dispose,
            released,
        });
        (
            PromptTicket {
                ticket,
                disposed,
                _release: release,
            },
            Self::signal(previous),
        )
    }

    /// Release `ticket` if it is still the live prompt.
    pub fn close(&self, ticket: &PromptTicket) {
        let mut guard = self.slot();
        if guard.as_ref().map(|live| live.ticket) == Some(ticket.ticket) {
            guard.take();
        }
    }

    pub fn has_live(&self) -> bool {
        self.slot().is_some()
    }
}
