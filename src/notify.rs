/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::notify
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Notification sink through which update sessions report
    messages, progress, versions, and scene-load events.

  Security / Safety Notes:
    Sinks receive display text only; keys never pass through.

  Dependencies:
    None beyond std.

  Operational Scope:
    Implemented by UI layers (the CLI terminal sink) or built
    from individual optional callbacks via CallbackSink.

  Revision History:
    2026-10-12 COD  Introduced sink trait and callback adapter.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Absent handlers are no-ops, never errors
============================================================*/

/// Receiver of session output. Every method defaults to a no-op.
pub trait NotificationSink: Send + Sync {
    fn on_message(&self, _text: &str) {}

    /// Download progress, 0–1.
    fn on_progress(&self, _fraction: f32) {}

    fn on_version(&self, _text: &str) {}

    /// Scene-load progress, 0–1.
    fn on_load_scene_progress(&self, _fraction: f32) {}

    fn on_load_scene_finish(&self) {}

    fn on_update_failed(&self) {}
}

type TextHandler = Box<dyn Fn(&str) + Send + Sync>;
type FractionHandler = Box<dyn Fn(f32) + Send + Sync>;
type SignalHandler = Box<dyn Fn() + Send + Sync>;

/// Sink assembled from up to six optional callbacks.
#[derive(Default)]
pub struct CallbackSink {
    on_message: Option<TextHandler>,
    on_progress: Option<FractionHandler>,
    on_version: Option<TextHandler>,
    on_load_scene_progress: Option<FractionHandler>,
    on_load_scene_finish: Option<SignalHandler>,
    on_update_failed: Option<SignalHandler>,
}

impl CallbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Box::new(handler));
        self
    }

    pub fn with_progress(mut self, handler: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(handler));
        self
    }

    pub fn with_version(mut self, handler: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_version = Some(Box::new(handler));
        self
    }

    pub fn with_load_scene_progress(
        mut self,
        handler: impl Fn(f32) + Send + Sync + 'static,
    ) -> Self {
        self.on_load_scene_progress = Some(Box::new(handler));
        self
    }

    pub fn with_load_scene_finish(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_load_scene_finish = Some(Box::new(handler));
        self
    }

    pub fn with_update_failed(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_update_failed = Some(Box::new(handler));
        self
    }
}

impl NotificationSink for CallbackSink {
    fn on_message(&self, text: &str) {
        if let Some(handler) = &self.on_message {
            handler(text);
        }
    }

    fn on_progress(&self, fraction: f32) {
        if let Some(handler) = &self.on_progress {
            handler(fraction);
        }
    }

    fn on_version(&self, text: &str) {
        if let Some(handler) = &self.on_version {
            handler(text);
        }
    }

    fn on_load_scene_progress(&self, fraction: f32) {
        if let Some(handler) = &self.on_load_scene_progress {
            handler(fraction);
        }
    }

    fn on_load_scene_finish(&self) {
        if let Some(handler) = &self.on_load_scene_finish {
            handler();
        }
    }

    fn on_update_failed(&self) {
        if let Some(handler) = &self.on_update_failed {
            handler();
        }
    }
}
