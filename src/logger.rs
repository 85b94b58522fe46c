/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Provide structured, append-only logging for update sessions,
    with optional per-package scoping of entries.

  Security / Safety Notes:
    Callers never pass decryption keys into log messages; the
    logger itself performs no redaction.

  Dependencies:
    std::fs::File, std::sync::Mutex, sha2 for integrity hashing.

  Operational Scope:
    Shared by the session state machine, transports, and the
    CLI to emit RFC-3339 UTC stamped entries and a session hash.

  Revision History:
    2026-10-12 COD  Added package scopes and silent loggers.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Graceful error propagation on I/O failures
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{Result, SynpakError};

/// Structured log level for Syn-Pak-Core events.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn always_echoed(self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }
}

/// Where echoed entries go besides the optional file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Echo {
    Stderr,
    Off,
}

/// Shared logger that emits append-only entries in Synavera format.
///
/// Cloning is cheap; clones write to the same file. [`Logger::for_package`]
/// returns a clone that tags every entry with the package name.
#[derive(Clone)]
pub struct Logger {
    file: Option<Arc<Mutex<BufWriter<File>>>>,
    path: Option<PathBuf>,
    verbose: bool,
    echo: Echo,
    scope: Option<String>,
}

impl Logger {
    /// Build a logger that writes to stderr and optionally to a file.
    pub fn new(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let file = match path {
            Some(ref file_path) => Some(Arc::new(Mutex::new(open_append(file_path)?))),
            None => None,
        };

        Ok(Self {
            file,
            path,
            verbose,
            echo: Echo::Stderr,
            scope: None,
        })
    }

    /// Logger that drops every entry; used by embedders and tests.
    pub fn silent() -> Self {
        Self {
            file: None,
            path: None,
            verbose: false,
            echo: Echo::Off,
            scope: None,
        }
    }

    /// Clone of this logger whose entries are tagged with `package`.
    pub fn for_package(&self, package: &str) -> Self {
        let mut scoped = self.clone();
        scoped.scope = Some(package.to_string());
        scoped
    }

    /// Render a single entry line.
    fn render(&self, timestamp: &str, level: LogLevel, code: &str, message: &str) -> String {
        match &self.scope {
            Some(scope) => format!(
                "{timestamp} [{}] [{code}] [{scope}] {message}",
                level.as_str()
            ),
            None => format!("{timestamp} [{}] [{code}] {message}", level.as_str()),
        }
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = self.render(&timestamp, level, code, message.as_ref());

        if self.echo == Echo::Stderr && (self.verbose || level.always_echoed()) {
            eprintln!("{payload}");
        }

        let Some(file) = &self.file else {
            return;
        };
        if let Ok(mut guard) = file.lock() {
            let written = writeln!(guard, "{payload}").and_then(|_| guard.flush());
            if written.is_err() && self.echo == Echo::Stderr {
                eprintln!(
                    "{timestamp} [{}] [LOGGER] Failed to write to log file",
                    LogLevel::Error.as_str()
                );
            }
        }
    }

    /// Convenience wrapper for `INFO` level events.
    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    /// Convenience wrapper for `WARN` level events.
    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    /// Convenience wrapper for `ERROR` level events.
    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    /// Convenience wrapper for `DEBUG` level events.
    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist SHA-256 digest of the log file.
    pub fn finalize(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let data = std::fs::read(path).map_err(|err| {
            SynpakError::Filesystem(format!(
                "Failed to read log for hashing {}: {err}",
                path.display()
            ))
        })?;
        let digest = Sha256::digest(&data);
        let mut hash_os = path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let line = format!(
            "{:x}  {}\n",
            digest,
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        std::fs::write(&hash_path, line).map_err(|err| {
            SynpakError::Filesystem(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })
    }
}

fn open_append(file_path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            SynpakError::Filesystem(format!(
                "Failed to create log directory {}: {err}",
                parent.display()
            ))
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|err| {
            SynpakError::Filesystem(format!(
                "Failed to open log file {}: {err}",
                file_path.display()
            ))
        })?;
    Ok(BufWriter::new(file))
}
