/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Syn-Pak Core. Checks a content package
    against the content server, runs update sessions, and clears
    cached packages on request.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTP GET requests
    and writes only beneath the configured cache directory.

  Dependencies:
    clap for CLI parsing, chrono for session stamps.

  Operational Scope:
    Invoked by operators or host launchers before the host
    application loads its downloadable content.

  Revision History:
    2026-10-12 COD  Authored Syn-Pak Core runtime.
    2026-10-19 COD  Integrity flag scoped to check/update; quit status by cause.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

mod terminal;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};

use synpak_core::cache::clear_package;
use synpak_core::config::validate_package_name;
use synpak_core::format::display_size;
use synpak_core::host::ProcessExit;
use synpak_core::http_client::HttpMetadataClient;
use synpak_core::scene::FileSceneLoader;
use synpak_core::{
    ExecutionMode, Logger, Result, SynpakConfig, SynpakError, UpdateRequest, Updater,
    VersionResolver,
};
use terminal::{TerminalConfirmation, TerminalSink};

/// Command-line arguments for Syn-Pak-Core.
#[derive(Debug, Parser)]
#[command(
    name = "Syn-Pak-Core",
    version,
    author = "Synavera Systems",
    about = "Conscious content-package updater for Syn-Pak"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, global = true, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Override execution mode (development, offline, production).
    #[arg(long, global = true, value_name = "MODE")]
    mode: Option<ExecutionMode>,
    /// Enable verbose logging to stderr.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare installed and published versions.
    Check(CheckArgs),
    /// Run an update session.
    Update(UpdateArgs),
    /// Delete the cached content of a package.
    Clear(PackageArgs),
}

#[derive(Debug, Args)]
struct PackageArgs {
    /// Package name (defaults to the configured package).
    #[arg(long, value_name = "NAME")]
    package: Option<String>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    target: PackageArgs,
    /// Skip on-disk integrity verification.
    #[arg(long, action = ArgAction::SetTrue)]
    no_integrity: bool,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    #[command(flatten)]
    target: PackageArgs,
    /// Skip on-disk integrity verification.
    #[arg(long, action = ArgAction::SetTrue)]
    no_integrity: bool,
    /// Scene to load after initialization.
    #[arg(long, value_name = "SCENE")]
    scene: Option<String>,
    /// Package decryption key.
    #[arg(long, value_name = "KEY")]
    key: Option<String>,
    /// Accept the download prompt without asking.
    #[arg(long, action = ArgAction::SetTrue)]
    yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Syn-Pak-Core] {}", err);
            if err.is_retryable() {
                eprintln!("[Syn-Pak-Core] The content server may be unavailable; retry later.");
            }
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = SynpakConfig::load_from_optional_path(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| config.log_dir().join(format!("pak_{session_stamp}.log")));
    let logger = Logger::new(Some(log_path), cli.verbose)?;
    logger.info(
        "INIT",
        format!("Syn-Pak Core awakening in {} mode.", config.mode),
    );

    let outcome = match cli.command {
        Command::Check(args) => check(&config, &args, &logger).await,
        Command::Update(args) => update(&config, args, &logger).await,
        Command::Clear(args) => clear(&config, &args, &logger),
    };

    if let Err(err) = &outcome {
        logger.error("FAIL", err.to_string());
    } else {
        logger.info("COMPLETE", "Consciousness synchronised.");
    }
    logger.finalize()?;
    outcome.map(|_| ExitCode::SUCCESS)
}

fn package_name(config: &SynpakConfig, args: &PackageArgs) -> Result<String> {
    let name = args
        .package
        .clone()
        .unwrap_or_else(|| config.package.name.clone());
    validate_package_name(&name)?;
    Ok(name)
}

async fn check(config: &SynpakConfig, args: &CheckArgs, logger: &Logger) -> Result<()> {
    let package = package_name(config, &args.target)?;
    let client = HttpMetadataClient::new(config, logger.clone())?;
    let resolver = VersionResolver::new(&client, logger.for_package(&package));

    let check_integrity = config.package.check_integrity && !args.no_integrity;
    let resolved = resolver
        .fetch(&BTreeSet::from([package.clone()]), check_integrity)
        .await?;
    let local = resolver.local_version(&package, Some(&resolved)).await?;
    let remote = resolver.remote_version(&package, Some(&resolved)).await?;
    let pending = resolved
        .get(&package)
        .map(|info| (info.need_download_count, info.need_update_size_bytes))
        .unwrap_or_default();

    if local == remote {
        println!("→ {package}: v{local} is current");
    } else {
        println!(
            "→ {package}: v{local} installed, v{remote} published ({} bundles, {})",
            pending.0,
            display_size(pending.1)
        );
    }
    Ok(())
}

async fn update(config: &SynpakConfig, args: UpdateArgs, logger: &Logger) -> Result<()> {
    let package = package_name(config, &args.target)?;
    let client = Arc::new(HttpMetadataClient::new(config, logger.clone())?);
    let scenes = Arc::new(FileSceneLoader::new(config.cache_dir(), logger.clone()));
    let updater = Updater::new(
        client,
        Arc::new(TerminalConfirmation::new(args.yes)),
        scenes,
        Arc::new(ProcessExit::new()),
        logger.clone(),
        config.mode,
        config.app_version.clone(),
    );

    let request = UpdateRequest::new(package)
        .with_integrity_check(config.package.check_integrity && !args.no_integrity)
        .with_key(args.key.or_else(|| config.package.key.clone()))
        .with_next_scene(args.scene.or_else(|| config.package.next_scene.clone()));

    let sink = TerminalSink::new(logger.clone());
    let report = updater.start_update(request, &sink).await?;
    if sink.failed() {
        return Err(SynpakError::Runtime("update reported failure".into()));
    }
    logger.info(
        "SUMMARY",
        format!(
            "state={} version=v{} downloaded={} scene_loaded={}",
            report.state, report.package.remote_version, report.downloaded, report.scene_loaded
        ),
    );
    Ok(())
}

fn clear(config: &SynpakConfig, args: &PackageArgs, logger: &Logger) -> Result<()> {
    let package = package_name(config, args)?;
    let root = config.cache_dir();
    if clear_package(&root, &package)? {
        logger.info("CLEAR", format!("Removed cached content for {package}"));
        println!("→ Cleared {package}");
    } else {
        logger.warn("CLEAR", format!("No cached content for {package}"));
    }
    Ok(())
}
