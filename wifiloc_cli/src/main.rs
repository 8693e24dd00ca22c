#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `wifiloc`: command-line front end for the localization engine.

mod app;
mod cli;
mod console;
mod error_fmt;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crossbeam_channel as xch;
use eyre::{Result, WrapErr};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};
use wifiloc_core::Mode;

fn main() {
    if let Err(e) = real_main() {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}

fn real_main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cfg = app::load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(?cfg, "configuration loaded");

    let seeds = cli.fingerprints.as_deref();
    match &cli.cmd {
        Commands::Parse { input } => app::cmd_parse(&cfg, input.as_deref(), cli.json),
        Commands::Scan => app::cmd_scan(&cfg, cli.json),
        Commands::Locate { input } => app::cmd_locate(&cfg, seeds, input.as_deref(), cli.json),
        Commands::Run { mode, duration_ms } => run(
            &cfg,
            seeds,
            mode.map(Mode::from),
            duration_ms.map(Duration::from_millis),
            cli.json,
        ),
        Commands::SelfCheck => app::cmd_self_check(&cfg, cli.json),
    }
}

// ── Logging ──────────────────────────────────────────────────────────────────

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Console logs go to stderr so stdout stays machine-readable. An optional
/// JSON-lines file layer is added from `[logging]`.
fn init_tracing(cli: &Cli, logging: &wifiloc_config::Logging) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("info");

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if cli.json {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(level))
                .boxed(),
        );
    } else {
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(env_filter(level))
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file must name a file, got {file}"))?;
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(env_filter(level))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")
}

// ── Run ──────────────────────────────────────────────────────────────────────

fn run(
    cfg: &wifiloc_config::Config,
    seeds: Option<&Path>,
    mode: Option<Mode>,
    duration: Option<Duration>,
    json_mode: bool,
) -> Result<()> {
    let tracker = app::build_tracker(cfg, seeds)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .wrap_err("install Ctrl-C handler")?;
    }

    if let Some(m) = mode {
        tracker.set_mode(m)?;
    }
    if cfg.scheduler.autostart {
        tracker.ensure_scheduler()?;
    } else if tracker.mode() == Mode::Tracking {
        // Tracking always needs the timer.
        tracker.set_mode(Mode::Tracking)?;
    }
    tracing::info!(
        mode = %tracker.mode(),
        position = %tracker.position(),
        scheduler = tracker.is_scheduler_running(),
        "wifiloc running"
    );

    let lines = spawn_stdin_reader();
    let deadline = duration.map(|d| Instant::now() + d);
    let mut stdin_open = true;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupt received; shutting down");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::info!("run duration elapsed");
            break;
        }
        if !stdin_open && deadline.is_none() {
            break;
        }

        match lines.recv_timeout(Duration::from_millis(50)) {
            Ok(line) => {
                let (reply, quit) = console::handle_line(&tracker, &line);
                if let Some(reply) = reply {
                    app::emit(json_mode, &reply);
                }
                if quit {
                    break;
                }
            }
            Err(xch::RecvTimeoutError::Timeout) => {}
            Err(xch::RecvTimeoutError::Disconnected) => {
                if stdin_open {
                    tracing::debug!("stdin closed");
                }
                stdin_open = false;
                if deadline.is_some() {
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        }
    }

    tracker.stop_scheduler();
    app::emit(
        json_mode,
        &serde_json::to_value(tracker.status()).unwrap_or(serde_json::Value::Null),
    );
    Ok(())
}

/// Forward stdin lines over a channel so the run loop can also watch the
/// deadline and the interrupt flag. The channel disconnects on EOF.
fn spawn_stdin_reader() -> xch::Receiver<String> {
    let (tx, rx) = xch::unbounded();
    let spawned = std::thread::Builder::new()
        .name("wifiloc-console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed; console closed");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not start console reader; running without console");
    }
    rx
}
