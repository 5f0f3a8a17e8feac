//! Tilecast - distributed escape-time renderer
//!
//! CLI entry point for rendering a canvas across remote workers.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use serde::Serialize;
use tracing::{debug, info, warn};

use tilecast::cli::{Cli, Command, MIN_CANVAS_SIZE, OutputFormat, generate_after_help, get_log_path};
use tilecast::config::Config;
use tilecast::dispatch::Dispatcher;
use tilecast::domain::{CanvasSize, Viewport};
use tilecast::rpc::create_renderer;
use tilecast::{RunResult, RunStatus};

/// How often the progress line is redrawn
const PROGRESS_REFRESH: Duration = Duration::from_millis(200);

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;
    info!(workers = config.workers.len(), "Tilecast loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Render {
            size,
            block_size,
            max_iter,
            center_x,
            center_y,
            zoom,
            output,
        } => {
            let max_iter = max_iter.unwrap_or(config.render.max_iter);
            let viewport = match (center_x, center_y, zoom) {
                (Some(x), Some(y), Some(z)) => Viewport::new(x, y, z, max_iter),
                _ => Viewport::random(max_iter),
            };
            let opts = RenderOptions {
                size: size.unwrap_or(config.render.size),
                block_size: block_size.unwrap_or(config.render.block_size),
                viewport,
                output: output.unwrap_or_else(|| config.render.output.clone()),
            };
            cmd_render(&config, opts).await
        }
        Command::Workers { poll, format } => cmd_workers(&config, poll, format).await,
    }
}

/// Render settings after CLI overrides are applied to the config
struct RenderOptions {
    size: u32,
    block_size: u32,
    viewport: Viewport,
    output: PathBuf,
}

async fn cmd_render(config: &Config, opts: RenderOptions) -> Result<()> {
    debug!(size = opts.size, block_size = opts.block_size, "cmd_render: called");
    if opts.size < MIN_CANVAS_SIZE {
        return Err(eyre!("Canvas size must be at least {} pixels", MIN_CANVAS_SIZE));
    }
    if opts.block_size == 0 {
        return Err(eyre!("Block size must be greater than zero"));
    }
    if opts.viewport.zoom.is_nan() || opts.viewport.zoom <= 0.0 {
        return Err(eyre!("Zoom must be positive"));
    }

    let registry = config.registry()?;
    let renderer = create_renderer(config.scheduler.rpc_timeout())?;
    let dispatcher = Dispatcher::new(config.scheduler.clone(), opts.block_size, registry, renderer);
    let canvas = CanvasSize::square(opts.size);

    println!(
        "{} {} across {} workers (center {:.4}{:+.4}i, zoom {:.3}, max-iter {})",
        "Rendering".bold(),
        canvas,
        dispatcher.registry().len(),
        opts.viewport.center_x,
        opts.viewport.center_y,
        opts.viewport.zoom,
        opts.viewport.max_iter,
    );

    let handle = dispatcher.start_run(canvas, opts.viewport)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(PROGRESS_REFRESH);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print_progress(handle.current_progress().await);
                if handle.is_finished() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                println!();
                println!("{}", "Cancelling run...".yellow());
                handle.cancel();
                break;
            }
        }
    }

    let last = handle.current_progress().await;
    let result = handle.result().await?;
    print_progress(last);
    println!();

    if let Some(parent) = opts.output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
    }
    result
        .canvas
        .save_png(&opts.output)
        .context(format!("Failed to write {}", opts.output.display()))?;

    print_summary(&result);
    println!("Saved {}", opts.output.display().to_string().cyan());
    Ok(())
}

fn print_progress(percent: f64) {
    print!("\r{} {:5.1}%", "Progress".bold(), percent);
    let _ = std::io::stdout().flush();
}

fn print_summary(result: &RunResult) {
    let status = match result.status {
        RunStatus::Complete => "complete".green(),
        RunStatus::Degraded => "degraded".yellow(),
        RunStatus::Cancelled => "cancelled".red(),
    };
    println!("Run {} {}", result.run_id, status.bold());

    for slot in &result.slots {
        println!(
            "  {:<16} {:<32} {:>4} tiles  {:>3} failed",
            slot.name, slot.url, slot.tiles_completed, slot.tiles_failed
        );
    }

    for failure in &result.failed {
        println!(
            "  {} rows {} after {} attempts: {}",
            "failed".red(),
            failure.rows,
            failure.attempts,
            failure.last_error
        );
    }
    for rows in &result.missing {
        println!("  {} rows {}", "missing".yellow(), rows);
    }

    println!("Total time: {:.2}s", result.elapsed.as_secs_f64());
}

/// One line of `tc workers`
#[derive(Debug, Serialize)]
struct WorkerRow {
    name: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn cmd_workers(config: &Config, poll: bool, format: OutputFormat) -> Result<()> {
    debug!(poll, %format, "cmd_workers: called");
    let registry = config.registry()?;
    let renderer = if poll {
        Some(create_renderer(config.scheduler.rpc_timeout())?)
    } else {
        None
    };

    let mut rows = Vec::with_capacity(registry.len());
    for worker in registry.iter() {
        let mut row = WorkerRow {
            name: worker.name.clone(),
            url: worker.url.clone(),
            status: None,
            progress: None,
            error: None,
        };
        if let Some(renderer) = &renderer {
            match renderer.poll_progress(worker).await {
                Ok(report) => {
                    row.status = Some(report.status.to_string());
                    row.progress = Some(report.progress);
                }
                Err(e) => {
                    warn!(worker = %worker.name, error = %e, "Worker poll failed");
                    row.error = Some(e.to_string());
                }
            }
        }
        rows.push(row);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            for row in &rows {
                let state = match (&row.status, row.progress, &row.error) {
                    (Some(status), Some(progress), _) => format!("{} {:.1}%", status, progress).green().to_string(),
                    (_, _, Some(error)) => error.red().to_string(),
                    _ => String::new(),
                };
                println!("{:<16} {:<32} {}", row.name.bold(), row.url, state);
            }
        }
    }
    Ok(())
}
