//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Smallest canvas edge accepted on the command line
pub const MIN_CANVAS_SIZE: u32 = 100;

/// Tilecast - distributed escape-time renderer
#[derive(Parser)]
#[command(
    name = "tc",
    about = "Render escape-time fractals by dispatching row tiles to remote workers",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render one canvas across the configured workers
    Render {
        /// Canvas edge in pixels
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(MIN_CANVAS_SIZE as i64..))]
        size: Option<u32>,

        /// Rows per tile
        #[arg(short, long)]
        block_size: Option<u32>,

        /// Escape-time iteration limit
        #[arg(short, long)]
        max_iter: Option<u32>,

        /// Viewport centre, real part (random viewport if centre and zoom are omitted)
        #[arg(long, allow_hyphen_values = true, requires_all = ["center_y", "zoom"])]
        center_x: Option<f64>,

        /// Viewport centre, imaginary part
        #[arg(long, allow_hyphen_values = true, requires_all = ["center_x", "zoom"])]
        center_y: Option<f64>,

        /// Zoom factor
        #[arg(short, long, requires_all = ["center_x", "center_y"])]
        zoom: Option<f64>,

        /// Output PNG path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List configured workers
    Workers {
        /// Query each worker's progress endpoint
        #[arg(short, long)]
        poll: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilecast")
        .join("logs")
        .join("tilecast.log")
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    format!("Logs are written to: {}\n", get_log_path().display())
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_render_defaults() {
        let cli = Cli::parse_from(["tc", "render"]);
        assert!(matches!(
            cli.command,
            Command::Render {
                size: None,
                center_x: None,
                output: None,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parse_render_viewport() {
        let cli = Cli::parse_from([
            "tc",
            "render",
            "--size",
            "1600",
            "--center-x",
            "-0.5",
            "--center-y",
            "0.1",
            "--zoom",
            "2",
            "-o",
            "out.png",
        ]);
        match cli.command {
            Command::Render {
                size,
                center_x,
                center_y,
                zoom,
                output,
                ..
            } => {
                assert_eq!(size, Some(1600));
                assert_eq!(center_x, Some(-0.5));
                assert_eq!(center_y, Some(0.1));
                assert_eq!(zoom, Some(2.0));
                assert_eq!(output, Some(PathBuf::from("out.png")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_small_canvas() {
        assert!(Cli::try_parse_from(["tc", "render", "--size", "99"]).is_err());
        assert!(Cli::try_parse_from(["tc", "render", "--size", "100"]).is_ok());
    }

    #[test]
    fn test_cli_centre_requires_zoom() {
        assert!(Cli::try_parse_from(["tc", "render", "--center-x", "0.1", "--center-y", "0.2"]).is_err());
    }

    #[test]
    fn test_cli_parse_workers_global_flags() {
        let cli = Cli::parse_from(["tc", "workers", "--poll", "-l", "debug", "-c", "/tmp/tc.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tc.yml")));
        assert!(matches!(
            cli.command,
            Command::Workers {
                poll: true,
                format: OutputFormat::Text
            }
        ));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
