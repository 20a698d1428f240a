use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// The server speaks LSP over stdio, so every flag here is about logging:
/// stderr by default, or a file when editors swallow stderr.
#[derive(Parser, Debug)]
#[command(
    name = "compass-lsp",
    author,
    version,
    about = "Go-to-definition language server for AMD/RequireJS modules",
    long_about = "Resolves definitions across AMD/RequireJS modules over the \
                  Language Server Protocol on stdio.\n\n\
                  Project settings live in compass.toml at the workspace root; \
                  these flags only control logging."
)]
pub struct Cli {
    #[arg(long, value_enum, default_value = "info", help = "Set the log level")]
    pub log_level: LogLevel,

    #[arg(long, help = "Write logs to the specified file instead of stderr")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Output logs in JSON format")]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_default_arguments() {
        let cli = Cli::try_parse_from(["compass-lsp"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(cli.log_file.is_none());
        assert!(!cli.log_json);
    }

    #[test]
    fn cli_parses_all_logging_flags() {
        let cli = Cli::try_parse_from([
            "compass-lsp",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/compass.log",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/compass.log")));
        assert!(cli.log_json);
    }

    #[test]
    fn log_level_converts_to_tracing_level() {
        assert_eq!(LogLevel::Trace.as_tracing_level(), tracing::Level::TRACE);
        assert_eq!(LogLevel::Debug.as_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(LogLevel::Info.as_tracing_level(), tracing::Level::INFO);
        assert_eq!(LogLevel::Warn.as_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Error.as_tracing_level(), tracing::Level::ERROR);
    }
}
