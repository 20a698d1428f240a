use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, MakeWriter, format::FmtSpan},
    prelude::*,
};

use crate::cli::Cli;

/// Installs the global subscriber. Returns the appender guard when logging
/// to a file; dropping it flushes buffered lines, so `main` must hold it.
pub fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let level = cli.log_level.as_tracing_level();
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let (layer, guard) = match &cli.log_file {
        Some(path) => {
            let parent = path.parent().unwrap_or(Path::new("."));
            let filename = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("compass-lsp.log");
            let appender = tracing_appender::rolling::never(parent, filename);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (event_layer(writer, cli.log_json), Some(guard))
        }
        None => (event_layer(io::stderr, cli.log_json), None),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();

    guard
}

/// The writer decides where lines go, the JSON switch decides their shape;
/// everything else is shared.
fn event_layer<W>(writer: W, json: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(FmtSpan::CLOSE);
    if json { layer.json().boxed() } else { layer.boxed() }
}

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, LogLevel};
    use tracing::Level;

    fn parse_cli(args: &[&str]) -> Cli {
        use clap::Parser;
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn log_level_info_filters_debug_messages() {
        let info_level = LogLevel::Info.as_tracing_level();
        let debug_level = LogLevel::Debug.as_tracing_level();
        assert_eq!(info_level, Level::INFO);
        assert!(info_level < debug_level);
    }

    #[test]
    fn log_level_warn_filters_info_messages() {
        let warn_level = LogLevel::Warn.as_tracing_level();
        let info_level = LogLevel::Info.as_tracing_level();
        assert_eq!(warn_level, Level::WARN);
        assert!(warn_level < info_level);
    }

    #[test]
    fn default_log_level_is_info() {
        let cli = parse_cli(&["compass-lsp"]);
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn log_file_none_by_default() {
        let cli = parse_cli(&["compass-lsp"]);
        assert!(cli.log_file.is_none());
    }
}
