//! `tracing` subscriber setup for the engine log.

use std::io::{self, Write};

use tracing::Level;

use crate::config::LayoutConfig;
use crate::diagnostics::{DiagnosticsWriter, global_diagnostics};

/// Where one formatted event goes: the registered diagnostics buffer, or
/// stderr when none is registered.
pub enum EngineLogSink {
    Diagnostics(DiagnosticsWriter),
    Stderr(io::Stderr),
}

impl EngineLogSink {
    fn current() -> Self {
        match global_diagnostics() {
            Some(log) => Self::Diagnostics(log.writer()),
            None => Self::Stderr(io::stderr()),
        }
    }
}

impl Write for EngineLogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Diagnostics(w) => w.write(buf),
            Self::Stderr(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Diagnostics(w) => w.flush(),
            Self::Stderr(s) => s.flush(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EngineLogWriter;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for EngineLogWriter {
    type Writer = EngineLogSink;

    fn make_writer(&'a self) -> Self::Writer {
        EngineLogSink::current()
    }
}

/// Level the engine log records at: `verbose` forces `debug`, otherwise the
/// config's `log_level` applies.
pub fn engine_level(config: &LayoutConfig, verbose: bool) -> Level {
    if verbose {
        Level::DEBUG.max(config.log_level())
    } else {
        config.log_level()
    }
}

/// Install a compact subscriber at the level `config` asks for. Later calls
/// are no-ops.
pub fn init_for(config: &LayoutConfig, verbose: bool) {
    init_with_level(engine_level(config, verbose));
}

pub fn init_with_level(level: Level) {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_max_level(level)
        .with_writer(EngineLogWriter)
        .with_ansi(global_diagnostics().is_none())
        .with_target(false)
        .with_thread_names(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_never_lowers_a_configured_level() {
        let quiet = LayoutConfig::default();
        assert_eq!(engine_level(&quiet, false), Level::WARN);
        assert_eq!(engine_level(&quiet, true), Level::DEBUG);

        let chatty = LayoutConfig {
            log_level: "trace".to_string(),
            ..LayoutConfig::default()
        };
        assert_eq!(engine_level(&chatty, false), Level::TRACE);
        assert_eq!(engine_level(&chatty, true), Level::TRACE);
    }
}
