use std::{
    io::{self, Write},
    path::Path,
    sync::LazyLock,
};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{fmt::writer::MakeWriterExt, EnvFilter};

pub const LOG_PREFIX: &str = "studytimer";

const DEFAULT_LEVEL: &str = "info";

/// Clears the timer status line before the first write of every console event, otherwise log
/// output would be glued to the `\r` redrawn countdown.
struct LineClearing<W: Write> {
    inner: W,
    cleared: bool,
}

impl<W: Write> LineClearing<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            cleared: false,
        }
    }
}

impl<W: Write> Write for LineClearing<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.cleared {
            self.inner.write_all(b"\r\x1b[2K")?;
            self.cleared = true;
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Directive for this crate only. An explicit level wins over `RUST_LOG`.
fn crate_directive(log_level: Option<LevelFilter>, env_level: Option<String>) -> String {
    let level = log_level
        .map(|v| v.to_string())
        .or(env_level.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_LEVEL.into());
    format!("{}={level}", env!("CARGO_PKG_NAME").replace("-", "_"))
}

/// Logs go into daily files inside `log_dir`. Console output is opt-in and goes to stderr since
/// stdout carries the prompts and the status line.
pub fn enable_logging(log_dir: &Path, log_level: Option<LevelFilter>, console: bool) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .build(log_dir)?;

    let console = (|| LineClearing::new(io::stderr())).with_filter(move |_| console);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(crate_directive(
            log_level,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_writer(console.and(appender))
        .with_ansi(false)
        .pretty()
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tracing::level_filters::LevelFilter;

    use super::{crate_directive, LineClearing};

    #[test]
    fn clears_status_line_once_per_event() {
        let mut writer = LineClearing::new(Vec::new());
        writer.write_all(b"first ").unwrap();
        writer.write_all(b"second\n").unwrap();
        assert_eq!(writer.inner, b"\r\x1b[2Kfirst second\n");
    }

    #[test]
    fn directive_prefers_explicit_level() {
        assert_eq!(
            crate_directive(Some(LevelFilter::TRACE), Some("warn".into())),
            "studytimer=trace"
        );
        assert_eq!(crate_directive(None, Some("warn".into())), "studytimer=warn");
        assert_eq!(crate_directive(None, Some(" ".into())), "studytimer=info");
        assert_eq!(crate_directive(None, None), "studytimer=info");
    }
}
