//! Where `linux-setup` output goes: the coloured console view of a run and
//! the plain-text run log kept under the cache directory.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Target used for stage headers.
pub(super) const STAGE_TARGET: &str = "linux_setup::stage";
/// Target used for dry-run simulation lines.
pub(super) const DRY_RUN_TARGET: &str = "linux_setup::dry_run";

/// How a single event is rendered, decided from its level and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    /// `Executing task 2/5: ...`, `Checking prerequisites`, ...
    Stage,
    /// What a task would have done.
    DryRun,
    Error,
    Warn,
    Debug,
    /// `✓ ...` lines from the runner and coordinator.
    Success,
    Plain,
}

impl LineKind {
    fn classify(level: Level, target: &str, msg: &str) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO if target == STAGE_TARGET => Self::Stage,
            Level::INFO if target == DRY_RUN_TARGET => Self::DryRun,
            Level::INFO if msg.starts_with('✓') => Self::Success,
            Level::INFO => Self::Plain,
            _ => Self::Debug,
        }
    }

    /// Run-log prefix, written after the timestamp in place of colour.
    const fn file_tag(self) -> &'static str {
        match self {
            Self::Stage => "==> ",
            Self::DryRun => "    [dry run] ",
            Self::Error => "    [error] ",
            Self::Warn => "    [warn] ",
            Self::Debug => "    [debug] ",
            Self::Success | Self::Plain => "    ",
        }
    }
}

/// Pulls the `message` field out of an event.
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn message_of(event: &tracing::Event<'_>) -> String {
    let mut extractor = MessageExtractor::default();
    event.record(&mut extractor);
    extractor.message
}

/// Run log for one `linux-setup` invocation.
///
/// Records every event down to `DEBUG` (task stages, simulated actions,
/// backup checksums, command timings) even when the console only shows
/// `INFO`, so a failed run can be diagnosed afterwards.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Start a fresh run log for `command`, headed by the version, the
    /// command and the start time.
    ///
    /// Returns `None` if the cache directory or the file is unusable; the
    /// run then continues with console output only.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version = option_env!("LINUX_SETUP_VERSION")
            .unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let rule = "=".repeat(48);
        let header = format!(
            "{rule}\nlinux-setup {version} {command} (started {} UTC)\n{rule}\n",
            format_utc_datetime(),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let metadata = event.metadata();
        let msg = strip_ansi(&message_of(event));
        let kind = LineKind::classify(*metadata.level(), metadata.target(), &msg);
        let line = format!("[{}] {}{msg}", format_utc_time(), kind.file_tag());

        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// Console view of a run: bold stage headers, yellow dry-run lines, green
/// successes and coloured `ERROR`/`WARN` tags.
struct SetupFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for SetupFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let msg = message_of(event);

        match LineKind::classify(*metadata.level(), metadata.target(), &msg) {
            LineKind::Error => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            LineKind::Warn => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            LineKind::Stage => writeln!(writer, "\x1b[1;36m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            LineKind::DryRun => writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
            LineKind::Success => writeln!(writer, "  \x1b[32m{msg}\x1b[0m"),
            LineKind::Plain => writeln!(writer, "  {msg}"),
            LineKind::Debug => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Install the global subscriber for one `linux-setup` invocation.
///
/// Errors and warnings go to stderr, everything else to stdout; `verbose`
/// adds debug lines to the console. The run log for `command` is written
/// to `$XDG_CACHE_HOME/linux-setup/<command>.log` at debug level
/// regardless. Call once, before the first log line.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(SetupFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
