// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::fmt;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Environment variable holding a log filter, e.g. `rolevault_reporting=debug`.
pub const LOG_ENV: &str = "ROLEVAULT_LOG";

/// Log target whose events are printed without a level heading.
pub(crate) const NO_HEADING_TARGET: &str = "rolevault_cli::no_heading";

pub(crate) mod clap_styles {
    use clap::builder::{
        Styles,
        styling::{AnsiColor, Effects},
    };

    pub(crate) const fn style() -> Styles {
        let heading = AnsiColor::Blue.on_default().effects(Effects::BOLD);
        let flag = AnsiColor::Magenta.on_default().effects(Effects::BOLD);
        Styles::styled()
            .header(heading)
            .usage(heading)
            .literal(flag)
            .placeholder(AnsiColor::Magenta.on_default())
            .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
            .valid(flag)
            .invalid(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output
    #[arg(long, short, global = true, env = "ROLEVAULT_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "ROLEVAULT_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        let OutputOpts { verbose, color } = self;

        color.init(verbose);

        OutputContext { color }
    }
}

/// Output settings chosen on the command line.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns general stderr styles for the current output context.
    pub fn stderr_styles(&self) -> StderrStyles {
        let mut styles = StderrStyles::default();

        if self.color.should_colorize(supports_color::Stream::Stderr) {
            styles.colorize();
        }

        styles
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
/// When to produce color output.
#[must_use]
pub enum Color {
    /// Colorize if stderr supports it.
    #[default]
    Auto,

    /// Always colorize.
    Always,

    /// Never colorize.
    Never,
}

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

/// Name of the spans opened by `rolevault_reporting::step`.
const STEP_SPAN: &str = "step";

/// Writes `<level>: [<step> > <step>] <message>` lines.
///
/// The bracketed path lists the enclosing steps, outermost first. It is
/// omitted outside of steps, or when step spans are filtered out.
struct StepFormatter {
    styles: LogStyles,
}

impl<S, N> FormatEvent<S, N> for StepFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if metadata.target() != NO_HEADING_TARGET {
            let style = self.styles.for_level(*metadata.level());
            let level = metadata.level().as_str().to_ascii_lowercase();
            write!(writer, "{}: ", level.style(style))?;
        }
        self.write_step_path(ctx, &mut writer)?;

        let mut message = MessageWriter {
            writer: &mut writer,
            result: Ok(()),
        };
        event.record(&mut message);
        message.result?;

        writeln!(writer)
    }
}

impl StepFormatter {
    fn write_step_path<S, N>(
        &self,
        ctx: &FmtContext<'_, S, N>,
        writer: &mut format::Writer<'_>,
    ) -> fmt::Result
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        N: for<'a> FormatFields<'a> + 'static,
    {
        let Some(scope) = ctx.event_scope() else {
            return Ok(());
        };

        let mut names = Vec::new();
        for span in scope.from_root().filter(|span| span.name() == STEP_SPAN) {
            let extensions = span.extensions();
            if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                // Steps record a single `name` field.
                let formatted = fields.fields.as_str();
                let name = formatted.strip_prefix("name=").unwrap_or(formatted);
                names.push(name.to_owned());
            }
        }

        if names.is_empty() {
            return Ok(());
        }
        let path = format!("[{}]", names.join(" > "));
        write!(writer, "{} ", path.style(self.styles.step))
    }
}

/// Writes only the `message` field of an event.
struct MessageWriter<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    result: fmt::Result,
}

impl Visit for MessageWriter<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if self.result.is_ok() && field.name() == "message" {
            self.result = write!(self.writer, "{value:?}");
        }
    }
}

impl Color {
    pub(crate) fn init(self, verbose: bool) {
        let mut log_styles = LogStyles::default();
        if self.should_colorize(supports_color::Stream::Stderr) {
            log_styles.colorize();
        }

        INIT_LOGGER.call_once(|| {
            let default_level = if verbose {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            };
            let level_str = std::env::var(LOG_ENV).unwrap_or_default();

            // An empty or unparseable filter falls back to the default level.
            let targets = level_str
                .parse::<Targets>()
                .ok()
                .filter(|_| !level_str.is_empty())
                .unwrap_or_else(|| Targets::new().with_default(default_level));

            let layer = tracing_subscriber::fmt::layer()
                .event_format(StepFormatter { styles: log_styles })
                .with_writer(std::io::stderr)
                .with_filter(targets);

            tracing_subscriber::registry().with(layer).init();
        });
    }

    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    other: Style,
    step: Style,
}

impl LogStyles {
    fn colorize(&mut self) {
        self.error = style().red().bold();
        self.warning = style().yellow().bold();
        self.other = style().bold();
        self.step = style().cyan();
    }

    fn for_level(&self, level: Level) -> Style {
        match level {
            Level::ERROR => self.error,
            Level::WARN => self.warning,
            _ => self.other,
        }
    }
}

/// Styles for messages written to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) path: Style,
}

impl StderrStyles {
    fn colorize(&mut self) {
        self.path = style().bold();
    }
}
