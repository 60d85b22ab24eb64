//! Logging bootstrap for host applications embedding the runtime.
//!
//! `weave-core` and `weave-runtime` both log through the `tracing`
//! facade; nothing in either crate installs a subscriber itself. This
//! module is the optional convenience a host can reach for instead of
//! wiring `tracing-subscriber` by hand.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Span event configuration, passed straight through to
/// `tracing_subscriber::fmt::format::FmtSpan`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    pub const NONE: Self = Self { new: false, enter: false, exit: false, close: false };
    pub const LIFECYCLE: Self = Self { new: true, enter: false, exit: false, close: true };
    pub const FULL: Self = Self { new: true, enter: true, exit: true, close: true };

    fn to_fmt_span(self) -> fmt::format::FmtSpan {
        let mut span = fmt::format::FmtSpan::NONE;
        if self.new {
            span |= fmt::format::FmtSpan::NEW;
        }
        if self.enter {
            span |= fmt::format::FmtSpan::ENTER;
        }
        if self.exit {
            span |= fmt::format::FmtSpan::EXIT;
        }
        if self.close {
            span |= fmt::format::FmtSpan::CLOSE;
        }
        span
    }
}

/// Initializes logging with the `RUST_LOG` environment variable, or
/// `info` if it is unset. Panics if a subscriber is already installed.
pub fn init() {
    init_with_filter("info");
}

pub fn init_with_filter(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}

/// Builder form for hosts that want span-event visibility into
/// registry mutations and plugin lifecycle transitions.
#[derive(Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    span_events: SpanEvents,
    with_target: bool,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }

    pub fn init(self) {
        let filter = self.build_filter();
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_span_events(self.span_events.to_fmt_span())
                    .with_target(self.with_target),
            )
            .with(filter)
            .init();
    }
}

/// Optional hook for hosts that want Runtime log records forwarded
/// somewhere other than whatever `tracing::Subscriber` is installed
/// (e.g. into an in-game console). `Instance::log()` returns a
/// `Logger` that always emits through `tracing`; a host additionally
/// registers a `LogSink` to also receive records.
pub trait LogSink: Send + Sync {
    fn record(&self, level: tracing::Level, message: &str);
}

/// Thin facade over `tracing`, returned by `Instance::log()`.
#[derive(Default)]
pub struct Logger {
    sink: parking_lot::RwLock<Option<std::sync::Arc<dyn LogSink>>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&self, sink: std::sync::Arc<dyn LogSink>) {
        *self.sink.write() = Some(sink);
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{message}");
        self.forward(tracing::Level::INFO, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        self.forward(tracing::Level::WARN, message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.forward(tracing::Level::ERROR, message);
    }

    fn forward(&self, level: tracing::Level, message: &str) {
        if let Some(sink) = self.sink.read().as_ref() {
            sink.record(level, message);
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("has_sink", &self.sink.read().is_some())
            .finish()
    }
}
