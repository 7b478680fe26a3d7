//! Diagnostics go to stderr as tracing events; ndjson helpers for result lines.

use serde::Serialize;
use std::io::{self, Write};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs the tracing subscriber and writes standalone JSON lines.
pub struct StructuredLogger;

impl StructuredLogger {
    /// Install global subscriber on stderr, level from RUST_LOG or `default_level`.
    /// Stdout is left to result sinks.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let registry = tracing_subscriber::registry().with(filter);
        // A second init (tests, embedding) keeps the first subscriber.
        let installed = if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(io::stderr);
            registry.with(fmt).try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .try_init()
        };
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }

    /// Emit a single JSON object line without going through tracing.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> io::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(w, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Summary<'a> {
        detector: &'a str,
        rows: u64,
    }

    #[test]
    fn emit_json_writes_one_line() {
        let mut out = Vec::new();
        StructuredLogger::emit_json(&Summary { detector: "ddos", rows: 3 }, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"detector\":\"ddos\",\"rows\":3}\n");
    }

    #[test]
    fn init_twice_is_harmless() {
        StructuredLogger::init(false, "warn");
        StructuredLogger::init(true, "warn");
    }
}
