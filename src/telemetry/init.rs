// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subscriber installation.
//!
//! Logs always go to stderr so command output on stdout stays clean.

use std::io;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crate target used in default filter directives.
const CRATE_TARGET: &str = "openpilot";

/// Configuration for telemetry initialization.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level for this crate when neither `RUST_LOG` nor a directive is set.
    pub default_level: Level,

    /// Whether to log span close events with timings.
    pub include_span_events: bool,

    /// Whether to include file/line information.
    pub include_file_line: bool,

    /// Whether to include the target module path.
    pub include_target: bool,

    pub ansi_colors: bool,

    pub compact: bool,

    /// Custom filter directive (overrides `RUST_LOG` and `default_level`).
    pub filter_directive: Option<String>,

    /// Log a metrics report when the guard is dropped.
    pub report_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            include_span_events: false,
            include_file_line: false,
            include_target: true,
            ansi_colors: true,
            compact: true,
            filter_directive: None,
            report_metrics: false,
        }
    }
}

impl TelemetryConfig {
    /// Verbose output for local debugging: span timings and source locations.
    pub fn development() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_span_events: true,
            include_file_line: true,
            compact: false,
            report_metrics: true,
            ..Self::default()
        }
    }

    /// Plain warn-level lines for machine consumers: no colors, no targets.
    pub fn production() -> Self {
        Self {
            include_target: false,
            ansi_colors: false,
            ..Self::default()
        }
    }

    /// Trace-level output without colors, for test logs.
    pub fn testing() -> Self {
        Self {
            default_level: Level::TRACE,
            include_span_events: true,
            include_file_line: true,
            ansi_colors: false,
            compact: false,
            filter_directive: Some(format!("{}=trace", CRATE_TARGET)),
            ..Self::default()
        }
    }

    /// Map a `-v` count to a preset: 0 warn, 1 info, 2 debug, 3+ trace.
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        let config = if verbose >= 2 {
            Self::development()
        } else {
            Self::default()
        };
        config.with_level(level)
    }

    /// Set the default log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set a custom filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    /// Enable or disable ANSI colors.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }

    /// Directive used when no explicit filter is configured.
    pub fn default_directive(&self) -> String {
        format!("{}={}", CRATE_TARGET, self.default_level.to_string().to_lowercase())
    }

    fn build_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.default_directive());
        match &self.filter_directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

/// Guard returned by [`init_telemetry`].
///
/// Keep it alive for the duration of the program. When metrics reporting is
/// enabled, dropping it logs the accumulated report.
pub struct TelemetryGuard {
    report_metrics: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        if self.report_metrics {
            let report = super::metrics::GLOBAL_METRICS.report();
            tracing::info!("\n{}", report);
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = self.report_metrics;
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
///
/// # Example
///
/// ```rust,ignore
/// use openpilot::telemetry::{init_telemetry, TelemetryConfig};
///
/// let _guard = init_telemetry(&TelemetryConfig::from_verbosity(1))?;
/// ```
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<TelemetryGuard> {
    let filter = config.build_filter();

    let span_events = if config.include_span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(span_events);

    if config.compact {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.compact())
            .try_init()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    }

    Ok(TelemetryGuard {
        report_metrics: config.report_metrics,
    })
}
