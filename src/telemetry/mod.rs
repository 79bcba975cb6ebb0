// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging and metrics.
//!
//! - **Tracing**: structured logs through `tracing`, installed by [`init_telemetry`]
//! - **Metrics**: per-backend call outcomes and token counts, plus indexer
//!   timings, in [`GLOBAL_METRICS`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use openpilot::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```
//!
//! Library code never installs a subscriber; only the binary does.

mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{CallStats, IndexerStats, Metrics, ProviderStats, GLOBAL_METRICS};
