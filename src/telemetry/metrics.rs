// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process counters for backend calls and indexer work.
//!
//! Provider calls are tracked per backend and per operation (`chat`,
//! `complete`, `stream_chat`) together with the tokens each backend reported.
//! Indexer operations (`analyze`, `code_context`, `index_file`) track how
//! long they took and how much they produced: files found, lines selected,
//! chunks written.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::RwLock;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Timing for one kind of call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub calls: u64,
    pub failures: u64,
    pub total: Duration,
    pub slowest: Duration,
}

impl CallStats {
    fn record(&mut self, elapsed: Duration, success: bool) {
        self.calls += 1;
        if !success {
            self.failures += 1;
        }
        self.total += elapsed;
        self.slowest = self.slowest.max(elapsed);
    }

    /// Mean latency, zero before the first call.
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.calls as f64),
        }
    }
}

/// Everything recorded for one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderStats {
    /// Keyed by operation name.
    pub operations: BTreeMap<String, CallStats>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl ProviderStats {
    /// Calls across all operations.
    pub fn calls(&self) -> u64 {
        self.operations.values().map(|s| s.calls).sum()
    }

    /// Failed calls across all operations.
    pub fn failures(&self) -> u64 {
        self.operations.values().map(|s| s.failures).sum()
    }
}

/// Everything recorded for one indexer operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexerStats {
    pub timing: CallStats,
    /// Files, lines or chunks produced, depending on the operation.
    pub items: u64,
}

/// Central metrics collection.
#[derive(Debug, Default)]
pub struct Metrics {
    providers: RwLock<BTreeMap<String, ProviderStats>>,
    indexer: RwLock<BTreeMap<&'static str, IndexerStats>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one backend call. `usage` is `(prompt, completion)` tokens.
    pub fn record_provider_call(
        &self,
        provider: &str,
        operation: &str,
        elapsed: Duration,
        success: bool,
        usage: Option<(u64, u64)>,
    ) {
        let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
        let stats = providers.entry(provider.to_string()).or_default();
        stats
            .operations
            .entry(operation.to_string())
            .or_default()
            .record(elapsed, success);
        if let Some((prompt, completion)) = usage {
            stats.prompt_tokens += prompt;
            stats.completion_tokens += completion;
        }
    }

    /// Record one successful indexer operation and how many items it produced.
    pub fn record_indexer(&self, operation: &'static str, elapsed: Duration, items: u64) {
        let mut indexer = self.indexer.write().unwrap_or_else(|e| e.into_inner());
        let stats = indexer.entry(operation).or_default();
        stats.timing.record(elapsed, true);
        stats.items += items;
    }

    /// Stats for one backend, if it was ever called.
    pub fn provider(&self, provider: &str) -> Option<ProviderStats> {
        self.providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(provider)
            .cloned()
    }

    /// Stats for one indexer operation, if it ever ran.
    pub fn indexer(&self, operation: &str) -> Option<IndexerStats> {
        self.indexer
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(operation)
            .copied()
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.providers.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.indexer.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Human-readable summary, backends and operations in name order.
    pub fn report(&self) -> String {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        let indexer = self.indexer.read().unwrap_or_else(|e| e.into_inner());

        let mut out = String::from("=== OpenPilot Metrics ===\n");
        if !providers.is_empty() {
            out.push_str("\nProviders:\n");
            for (name, stats) in providers.iter() {
                let _ = writeln!(
                    out,
                    "  {}: {} calls, {} failed, tokens {} in / {} out",
                    name,
                    stats.calls(),
                    stats.failures(),
                    stats.prompt_tokens,
                    stats.completion_tokens
                );
                for (operation, call) in &stats.operations {
                    let _ = writeln!(
                        out,
                        "    {}: {} calls, mean {:.2?}, slowest {:.2?}",
                        operation,
                        call.calls,
                        call.mean(),
                        call.slowest
                    );
                }
            }
        }
        if !indexer.is_empty() {
            out.push_str("\nIndexer:\n");
            for (operation, stats) in indexer.iter() {
                let _ = writeln!(
                    out,
                    "  {}: {} runs, {} items, mean {:.2?}",
                    operation,
                    stats.timing.calls,
                    stats.items,
                    stats.timing.mean()
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_calls_grouped_by_operation() {
        let metrics = Metrics::new();
        metrics.record_provider_call("ollama", "chat", Duration::from_millis(30), true, Some((10, 4)));
        metrics.record_provider_call("ollama", "chat", Duration::from_millis(10), false, None);
        metrics.record_provider_call("ollama", "stream_chat", Duration::from_millis(50), true, Some((3, 7)));

        let stats = metrics.provider("ollama").unwrap();
        assert_eq!(stats.calls(), 3);
        assert_eq!(stats.failures(), 1);
        assert_eq!(stats.prompt_tokens, 13);
        assert_eq!(stats.completion_tokens, 11);

        let chat = stats.operations["chat"];
        assert_eq!(chat.mean(), Duration::from_millis(20));
        assert_eq!(chat.slowest, Duration::from_millis(30));
        assert!(metrics.provider("openai").is_none());
    }

    #[test]
    fn test_indexer_items_accumulate() {
        let metrics = Metrics::new();
        metrics.record_indexer("analyze", Duration::from_millis(4), 9);
        metrics.record_indexer("analyze", Duration::from_millis(6), 3);

        let analyze = metrics.indexer("analyze").unwrap();
        assert_eq!(analyze.timing.calls, 2);
        assert_eq!(analyze.items, 12);
        assert_eq!(analyze.timing.mean(), Duration::from_millis(5));

        metrics.reset();
        assert!(metrics.indexer("analyze").is_none());
    }

    #[test]
    fn test_report_orders_backends_by_name() {
        let metrics = Metrics::new();
        metrics.record_provider_call("openai", "chat", Duration::from_millis(5), true, None);
        metrics.record_provider_call("ollama", "complete", Duration::from_millis(5), true, None);
        metrics.record_indexer("index_file", Duration::from_millis(1), 13);

        let report = metrics.report();
        let ollama = report.find("  ollama:").unwrap();
        let openai = report.find("  openai:").unwrap();
        assert!(ollama < openai);
        assert!(report.contains("    complete: 1 calls"));
        assert!(report.contains("  index_file: 1 runs, 13 items"));
    }

    #[test]
    fn test_empty_report_has_only_header() {
        assert_eq!(Metrics::new().report(), "=== OpenPilot Metrics ===\n");
    }
}
