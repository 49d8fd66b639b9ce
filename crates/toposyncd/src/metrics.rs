//! Prometheus metrics collection for toposyncd.
//!
//! Every event is accounted for exactly once: applied, decode error,
//! validation rejection, stale, tombstone conflict or passthrough. No event
//! vanishes without incrementing something here.

use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

/// Global metrics collector for toposyncd.
#[derive(Clone)]
pub struct MetricsCollector {
    // Counters
    pub events_received_total: Counter,
    pub switch_events_applied_total: Counter,
    pub isl_events_applied_total: Counter,
    pub decode_errors_total: Counter,
    pub validation_errors_total: Counter,
    pub stale_events_total: Counter,
    pub tombstone_conflicts_total: Counter,
    pub passthrough_total: Counter,
    pub persistence_failures_total: Counter,
    pub persistence_dropped_total: Counter,

    // Gauges
    pub active_switches: Gauge,
    pub links_total: Gauge,
    pub persistence_queue_depth: Gauge,

    // Histograms
    pub dispatch_latency_seconds: Histogram,

    // Registry for export
    pub registry: Arc<Registry>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_received_total = Counter::with_opts(Opts::new(
            "toposyncd_events_received_total",
            "Total number of raw messages pulled from the transport",
        ))?;
        registry.register(Box::new(events_received_total.clone()))?;

        let switch_events_applied_total = Counter::with_opts(Opts::new(
            "toposyncd_switch_events_applied_total",
            "Total number of switch events applied to the store",
        ))?;
        registry.register(Box::new(switch_events_applied_total.clone()))?;

        let isl_events_applied_total = Counter::with_opts(Opts::new(
            "toposyncd_isl_events_applied_total",
            "Total number of ISL events applied to the store",
        ))?;
        registry.register(Box::new(isl_events_applied_total.clone()))?;

        let decode_errors_total = Counter::with_opts(Opts::new(
            "toposyncd_decode_errors_total",
            "Total number of payloads that failed decoding",
        ))?;
        registry.register(Box::new(decode_errors_total.clone()))?;

        let validation_errors_total = Counter::with_opts(Opts::new(
            "toposyncd_validation_errors_total",
            "Total number of link mutations rejected by validation",
        ))?;
        registry.register(Box::new(validation_errors_total.clone()))?;

        let stale_events_total = Counter::with_opts(Opts::new(
            "toposyncd_stale_events_total",
            "Total number of events discarded as stale",
        ))?;
        registry.register(Box::new(stale_events_total.clone()))?;

        let tombstone_conflicts_total = Counter::with_opts(Opts::new(
            "toposyncd_tombstone_conflicts_total",
            "Total number of events discarded for targeting removed entities",
        ))?;
        registry.register(Box::new(tombstone_conflicts_total.clone()))?;

        let passthrough_total = Counter::with_opts(Opts::new(
            "toposyncd_passthrough_total",
            "Total number of non-INFO envelopes passed through",
        ))?;
        registry.register(Box::new(passthrough_total.clone()))?;

        let persistence_failures_total = Counter::with_opts(Opts::new(
            "toposyncd_persistence_failures_total",
            "Total number of best-effort persistence attempts that failed",
        ))?;
        registry.register(Box::new(persistence_failures_total.clone()))?;

        let persistence_dropped_total = Counter::with_opts(Opts::new(
            "toposyncd_persistence_dropped_total",
            "Total number of applied updates dropped because the persistence queue was full",
        ))?;
        registry.register(Box::new(persistence_dropped_total.clone()))?;

        let active_switches = Gauge::with_opts(Opts::new(
            "toposyncd_active_switches",
            "Current number of non-removed switches in the store",
        ))?;
        registry.register(Box::new(active_switches.clone()))?;

        let links_total = Gauge::with_opts(Opts::new(
            "toposyncd_links_total",
            "Current number of links in the store",
        ))?;
        registry.register(Box::new(links_total.clone()))?;

        let persistence_queue_depth = Gauge::with_opts(Opts::new(
            "toposyncd_persistence_queue_depth",
            "Current depth of the persistence queue",
        ))?;
        registry.register(Box::new(persistence_queue_depth.clone()))?;

        let dispatch_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "toposyncd_dispatch_latency_seconds",
                "Decode-plus-dispatch latency per event in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(dispatch_latency_seconds.clone()))?;

        Ok(Self {
            events_received_total,
            switch_events_applied_total,
            isl_events_applied_total,
            decode_errors_total,
            validation_errors_total,
            stale_events_total,
            tombstone_conflicts_total,
            passthrough_total,
            persistence_failures_total,
            persistence_dropped_total,
            active_switches,
            links_total,
            persistence_queue_depth,
            dispatch_latency_seconds,
            registry: Arc::new(registry),
        })
    }

    /// Update the topology gauges from store counts.
    pub fn set_topology_counts(&self, active_switches: usize, links: usize) {
        self.active_switches.set(active_switches as f64);
        self.links_total.set(links as f64);
    }

    /// Record dispatch latency.
    pub fn observe_dispatch_latency(&self, duration_secs: f64) {
        self.dispatch_latency_seconds.observe(duration_secs);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics collector")
    }
}
