//! TopoSync - the consumer loop tying transport, decoder and dispatcher
//! together.
//!
//! The loop pulls one raw payload at a time, decodes it and dispatches it.
//! Per-event failures (decode errors, rejections, even transport read
//! errors) are counted and skipped; only end-of-feed or a shutdown signal
//! stops the loop. An event already being dispatched when the shutdown
//! signal arrives completes fully, so no partial mutation is ever left
//! behind.

use crate::decoder;
use crate::dispatcher::Dispatcher;
use crate::metrics::MetricsCollector;
use crate::transport::EventTransport;
use crate::types::Decoded;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Totals for one run of the consumer loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Raw payloads pulled from the transport.
    pub received: usize,
    /// Events applied to the store.
    pub applied: usize,
    /// Payloads that failed decoding.
    pub decode_errors: usize,
    /// Events discarded or rejected (stale, tombstone, validation).
    pub discarded: usize,
    /// Non-INFO envelopes passed through.
    pub passthrough: usize,
    /// Transport read errors skipped.
    pub transport_errors: usize,
}

/// The topology event consumer.
pub struct TopoSync {
    dispatcher: Dispatcher,
    metrics: MetricsCollector,
    shutdown: CancellationToken,
}

impl TopoSync {
    /// Creates a consumer around a dispatcher.
    pub fn new(dispatcher: Dispatcher, metrics: MetricsCollector, shutdown: CancellationToken) -> Self {
        TopoSync {
            dispatcher,
            metrics,
            shutdown,
        }
    }

    /// Runs the consumer loop until the feed ends or shutdown is requested.
    pub async fn run<T: EventTransport>(&self, transport: &mut T) -> RunSummary {
        let mut summary = RunSummary::default();
        info!("toposyncd: consuming topology events");

        loop {
            let raw = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("toposyncd: shutdown requested, stopping consumer");
                    break;
                }
                raw = transport.next_message() => raw,
            };

            match raw {
                Ok(Some(payload)) => {
                    // From here the event is handled to completion; the
                    // shutdown signal is only observed again at the top of
                    // the loop.
                    summary.received += 1;
                    self.metrics.events_received_total.inc();
                    self.handle_payload(&payload, &mut summary);
                }
                Ok(None) => {
                    info!("toposyncd: event feed ended");
                    break;
                }
                Err(e) => {
                    // Fatal to this message only; skip and continue.
                    summary.transport_errors += 1;
                    warn!(error = %e, "toposyncd: transport read failed, skipping message");
                }
            }
        }

        info!(
            received = summary.received,
            applied = summary.applied,
            decode_errors = summary.decode_errors,
            discarded = summary.discarded,
            passthrough = summary.passthrough,
            "toposyncd: consumer stopped"
        );
        summary
    }

    fn handle_payload(&self, payload: &[u8], summary: &mut RunSummary) {
        let started = Instant::now();

        match decoder::decode(payload) {
            Ok(Decoded::Event(event)) => {
                let outcome = self.dispatcher.dispatch(&event);
                if matches!(outcome, crate::dispatcher::DispatchOutcome::Applied) {
                    summary.applied += 1;
                } else {
                    summary.discarded += 1;
                }
            }
            Ok(Decoded::Passthrough { envelope_type }) => {
                summary.passthrough += 1;
                self.metrics.passthrough_total.inc();
                debug!(envelope_type, "toposyncd: passing through non-INFO envelope");
            }
            Err(e) => {
                summary.decode_errors += 1;
                self.metrics.decode_errors_total.inc();
                warn!(error = %e, "toposyncd: dropping undecodable payload");
            }
        }

        self.metrics
            .observe_dispatch_latency(started.elapsed().as_secs_f64());
    }
}
