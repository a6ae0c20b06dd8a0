//! Feed engine (C4).
//!
//! Sole owner of per-instrument state. Single consumer: [`FeedEngine::run`]
//! is a blocking loop (the await points are its only suspension) that
//! reads framed payloads from an [`Ingress`](crate::transport::Ingress),
//! normalizes, dispatches, and on a BBO change pushes to an
//! [`Egress`](crate::transport::Egress). No other thread mutates an order
//! book or an instrument's state.

use std::collections::HashMap;

use crate::messages::{BboUpdate, BookDelta, BookSnapshot, ExchangeMessage, Trade};
use crate::metrics::EngineMetrics;
use crate::normalizer;
use crate::orderbook::{self, OrderBook};
use crate::transport::{Egress, Ingress};
use crate::util::now_micros;

/// Per-instrument lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Uninitialized,
    Synced,
    Broken,
}

struct InstrumentState {
    status: Status,
    book: OrderBook,
    last_u: Option<u64>,
    last_bbo: Option<(f64, f64)>,
}

impl Default for InstrumentState {
    fn default() -> Self {
        Self {
            status: Status::Uninitialized,
            book: OrderBook::new(),
            last_u: None,
            last_bbo: None,
        }
    }
}

pub struct FeedEngine {
    books: HashMap<String, InstrumentState>,
    egress: Box<dyn Egress>,
    pub metrics: EngineMetrics,
}

impl FeedEngine {
    pub fn new(egress: Box<dyn Egress>) -> Self {
        Self {
            books: HashMap::new(),
            egress,
            metrics: EngineMetrics::default(),
        }
    }

    /// Runs until `ingress` reports EOF or `max_messages` frames have been
    /// processed, whichever comes first.
    pub async fn run(&mut self, ingress: &mut dyn Ingress, max_messages: Option<usize>) {
        let mut processed = 0usize;
        loop {
            if max_messages.is_some_and(|cap| processed >= cap) {
                log::info!("message cap of {} reached, stopping", max_messages.unwrap());
                return;
            }

            match ingress.recv().await {
                Ok(Some(payload)) => {
                    self.process_frame(&payload).await;
                    processed += 1;
                }
                Ok(None) => {
                    log::info!("ingress closed, feed engine stopping");
                    return;
                }
                Err(e) => {
                    log::error!("ingress read error: {e}");
                    return;
                }
            }
        }
    }

    /// Normalizes and dispatches a single frame. Never panics and never
    /// propagates an error past this boundary: parse failures and
    /// recoverable protocol errors are absorbed and logged here.
    pub async fn process_frame(&mut self, payload: &[u8]) {
        let message = match normalizer::normalize(payload) {
            Ok(message) => message,
            Err(_) => {
                self.metrics
                    .parse_error_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return;
            }
        };

        match message {
            ExchangeMessage::BookSnapshot(snapshot) => {
                self.metrics
                    .snapshot_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.apply_snapshot(snapshot).await;
            }
            ExchangeMessage::BookDelta(delta) => {
                self.metrics
                    .delta_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.apply_delta(delta).await;
            }
            ExchangeMessage::Trade(trade) => {
                self.metrics
                    .trade_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.apply_trade(trade);
            }
            ExchangeMessage::Unknown => {
                self.metrics
                    .unknown_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                log::debug!("dropping unknown message, no-op");
            }
        }
    }

    /// Snapshot always replaces book state and (re)synchronizes the
    /// instrument, regardless of prior status: Uninitialized -> Synced,
    /// Synced -> Synced (replace), Broken -> Synced (recover).
    async fn apply_snapshot(&mut self, snapshot: BookSnapshot) {
        let instrument = snapshot.instrument.clone();
        let bids = orderbook::parse_levels(&snapshot.bids);
        let asks = orderbook::parse_levels(&snapshot.asks);

        let state = self.books.entry(instrument.clone()).or_default();
        state.book.replace(bids, asks);
        state.last_u = Some(snapshot.u);
        state.last_bbo = None;
        state.status = Status::Synced;

        log::info!("{instrument}: snapshot applied at u={}", snapshot.u);
        self.maybe_emit_bbo(&instrument, snapshot.u).await;
    }

    async fn apply_delta(&mut self, delta: BookDelta) {
        let instrument = delta.instrument.clone();
        let state = self.books.entry(instrument.clone()).or_default();

        match state.status {
            Status::Uninitialized => {
                log::error!("{instrument}: delta before snapshot, dropping");
                self.metrics
                    .delta_before_snapshot_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return;
            }
            Status::Broken => {
                // Already reported at the Synced -> Broken transition;
                // every delta until the next snapshot is a silent drop.
                return;
            }
            Status::Synced => {}
        }

        let expected = state.last_u;
        if expected != Some(delta.pu) {
            log::error!(
                "{instrument}: sequence mismatch expected {} got {}",
                expected.map(|u| u.to_string()).unwrap_or_else(|| "none".into()),
                delta.pu
            );
            self.metrics
                .sequence_gap_count
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            state.status = Status::Broken;
            return;
        }

        let bids = orderbook::parse_levels(&delta.bids);
        let asks = orderbook::parse_levels(&delta.asks);
        for (price, size) in bids {
            state.book.update_bid(price, size);
        }
        for (price, size) in asks {
            state.book.update_ask(price, size);
        }
        state.last_u = Some(delta.u);

        self.maybe_emit_bbo(&instrument, delta.u).await;
    }

    fn apply_trade(&mut self, trade: Trade) {
        log::debug!(
            "{}: trade {} passthrough, no book mutation",
            trade.instrument,
            trade.trade_id
        );
    }

    /// Computes the current BBO and, if it changed since the last emission
    /// for this instrument, hands a [`BboUpdate`] to the egress transport.
    /// A transport failure is logged but never rolls back `last_bbo` — the
    /// next genuine change retries emission, not the one that failed.
    async fn maybe_emit_bbo(&mut self, instrument: &str, sequence: u64) {
        let Some(state) = self.books.get_mut(instrument) else {
            return;
        };

        if !state.book.is_consistent() {
            log::error!("{instrument}: order book is inconsistent (crossed or corrupted), reporting without repair");
            self.metrics
                .book_inconsistent_count
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }

        let bbo = state.book.bbo();
        if state.last_bbo == Some(bbo) {
            return;
        }
        state.last_bbo = Some(bbo);

        let update = BboUpdate {
            instrument: instrument.to_string(),
            best_bid: bbo.0,
            best_ask: bbo.1,
            sequence_number: sequence,
            timestamp_micros: now_micros(),
        };

        log::debug!(
            "{instrument}: BBO changed bid={} ask={} u={sequence}",
            bbo.0,
            bbo.1
        );
        self.metrics
            .bbo_emitted_count
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        if let Err(e) = self.egress.send(&update).await {
            log::error!("{instrument}: egress send failed: {e}");
            self.metrics
                .egress_error_count
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockEgress;

    fn engine() -> (FeedEngine, std::sync::Arc<std::sync::Mutex<Vec<BboUpdate>>>) {
        let (egress, sink) = MockEgress::new();
        (FeedEngine::new(Box::new(egress)), sink)
    }

    fn snapshot(instrument: &str, u: u64, bid: &str, ask: &str) -> Vec<u8> {
        format!(
            r#"{{"result":{{"instrument_name":"{instrument}","channel":"book","depth":10,
            "data":[{{"bids":[["{bid}","0.4","3"]],"asks":[["{ask}","0.4","2"]],"t":1,"tt":1,"u":{u}}}]}}}}"#
        )
        .into_bytes()
    }

    fn delta(instrument: &str, u: u64, pu: u64, bids: &str, asks: &str) -> Vec<u8> {
        format!(
            r#"{{"result":{{"instrument_name":"{instrument}","channel":"book.update","depth":10,
            "data":[{{"update":{{"bids":{bids},"asks":{asks}}},"t":1,"tt":1,"u":{u},"pu":{pu}}}]}}}}"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn s1_snapshot_then_valid_delta() {
        let (mut engine, sink) = engine();
        engine
            .process_frame(&snapshot("X", 100, "50113.5", "50126"))
            .await;
        engine
            .process_frame(&delta("X", 101, 100, r#"[["50113.5","0","0"]]"#, "[]"))
            .await;

        let updates = sink.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].best_bid, 50113.5);
        assert_eq!(updates[0].best_ask, 50126.0);
        assert_eq!(updates[1].best_bid, 0.0);
        assert_eq!(updates[1].best_ask, 50126.0);
        assert_eq!(updates[1].sequence_number, 101);
    }

    #[tokio::test]
    async fn s2_sequence_gap_breaks_then_recovers() {
        let (mut engine, sink) = engine();
        engine
            .process_frame(&snapshot("X", 10, "100", "101"))
            .await;
        engine
            .process_frame(&delta("X", 11, 9, "[]", "[]"))
            .await;

        assert_eq!(
            engine
                .metrics
                .sequence_gap_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
        {
            let state = engine.books.get("X").unwrap();
            assert_eq!(state.status, Status::Broken);
            assert_eq!(state.book.bbo(), (100.0, 101.0));
        }
        assert_eq!(sink.lock().unwrap().len(), 1);

        engine
            .process_frame(&snapshot("X", 20, "200", "201"))
            .await;
        assert_eq!(engine.books.get("X").unwrap().status, Status::Synced);
        assert_eq!(sink.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn s3_delta_before_snapshot() {
        let (mut engine, sink) = engine();
        engine.process_frame(&delta("Y", 1, 0, "[]", "[]")).await;

        assert_eq!(
            engine
                .metrics
                .delta_before_snapshot_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
        assert_eq!(
            engine
                .metrics
                .delta_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
        assert!(sink.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn s4_idempotent_bbo_on_unchanged_best() {
        let (mut engine, sink) = engine();
        engine.process_frame(&snapshot("X", 1, "100", "101")).await;
        engine
            .process_frame(&delta("X", 2, 1, r#"[["99","5","1"]]"#, "[]"))
            .await;

        assert_eq!(sink.lock().unwrap().len(), 1, "best bid unchanged at 100");
    }

    #[tokio::test]
    async fn s5_trade_passthrough() {
        let (mut engine, sink) = engine();
        let raw = br#"{"result":{"instrument_name":"X","channel":"trade",
            "data":[{"d":"1","t":1,"p":"100","q":"1","s":"BUY","i":"X"}]}}"#;
        engine.process_frame(raw).await;

        assert_eq!(
            engine
                .metrics
                .trade_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
        assert!(engine.books.get("X").is_none());
        assert!(sink.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn s6_malformed_frame() {
        let (mut engine, sink) = engine();
        engine.process_frame(b"invalid json").await;

        assert_eq!(
            engine
                .metrics
                .parse_error_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
        assert_eq!(engine.metrics.total_frames_ingested(), 0);
        assert!(sink.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_delta_arrays_are_a_noop() {
        let (mut engine, sink) = engine();
        engine.process_frame(&snapshot("X", 1, "100", "101")).await;
        engine.process_frame(&delta("X", 2, 1, "[]", "[]")).await;

        assert_eq!(sink.lock().unwrap().len(), 1);
        assert_eq!(engine.books.get("X").unwrap().book.bbo(), (100.0, 101.0));
    }

    #[tokio::test]
    async fn repeated_snapshot_is_idempotent_in_book_state() {
        let (mut engine, _sink) = engine();
        engine.process_frame(&snapshot("X", 1, "100", "101")).await;
        engine.process_frame(&snapshot("X", 1, "100", "101")).await;

        assert_eq!(engine.books.get("X").unwrap().book.bbo(), (100.0, 101.0));
    }

    #[tokio::test]
    async fn crossed_book_from_a_delta_is_reported() {
        let (mut engine, _sink) = engine();
        engine.process_frame(&snapshot("X", 1, "100", "101")).await;
        // Bid at 102 crosses the resting ask at 101.
        engine
            .process_frame(&delta("X", 2, 1, r#"[["102","1","1"]]"#, "[]"))
            .await;

        assert!(!engine.books.get("X").unwrap().book.is_consistent());
        assert_eq!(
            engine
                .metrics
                .book_inconsistent_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }
}
