//! Black-box scenarios driving [`FeedEngine`] end-to-end through
//! in-memory transports, one frame at a time through `Ingress::recv`
//! rather than the unit-level `process_frame` shortcut `engine.rs`'s own
//! tests use.

use feedprocessing::engine::FeedEngine;
use feedprocessing::transport::{MockEgress, MockIngress};

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
async fn engine_run_stops_cleanly_on_ingress_eof() {
    let (egress, sink) = MockEgress::new();
    let mut engine = FeedEngine::new(Box::new(egress));
    let mut ingress = MockIngress::new(vec![
        snapshot("BTCUSD-PERP", 1, "50113.5", "50126"),
        delta("BTCUSD-PERP", 2, 1, r#"[["50113.5","0","0"]]"#, "[]"),
    ]);

    engine.run(&mut ingress, None).await;

    let updates = sink.lock().unwrap();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].best_bid, 0.0);
    assert_eq!(
        engine.metrics.total_frames_ingested(),
        2,
        "run() must have consumed every frame up to EOF"
    );
}

#[tokio::test]
async fn engine_run_respects_message_cap() {
    let (egress, sink) = MockEgress::new();
    let mut engine = FeedEngine::new(Box::new(egress));
    let mut ingress = MockIngress::new(vec![
        snapshot("X", 1, "100", "101"),
        snapshot("X", 2, "100", "102"),
        snapshot("X", 3, "100", "103"),
    ]);

    engine.run(&mut ingress, Some(1)).await;

    assert_eq!(engine.metrics.total_frames_ingested(), 1);
    assert_eq!(sink.lock().unwrap().len(), 1, "only the first snapshot's BBO should emit");
}

#[tokio::test]
async fn multi_instrument_streams_stay_independent() {
    let (egress, sink) = MockEgress::new();
    let mut engine = FeedEngine::new(Box::new(egress));
    let mut ingress = MockIngress::new(vec![
        snapshot("BTCUSD-PERP", 1, "50000", "50010"),
        snapshot("ETHUSD-PERP", 1, "3000", "3001"),
        delta("BTCUSD-PERP", 2, 1, r#"[["49999","1","1"]]"#, "[]"),
    ]);

    engine.run(&mut ingress, None).await;

    let updates = sink.lock().unwrap();
    assert_eq!(updates.len(), 2, "ETH delta never arrives, so only the two snapshots and zero BBO-changing deltas emit");
    assert_eq!(updates[0].instrument, "BTCUSD-PERP");
    assert_eq!(updates[1].instrument, "ETHUSD-PERP");
}
