//! `feedprocessing`: the sequencing/BBO engine binary.
//!
//! Binds the ingress socket, runs [`FeedEngine`] until the peer
//! disconnects, pushing every BBO change out the egress socket. See
//! [`feedprocessing`] (the library crate) for how this fits alongside
//! the `exchange_connectivity` binary.

use feedprocessing::config::{self, Config};
use feedprocessing::engine::FeedEngine;
use feedprocessing::transport::ipc::{IpcEgress, IpcIngress};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config: Config = config::load("config.json")?;

    let mut ingress = IpcIngress::bind(&config.ipc.ingress_path)?;
    let egress = IpcEgress::new(&config.ipc.egress_path);
    let mut engine = FeedEngine::new(Box::new(egress));

    let max_messages = config.debug.as_ref().and_then(|d| d.max_messages);
    engine.run(&mut ingress, max_messages).await;

    log::info!(
        "feed engine stopped: frames={} bbo_emitted={} sequence_gaps={}",
        engine.metrics.total_frames_ingested(),
        engine
            .metrics
            .bbo_emitted_count
            .load(std::sync::atomic::Ordering::Relaxed),
        engine
            .metrics
            .sequence_gap_count
            .load(std::sync::atomic::Ordering::Relaxed),
    );
    Ok(())
}
