//! Websocket ingestion (external collaborator).
//!
//! This component terminates TLS, subscribes to `book.<instrument>.<depth>`
//! and `trade.<instrument>` channels, and forwards every text frame it
//! receives into the ingress transport untouched. It carries none of the
//! dispatch/sequencing logic — that lives entirely in [`crate::engine`].
//!
//! Grounded on the teacher's `collector/runner.rs` reconnect loop, with
//! the multi-exchange adapter registry collapsed to a single exchange.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::{Duration, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::metrics::METRICS;

/// Builds the subscription request: one message covering both book and
/// trade channels for every instrument.
pub fn build_subscribe_message(
    instruments: &[String],
    depth: usize,
    book_subscription_type: &str,
    book_update_frequency: Option<u32>,
) -> Value {
    let mut channels = Vec::with_capacity(instruments.len() * 2);
    for instrument in instruments {
        channels.push(format!("book.{instrument}.{depth}"));
        channels.push(format!("trade.{instrument}"));
    }

    let mut params = json!({
        "channels": channels,
        "book_subscription_type": book_subscription_type,
    });
    if let Some(freq) = book_update_frequency {
        params["book_update_frequency"] = json!(freq);
    }

    json!({
        "id": 1,
        "method": "subscribe",
        "params": params,
    })
}

/// Sink for raw frames pulled off the websocket, decoupling the reactor
/// loop below from how a frame ultimately reaches the feed engine (a
/// real ingress socket in production, a `Vec` in tests).
#[async_trait::async_trait]
pub trait FrameSink: Send {
    async fn push(&mut self, payload: Vec<u8>);
}

/// Runs the websocket reactor forever, reconnecting with a fixed backoff
/// on any failure — no exponential backoff or jitter. Every text frame
/// received is forwarded verbatim to `sink`.
pub async fn run(
    ws_url: &str,
    subscribe_msg: Value,
    sink: &mut dyn FrameSink,
) -> anyhow::Result<()> {
    loop {
        match connect_async(ws_url).await {
            Ok((ws, _)) => {
                METRICS
                    .ws_connections_active
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                let (mut write, mut read) = ws.split();

                if write
                    .send(Message::Text(subscribe_msg.to_string().into()))
                    .await
                    .is_err()
                {
                    log::error!("subscribe send failed, retrying in 5s");
                    METRICS
                        .subscription_errors
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                } else {
                    METRICS
                        .subscriptions_sent
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    log::info!("subscribed: {subscribe_msg}");

                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => sink.push(text.as_bytes().to_vec()).await,
                            Ok(_) => {}
                            Err(e) => {
                                log::error!("websocket read error: {e}");
                                break;
                            }
                        }
                    }
                }

                METRICS
                    .ws_connections_active
                    .fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
                METRICS
                    .ws_reconnects
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            Err(e) => {
                log::error!("websocket connect failed: {e}");
            }
        }

        sleep(Duration::from_secs(5)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_message_covers_book_and_trade_channels() {
        let msg = build_subscribe_message(
            &["BTCUSD-PERP".to_string(), "ETHUSD-PERP".to_string()],
            10,
            "SNAPSHOT_AND_UPDATE",
            Some(10),
        );
        let channels = msg["params"]["channels"].as_array().unwrap();
        assert_eq!(
            channels,
            &vec![
                json!("book.BTCUSD-PERP.10"),
                json!("trade.BTCUSD-PERP"),
                json!("book.ETHUSD-PERP.10"),
                json!("trade.ETHUSD-PERP"),
            ]
        );
        assert_eq!(msg["params"]["book_update_frequency"], json!(10));
    }

    #[test]
    fn omitted_update_frequency_is_absent_from_params() {
        let msg = build_subscribe_message(&["X".to_string()], 10, "SNAPSHOT_AND_UPDATE", None);
        assert!(msg["params"].get("book_update_frequency").is_none());
    }
}
