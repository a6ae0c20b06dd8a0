//! `exchange_connectivity`: the websocket reactor binary.
//!
//! The external collaborator spec.md treats as out of scope for
//! correctness testing (§1): terminates TLS, subscribes to the book and
//! trade channels for every instrument given on the command line, and
//! forwards each raw text frame into the `feedprocessing` binary's
//! ingress socket untouched.

use rustls::crypto::{CryptoProvider, ring};

use feedprocessing::config::{self, Config};
use feedprocessing::exchange;
use feedprocessing::transport::ipc::IngressFeeder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    CryptoProvider::install_default(ring::default_provider())
        .expect("failed to install rustls CryptoProvider");

    let config: Config = config::load("config.json")?;

    let instruments: Vec<String> = std::env::args().skip(1).collect();
    if instruments.is_empty() {
        anyhow::bail!("usage: exchange_connectivity <instrument> [instrument...]");
    }
    log::info!("subscribing to instruments: {}", instruments.join(", "));

    let subscribe_msg = exchange::build_subscribe_message(
        &instruments,
        config.feed.depth,
        &config.feed.book_subscription_type,
        config.feed.book_update_frequency,
    );

    let mut feeder = IngressFeeder::new(&config.ipc.ingress_path);
    let ws_url = config.feed.url.clone();

    exchange::run(&ws_url, subscribe_msg, &mut feeder).await
}
