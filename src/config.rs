use serde::Deserialize;

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// This is the top-level configuration structure loaded from
// `config.json`.
//
// It defines:
// - The upstream exchange connection settings
// - The local IPC transport paths
// - Optional debug configuration
//
// Instrument symbols are deliberately not part of this file: they are
// supplied on the command line, so a single config can be reused across
// runs that watch different instruments.
//
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Upstream exchange websocket connection settings
    pub feed: FeedConfig,

    /// Local IPC transport paths
    pub ipc: IpcConfig,

    /// Optional debug configuration
    pub debug: Option<DebugConfig>,
}

// ------------------------------------------------------------
// Feed configuration
// ------------------------------------------------------------
//
// Defines how the websocket ingestion reactor connects to the exchange
// and what it asks to be subscribed to.
//
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Websocket URL of the exchange
    pub url: String,

    /// Orderbook depth requested per instrument (e.g. 10, 20, 50)
    pub depth: usize,

    /// "SNAPSHOT_AND_UPDATE" or "UPDATE_ONLY"
    pub book_subscription_type: String,

    /// Server-side update coalescing interval in milliseconds. Omitted
    /// entirely means the exchange's own default cadence.
    pub book_update_frequency: Option<u32>,
}

// ------------------------------------------------------------
// IPC configuration
// ------------------------------------------------------------
//
// Filesystem paths for the two named Unix domain sockets that bound
// this process: one this process listens on (ingress), one it connects
// out to (egress).
//
#[derive(Debug, Deserialize, Clone)]
pub struct IpcConfig {
    /// Path this process binds and listens on for inbound exchange
    /// message frames.
    pub ingress_path: String,

    /// Path this process connects to in order to push BBO updates.
    pub egress_path: String,
}

// ------------------------------------------------------------
// Debug configuration
// ------------------------------------------------------------
//
// Optional debug flags used during development and testing.
//
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    /// Enables structured debug logging (`log::debug!` verbosity)
    pub log: Option<bool>,

    /// Caps the number of ingested frames before the engine stops on
    /// its own; used for deterministic replay runs, absent in
    /// production configs.
    pub max_messages: Option<usize>,
}

pub fn load(path: &str) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
