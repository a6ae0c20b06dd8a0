//! Market-data feed processing for a single exchange connection.
//!
//! Two binaries share this library:
//! - `feedprocessing` (`src/main.rs`): binds the ingress socket, runs the
//!   sequencing/BBO engine, pushes changes out the egress socket.
//! - `exchange_connectivity` (`src/bin/exchange_connectivity.rs`): the
//!   external collaborator that terminates the exchange websocket and
//!   feeds raw frames into the ingress socket.
//!
//! Splitting these into separate processes, connected only by the
//! length-prefixed IPC framing in [`transport::ipc`], mirrors the system
//! this crate's feed-processing core was carved out of: the engine
//! never reaches across the process boundary except through that
//! contract.

pub mod config;
pub mod engine;
pub mod exchange;
pub mod messages;
pub mod metrics;
pub mod normalizer;
pub mod orderbook;
pub mod transport;
pub mod util;
