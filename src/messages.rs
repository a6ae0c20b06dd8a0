//! Typed message model (C1).
//!
//! A tagged sum of the message classes the normalizer produces. Variants
//! are constructed only by [`crate::normalizer`] and consumed only by
//! [`crate::engine`] — no other mutation path exists.

/// A single `[price, size, num_orders]` entry from the wire.
///
/// Prices and sizes are kept as source strings until the order book
/// converts them to `f64` at mutation time — this avoids decimal-rounding
/// loss while the value is only being passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevel {
    pub price: String,
    pub size: String,
    pub num_orders: String,
}

/// Full order-book state at a sequence point.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    pub instrument: String,
    pub depth: usize,
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
    /// Epoch millis of the last book update.
    pub tt: u64,
    /// Epoch millis of message publish.
    pub t: u64,
    /// Update sequence number.
    pub u: u64,
}

/// Incremental book change referencing the previous sequence it follows.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDelta {
    pub instrument: String,
    pub depth: usize,
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
    pub tt: u64,
    pub t: u64,
    pub u: u64,
    /// The `u` this delta must follow.
    pub pu: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A single executed match. Does not mutate the resting book.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub instrument: String,
    pub trade_id: String,
    /// Epoch millis.
    pub t: u64,
    pub price: String,
    pub size: String,
    pub side: TradeSide,
}

/// Normalized message handed from C2 to C4.
///
/// `Unknown` is produced for any document that doesn't match the
/// classification rule, or whose required fields are missing; downstream
/// must treat it as a no-op and log it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeMessage {
    BookSnapshot(BookSnapshot),
    BookDelta(BookDelta),
    Trade(Trade),
    Unknown,
}

/// Egress record: a BBO change for one instrument. Logical form; the
/// fixed binary layout that crosses the IPC boundary lives in
/// [`crate::transport::ipc`] — raw-byte layout stays at the transport
/// edge, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct BboUpdate {
    pub instrument: String,
    /// `0.0` if the bid side is empty.
    pub best_bid: f64,
    /// `0.0` if the ask side is empty.
    pub best_ask: f64,
    /// The `u` of the causing message.
    pub sequence_number: u64,
    /// Emission wall clock, microseconds since epoch.
    pub timestamp_micros: u64,
}
