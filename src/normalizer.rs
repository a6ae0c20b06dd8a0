//! Normalizer (C2).
//!
//! Parses one JSON document into a typed [`ExchangeMessage`]. Never
//! panics and never lets a parse exception escape its boundary — malformed
//! JSON becomes a [`NormalizeError`], anything else becomes `Unknown`.

use serde_json::Value;

use crate::messages::{BookDelta, BookSnapshot, ExchangeMessage, PriceLevel, Trade, TradeSide};

const PREFIX_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed JSON payload ({len} bytes, starts with {prefix:?})")]
    Parse { len: usize, prefix: String },
}

/// Parses a raw payload into a typed message.
///
/// Classification rule (first match wins):
/// 1. `result.channel == "book"` -> [`ExchangeMessage::BookSnapshot`]
/// 2. `result.channel == "book.update"` -> [`ExchangeMessage::BookDelta`]
/// 3. `result.channel == "trade"` -> [`ExchangeMessage::Trade`]
/// 4. otherwise -> [`ExchangeMessage::Unknown`]
pub fn normalize(payload: &[u8]) -> Result<ExchangeMessage, NormalizeError> {
    let root: Value = serde_json::from_slice(payload).map_err(|_| {
        let prefix: String = String::from_utf8_lossy(payload)
            .chars()
            .take(PREFIX_LEN)
            .collect();
        log::warn!(
            "parse failure: {} byte payload, prefix {:?}",
            payload.len(),
            prefix
        );
        NormalizeError::Parse {
            len: payload.len(),
            prefix,
        }
    })?;

    let Some(channel) = root.pointer("/result/channel").and_then(Value::as_str) else {
        return Ok(ExchangeMessage::Unknown);
    };

    let message = match channel {
        "book" => parse_book_snapshot(&root),
        "book.update" => parse_book_delta(&root),
        "trade" => parse_trades(&root),
        _ => None,
    };

    Ok(message.unwrap_or_else(|| {
        log::warn!("unrecognized or malformed channel {:?}", channel);
        ExchangeMessage::Unknown
    }))
}

fn parse_book_snapshot(root: &Value) -> Option<ExchangeMessage> {
    let instrument = root
        .pointer("/result/instrument_name")
        .and_then(Value::as_str)?
        .to_string();
    let depth = root
        .pointer("/result/depth")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let data = root.pointer("/result/data/0")?;

    let asks = parse_levels(data.get("asks"));
    let bids = parse_levels(data.get("bids"));
    if asks.is_empty() && bids.is_empty() {
        return None;
    }
    let u = data.get("u").and_then(Value::as_u64)?;
    let t = data.get("t").and_then(Value::as_u64).unwrap_or(0);
    let tt = data.get("tt").and_then(Value::as_u64).unwrap_or(0);

    Some(ExchangeMessage::BookSnapshot(BookSnapshot {
        instrument,
        depth,
        asks,
        bids,
        tt,
        t,
        u,
    }))
}

fn parse_book_delta(root: &Value) -> Option<ExchangeMessage> {
    let instrument = root
        .pointer("/result/instrument_name")
        .and_then(Value::as_str)?
        .to_string();
    let depth = root
        .pointer("/result/depth")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let data = root.pointer("/result/data/0")?;

    let asks = parse_levels(data.pointer("/update/asks"));
    let bids = parse_levels(data.pointer("/update/bids"));
    let u = data.get("u").and_then(Value::as_u64)?;
    let pu = data.get("pu").and_then(Value::as_u64)?;
    let t = data.get("t").and_then(Value::as_u64).unwrap_or(0);
    let tt = data.get("tt").and_then(Value::as_u64).unwrap_or(0);

    Some(ExchangeMessage::BookDelta(BookDelta {
        instrument,
        depth,
        asks,
        bids,
        tt,
        t,
        u,
        pu,
    }))
}

fn parse_trades(root: &Value) -> Option<ExchangeMessage> {
    // Only the first trade in the batch becomes the typed message; a
    // frame always carries exactly one logical event in this system.
    let item = root.pointer("/result/data/0")?;

    let instrument = item
        .get("i")
        .and_then(Value::as_str)
        .or_else(|| root.pointer("/result/instrument_name").and_then(Value::as_str))?
        .to_string();
    let trade_id = item.get("d").and_then(Value::as_str)?.to_string();
    let t = item.get("t").and_then(Value::as_u64)?;
    let price = item.get("p").and_then(Value::as_str)?.to_string();
    let size = item.get("q").and_then(Value::as_str)?.to_string();
    let side = match item.get("s").and_then(Value::as_str)? {
        "BUY" => TradeSide::Buy,
        "SELL" => TradeSide::Sell,
        _ => return None,
    };

    Some(ExchangeMessage::Trade(Trade {
        instrument,
        trade_id,
        t,
        price,
        size,
        side,
    }))
}

/// Parses a JSON array of `[price, size, num_orders]` arrays.
///
/// Entries with fewer than three elements are skipped, not fatal — the
/// source strings are preserved verbatim.
fn parse_levels(levels: Option<&Value>) -> Vec<PriceLevel> {
    let Some(levels) = levels.and_then(Value::as_array) else {
        return Vec::new();
    };

    levels
        .iter()
        .filter_map(Value::as_array)
        .filter(|level| level.len() >= 3)
        .filter_map(|level| {
            Some(PriceLevel {
                price: level[0].as_str()?.to_string(),
                size: level[1].as_str()?.to_string(),
                num_orders: level[2].as_str()?.to_string(),
            })
        })
        .collect()
}
