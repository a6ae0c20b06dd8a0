//! Per-instrument order book (C3).
//!
//! Two flat ordered sequences of `(price, size)` pairs. Bids are kept
//! sorted descending so the best bid is the first element; asks are kept
//! sorted ascending so the best ask is the first element. `N` is bounded
//! by depth (typically <= 10), so an `O(N)` linear scan for insert/delete
//! is cheap in practice, and keeps the BBO read O(1).

use crate::messages::PriceLevel;

/// Converts source-string price levels to `(price, size)` doubles. An
/// unparseable level is dropped and logged rather than failing the
/// whole batch — the exchange is expected to emit canonical decimal
/// strings, so this only guards against a corrupt upstream.
pub fn parse_levels(levels: &[PriceLevel]) -> Vec<(f64, f64)> {
    let mut parsed = Vec::with_capacity(levels.len());
    for level in levels {
        match (level.price.parse::<f64>(), level.size.parse::<f64>()) {
            (Ok(price), Ok(size)) => parsed.push((price, size)),
            _ => log::warn!(
                "dropping unparseable price level price={:?} size={:?}",
                level.price,
                level.size
            ),
        }
    }
    parsed
}

#[derive(Debug, Default, Clone)]
pub struct OrderBook {
    /// Sorted descending by price: `bids[0]` is the best bid.
    bids: Vec<(f64, f64)>,
    /// Sorted ascending by price: `asks[0]` is the best ask.
    asks: Vec<(f64, f64)>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entire book with a fresh set of levels, e.g. from a
    /// snapshot. Levels with zero size are dropped; callers are expected
    /// to have already sorted `bids`/`asks` by price, but this also
    /// re-sorts defensively so the invariants hold regardless of source
    /// order.
    pub fn replace(&mut self, bids: Vec<(f64, f64)>, asks: Vec<(f64, f64)>) {
        self.bids = bids.into_iter().filter(|&(_, size)| size != 0.0).collect();
        self.asks = asks.into_iter().filter(|&(_, size)| size != 0.0).collect();
        self.bids
            .sort_by(|a, b| b.0.partial_cmp(&a.0).expect("non-NaN price"));
        self.asks
            .sort_by(|a, b| a.0.partial_cmp(&b.0).expect("non-NaN price"));
        dedup_keep_last(&mut self.bids);
        dedup_keep_last(&mut self.asks);
    }

    /// `size == 0.0` removes the level at `price` (no-op if absent).
    /// Otherwise overwrites it in place or inserts it so the descending
    /// ordering invariant holds.
    pub fn update_bid(&mut self, price: f64, size: f64) {
        update_level(&mut self.bids, price, size, true);
    }

    /// `size == 0.0` removes the level at `price` (no-op if absent).
    /// Otherwise overwrites it in place or inserts it so the ascending
    /// ordering invariant holds.
    pub fn update_ask(&mut self, price: f64, size: f64) {
        update_level(&mut self.asks, price, size, false);
    }

    /// Best bid / best ask, or `0.0` for an empty side. Use
    /// [`OrderBook::is_bid_empty`] / [`OrderBook::is_ask_empty`] to
    /// disambiguate a genuinely empty side from a `0.0` price.
    pub fn bbo(&self) -> (f64, f64) {
        (
            self.bids.first().map(|&(p, _)| p).unwrap_or(0.0),
            self.asks.first().map(|&(p, _)| p).unwrap_or(0.0),
        )
    }

    pub fn is_bid_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn is_ask_empty(&self) -> bool {
        self.asks.is_empty()
    }

    /// Invariant check: no duplicate price levels, no zero-size levels,
    /// and (when both sides are non-empty) `best_bid < best_ask`. A
    /// crossed or corrupted book is reported by the caller, not repaired
    /// here.
    pub fn is_consistent(&self) -> bool {
        let no_dupes_or_zero = |levels: &[(f64, f64)]| {
            levels.iter().all(|&(_, size)| size != 0.0)
                && levels.windows(2).all(|w| w[0].0 != w[1].0)
        };
        if !no_dupes_or_zero(&self.bids) || !no_dupes_or_zero(&self.asks) {
            return false;
        }
        match (self.bids.first(), self.asks.first()) {
            (Some(&(bid, _)), Some(&(ask, _))) => bid < ask,
            _ => true,
        }
    }
}

/// Binary search + shift, specialized for ascending (`ascending = false`
/// gives descending, used by bids) ordering.
fn update_level(levels: &mut Vec<(f64, f64)>, price: f64, size: f64, descending: bool) {
    let pos = levels.partition_point(|&(p, _)| {
        if descending {
            p > price
        } else {
            p < price
        }
    });

    let existing = levels.get(pos).filter(|&&(p, _)| p == price).is_some();

    if size == 0.0 {
        if existing {
            levels.remove(pos);
        }
        return;
    }

    if existing {
        levels[pos].1 = size;
    } else {
        levels.insert(pos, (price, size));
    }
}

/// Collapses adjacent equal-price entries, keeping the last write. Only
/// needed after `replace()`'s defensive re-sort, since a legitimate
/// snapshot never carries duplicate levels.
fn dedup_keep_last(levels: &mut Vec<(f64, f64)>) {
    let mut i = 0;
    while i + 1 < levels.len() {
        if levels[i].0 == levels[i + 1].0 {
            levels.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_one_bid_and_ask() {
        let mut ob = OrderBook::new();
        ob.update_bid(100.0, 5.0);
        ob.update_ask(101.0, 3.0);
        assert_eq!(ob.bbo(), (100.0, 101.0));
    }

    #[test]
    fn best_bid_is_highest_price() {
        let mut ob = OrderBook::new();
        ob.update_bid(100.0, 5.0);
        ob.update_bid(101.0, 3.0);
        assert_eq!(ob.bbo().0, 101.0);
    }

    #[test]
    fn best_ask_is_lowest_price() {
        let mut ob = OrderBook::new();
        ob.update_ask(100.0, 5.0);
        ob.update_ask(101.0, 3.0);
        assert_eq!(ob.bbo().1, 100.0);
    }

    #[test]
    fn zero_size_removes_level() {
        let mut ob = OrderBook::new();
        ob.update_bid(100.0, 5.0);
        ob.update_bid(100.0, 0.0);
        assert!(ob.is_bid_empty());
    }

    #[test]
    fn zero_size_for_absent_price_is_noop() {
        let mut ob = OrderBook::new();
        ob.update_bid(100.0, 5.0);
        ob.update_bid(99.0, 0.0);
        assert_eq!(ob.bbo().0, 100.0);
    }

    #[test]
    fn overwrite_existing_level() {
        let mut ob = OrderBook::new();
        ob.update_bid(100.0, 5.0);
        ob.update_bid(100.0, 7.0);
        assert_eq!(ob.bids, vec![(100.0, 7.0)]);
    }

    #[test]
    fn empty_bids_reports_zero() {
        let mut ob = OrderBook::new();
        ob.update_ask(101.0, 3.0);
        assert_eq!(ob.bbo(), (0.0, 101.0));
        assert!(ob.is_bid_empty());
    }

    #[test]
    fn single_level_removal_transitions_to_empty() {
        let mut ob = OrderBook::new();
        ob.update_bid(100.0, 5.0);
        ob.update_bid(100.0, 0.0);
        assert_eq!(ob.bbo(), (0.0, 0.0));
    }

    #[test]
    fn no_epsilon_comparison() {
        let mut ob = OrderBook::new();
        ob.update_bid(100.0, 5.0);
        // Distinct price, must be a distinct level even though close.
        ob.update_bid(100.00000001, 1.0);
        assert_eq!(ob.bids.len(), 2);
    }

    #[test]
    fn replace_rejects_zero_size_and_sorts() {
        let mut ob = OrderBook::new();
        ob.replace(
            vec![(99.0, 1.0), (100.0, 0.0), (101.0, 2.0)],
            vec![(103.0, 1.0), (102.0, 2.0)],
        );
        assert_eq!(ob.bids, vec![(101.0, 2.0), (99.0, 1.0)]);
        assert_eq!(ob.asks, vec![(102.0, 2.0), (103.0, 1.0)]);
    }

    #[test]
    fn consistency_detects_crossed_book() {
        let mut ob = OrderBook::new();
        ob.update_bid(101.0, 1.0);
        ob.update_ask(100.0, 1.0);
        assert!(!ob.is_consistent());
    }
}
