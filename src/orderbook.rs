//! Order book: L1/L2/L3 depth representations and delta/snapshot application (spec §4.2).

use std::collections::VecDeque;

use crate::error::{SimError, SimResult, SystemError, ValidationError};
use crate::identifiers::InstrumentId;
use crate::market::{BookSide, DeltaAction, OrderBookDelta, OrderBookSnapshot};
use crate::numerics::{Price, Quantity};
use crate::order::Side;
use crate::sorted_vec_map::SortedVecMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookType {
    /// One level per side (top-of-book only).
    L1Tbbo,
    /// Price-aggregated depth.
    L2Mbp,
    /// Per-order depth, each resting order individually queued.
    L3Mbo,
}

/// A single resting order within an L3 price level, ordered by arrival for price/time
/// priority (spec §4.3.2).
#[derive(Debug, Clone, Copy)]
pub struct BookOrder {
    pub order_id: u64,
    pub size: Quantity,
}

/// One price level: aggregated size, plus (for L3) the ordered queue of individual
/// resting orders whose sizes must sum to `total_size` (spec §4.2 invariant).
#[derive(Debug, Clone)]
pub struct Level {
    pub price: Price,
    pub total_size: Quantity,
    pub orders: VecDeque<BookOrder>,
}

impl Level {
    fn new(price: Price, size: Quantity) -> Self {
        Self { price, total_size: size, orders: VecDeque::new() }
    }

    fn recompute_total(&mut self) {
        let precision = self.total_size.precision();
        self.total_size = self
            .orders
            .iter()
            .fold(Quantity::zero(precision), |acc, o| acc.checked_add(o.size));
    }
}

/// `{instrument_id, book_type, bids, asks}` (spec §3/§4.2). Bids are kept strictly
/// descending by price, asks strictly ascending — both invariants are maintained by
/// [`SortedVecMap`]'s ordering plus the delta/snapshot application logic below.
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub instrument_id: InstrumentId,
    pub book_type: BookType,
    bids: SortedVecMap<PriceKeyDesc, Level>,
    asks: SortedVecMap<PriceKeyAsc, Level>,
}

/// Bid prices sort descending (best bid = highest price first); reverse the natural
/// `Price` ordering so [`SortedVecMap`]'s ascending-key iteration yields bids
/// best-first (spec §4.2: "bids strictly decreasing in price").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PriceKeyDesc(Price);
impl PartialOrd for PriceKeyDesc {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PriceKeyDesc {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.0.cmp(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PriceKeyAsc(Price);

impl OrderBook {
    pub fn new(instrument_id: InstrumentId, book_type: BookType) -> Self {
        Self { instrument_id, book_type, bids: SortedVecMap::new(), asks: SortedVecMap::new() }
    }

    pub fn best_bid(&self) -> Option<&Level> {
        self.bids.iter().next().map(|(_, level)| level)
    }

    pub fn best_ask(&self) -> Option<&Level> {
        self.asks.iter().next().map(|(_, level)| level)
    }

    pub fn best_bid_price(&self) -> Option<Price> {
        self.best_bid().map(|level| level.price)
    }

    pub fn best_ask_price(&self) -> Option<Price> {
        self.best_ask().map(|level| level.price)
    }

    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask_price(), self.best_bid_price()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn volume_at(&self, side: BookSide, price: Price) -> Quantity {
        match side {
            BookSide::Bid => self.bids.get(&PriceKeyDesc(price)).map(|l| l.total_size).unwrap_or(Quantity::zero(price.precision())),
            BookSide::Ask => self.asks.get(&PriceKeyAsc(price)).map(|l| l.total_size).unwrap_or(Quantity::zero(price.precision())),
        }
    }

    /// Returns `true` if the book is crossed: best bid >= best ask (spec §4.2: "If delta
    /// produces a crossed book, matching engine is invoked to resolve").
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid_price(), self.best_ask_price()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    pub fn apply_delta(&mut self, delta: &OrderBookDelta) -> SimResult<()> {
        match delta.action {
            DeltaAction::Clear => {
                self.bids = SortedVecMap::new();
                self.asks = SortedVecMap::new();
            }
            DeltaAction::Add => self.upsert_level(delta.side, delta.price, delta.size, delta.order_id, true)?,
            DeltaAction::Update => self.upsert_level(delta.side, delta.price, delta.size, delta.order_id, false)?,
            DeltaAction::Delete => self.remove(delta.side, delta.price, delta.order_id),
        }
        Ok(())
    }

    fn upsert_level(
        &mut self,
        side: BookSide,
        price: Price,
        size: Quantity,
        order_id: Option<u64>,
        is_add: bool,
    ) -> SimResult<()> {
        match side {
            BookSide::Bid => Self::upsert_generic(&mut self.bids, PriceKeyDesc(price), price, size, order_id, is_add),
            BookSide::Ask => Self::upsert_generic(&mut self.asks, PriceKeyAsc(price), price, size, order_id, is_add),
        }
    }

    fn upsert_generic<K: Ord + Copy>(
        map: &mut SortedVecMap<K, Level>,
        key: K,
        price: Price,
        size: Quantity,
        order_id: Option<u64>,
        is_add: bool,
    ) -> SimResult<()> {
        let level = map.entry(key).or_insert_with(|| Level::new(price, Quantity::zero(size.precision())));
        match order_id {
            Some(id) if is_add => {
                level.orders.push_back(BookOrder { order_id: id, size });
                level.recompute_total();
            }
            Some(id) => {
                if let Some(order) = level.orders.iter_mut().find(|o| o.order_id == id) {
                    order.size = size;
                } else {
                    level.orders.push_back(BookOrder { order_id: id, size });
                }
                level.recompute_total();
            }
            None => level.total_size = size,
        }
        if level.total_size.is_zero() {
            map.remove(&key);
        }
        Ok(())
    }

    fn remove(&mut self, side: BookSide, price: Price, order_id: Option<u64>) {
        match side {
            BookSide::Bid => Self::remove_generic(&mut self.bids, PriceKeyDesc(price), order_id),
            BookSide::Ask => Self::remove_generic(&mut self.asks, PriceKeyAsc(price), order_id),
        }
    }

    fn remove_generic<K: Ord + Copy>(map: &mut SortedVecMap<K, Level>, key: K, order_id: Option<u64>) {
        let Some(level) = map.get_mut(&key) else { return };
        match order_id {
            Some(id) => {
                level.orders.retain(|o| o.order_id != id);
                level.recompute_total();
            }
            None => {
                level.total_size = Quantity::zero(level.total_size.precision());
                level.orders.clear();
            }
        }
        if level.total_size.is_zero() {
            map.remove(&key);
        }
    }

    /// Applies one side of a quote tick's top-of-book (spec §2/§6: `QuoteTick` is a
    /// first-class market-data event). For an `L1Tbbo` book the incoming price/size is
    /// the side's only level, so it replaces the level outright; for `L2Mbp`/`L3Mbo`
    /// books a quote carries no depth beyond the top, so only the current best level is
    /// swapped out and any resting levels below it are left untouched.
    pub fn apply_quote(&mut self, side: BookSide, price: Price, size: Quantity) {
        match side {
            BookSide::Bid => {
                if let Some(key) = self.bids.keys().next().copied() {
                    self.bids.remove(&key);
                }
                self.bids.insert(PriceKeyDesc(price), Level::new(price, size));
            }
            BookSide::Ask => {
                if let Some(key) = self.asks.keys().next().copied() {
                    self.asks.remove(&key);
                }
                self.asks.insert(PriceKeyAsc(price), Level::new(price, size));
            }
        }
    }

    /// Clears then loads from `snapshot` atomically (spec §4.2); raises if the snapshot
    /// itself is crossed, since "no crossed book after `apply_snapshot` completes" is an
    /// invariant that applies to well-formed input.
    pub fn apply_snapshot(&mut self, snapshot: &OrderBookSnapshot) -> SimResult<()> {
        let mut bids = SortedVecMap::new();
        for level in &snapshot.bids {
            let mut l = Level::new(level.price, level.size);
            if let Some(order_id) = level.order_id {
                l.orders.push_back(BookOrder { order_id, size: level.size });
            }
            bids.insert(PriceKeyDesc(level.price), l);
        }
        let mut asks = SortedVecMap::new();
        for level in &snapshot.asks {
            let mut l = Level::new(level.price, level.size);
            if let Some(order_id) = level.order_id {
                l.orders.push_back(BookOrder { order_id, size: level.size });
            }
            asks.insert(PriceKeyAsc(level.price), l);
        }
        self.bids = bids;
        self.asks = asks;
        if self.is_crossed() {
            return Err(SimError::Validation(ValidationError::Other(format!(
                "snapshot for {} is crossed: bid {:?} >= ask {:?}",
                self.instrument_id,
                self.best_bid_price(),
                self.best_ask_price()
            ))));
        }
        Ok(())
    }

    /// Walks the side opposing `taker_side` from the top, consuming up to `max_depth`
    /// levels, returning the `(price, qty)` pairs that would fill `remaining` quantity
    /// (spec §4.2 `simulate_fills`). Does not mutate the book.
    pub fn simulate_fills(&self, taker_side: Side, mut remaining: Quantity, max_depth: usize) -> Vec<(Price, Quantity)> {
        let mut fills = Vec::new();
        let opposing: Box<dyn Iterator<Item = &Level>> = match taker_side {
            Side::Buy => Box::new(self.asks.iter().map(|(_, l)| l)),
            Side::Sell => Box::new(self.bids.iter().map(|(_, l)| l)),
        };
        for (depth, level) in opposing.enumerate() {
            if depth >= max_depth || remaining.is_zero() {
                break;
            }
            let take = remaining.min(level.total_size);
            fills.push((level.price, take));
            remaining = remaining.checked_sub(take).unwrap_or(Quantity::zero(remaining.precision()));
        }
        fills
    }

    /// Removes an individually-tracked L3 order from whichever side/price it rests at;
    /// used by the matching engine on cancel (spec §4.3.6).
    pub fn remove_order(&mut self, side: BookSide, price: Price, order_id: u64) {
        self.remove(side, price, Some(order_id));
    }

    pub fn invariant_check(&self) -> SimResult<()> {
        let mut last: Option<Price> = None;
        for (key, _) in self.bids.iter() {
            if let Some(prev) = last {
                if key.0 >= prev {
                    return Err(SimError::System(SystemError::InvariantViolation(
                        "bids must be strictly descending".to_string(),
                    )));
                }
            }
            last = Some(key.0);
        }
        let mut last: Option<Price> = None;
        for (key, _) in self.asks.iter() {
            if let Some(prev) = last {
                if key.0 <= prev {
                    return Err(SimError::System(SystemError::InvariantViolation(
                        "asks must be strictly ascending".to_string(),
                    )));
                }
            }
            last = Some(key.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn instrument_id() -> InstrumentId {
        InstrumentId::new("EUR/USD", "SIM")
    }

    #[test]
    fn apply_delta_add_then_best_bid_ask() {
        let mut book = OrderBook::new(instrument_id(), BookType::L2Mbp);
        book.apply_delta(&OrderBookDelta::new(
            instrument_id(),
            DeltaAction::Add,
            BookSide::Bid,
            Price::from_str("100.00").unwrap(),
            Quantity::from_str("10").unwrap(),
            None,
            0,
            0,
        ).unwrap()).unwrap();
        book.apply_delta(&OrderBookDelta::new(
            instrument_id(),
            DeltaAction::Add,
            BookSide::Ask,
            Price::from_str("100.02").unwrap(),
            Quantity::from_str("10").unwrap(),
            None,
            0,
            0,
        ).unwrap()).unwrap();
        assert_eq!(book.best_bid_price().unwrap().as_decimal(), rust_decimal::Decimal::from_str("100.00").unwrap());
        assert_eq!(book.best_ask_price().unwrap().as_decimal(), rust_decimal::Decimal::from_str("100.02").unwrap());
        book.invariant_check().unwrap();
    }

    #[test]
    fn simulate_fills_walks_opposing_depth() {
        let mut book = OrderBook::new(instrument_id(), BookType::L2Mbp);
        for (price, size) in [("100.02", "3"), ("100.03", "5")] {
            book.apply_delta(&OrderBookDelta::new(
                instrument_id(),
                DeltaAction::Add,
                BookSide::Ask,
                Price::from_str(price).unwrap(),
                Quantity::from_str(size).unwrap(),
                None,
                0,
                0,
            ).unwrap()).unwrap();
        }
        let fills = book.simulate_fills(Side::Buy, Quantity::from_str("6").unwrap(), 10);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].1.as_decimal(), rust_decimal::Decimal::from_str("3").unwrap());
        assert_eq!(fills[1].1.as_decimal(), rust_decimal::Decimal::from_str("3").unwrap());
    }

    #[test]
    fn crossed_snapshot_is_rejected() {
        let mut book = OrderBook::new(instrument_id(), BookType::L2Mbp);
        let snapshot = OrderBookSnapshot::new(
            instrument_id(),
            vec![crate::market::SnapshotLevel { price: Price::from_str("100.05").unwrap(), size: Quantity::from_str("1").unwrap(), order_id: None }],
            vec![crate::market::SnapshotLevel { price: Price::from_str("100.00").unwrap(), size: Quantity::from_str("1").unwrap(), order_id: None }],
            0,
            0,
        )
        .unwrap();
        assert!(book.apply_snapshot(&snapshot).is_err());
    }
}
