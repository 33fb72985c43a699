//! Market-data event types accepted by the exchange (spec §3/§6): quotes, trades, bars,
//! and order-book deltas/snapshots. Every event carries `(ts_event, ts_init)` with
//! `ts_event <= ts_init` enforced at construction (spec §5).

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult, ValidationError};
use crate::identifiers::{InstrumentId, TradeId};
use crate::numerics::{Price, Quantity};

fn check_event_ordering(ts_event: i64, ts_init: i64) -> SimResult<()> {
    if ts_event > ts_init {
        return Err(SimError::Validation(ValidationError::Other(format!(
            "ts_event ({ts_event}) must be <= ts_init ({ts_init})"
        ))));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AggressorSide {
    Buyer,
    Seller,
    NoAggressor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTick {
    pub instrument_id: InstrumentId,
    pub bid_price: Price,
    pub ask_price: Price,
    pub bid_size: Quantity,
    pub ask_size: Quantity,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl QuoteTick {
    pub fn new(
        instrument_id: InstrumentId,
        bid_price: Price,
        ask_price: Price,
        bid_size: Quantity,
        ask_size: Quantity,
        ts_event: i64,
        ts_init: i64,
    ) -> SimResult<Self> {
        check_event_ordering(ts_event, ts_init)?;
        Ok(Self { instrument_id, bid_price, ask_price, bid_size, ask_size, ts_event, ts_init })
    }

    /// One-decimal-precision-higher mid price (spec §4.1: "except when extracting
    /// mid-prices where a one-digit precision increase is explicit").
    pub fn mid_price(&self) -> Price {
        let mid_raw = (self.bid_price.raw() + self.ask_price.raw()) / 2;
        let precision = (self.bid_price.precision().max(self.ask_price.precision()) + 1).min(9);
        Price::from_raw(mid_raw, precision).unwrap_or(self.bid_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTick {
    pub instrument_id: InstrumentId,
    pub price: Price,
    pub size: Quantity,
    pub aggressor_side: AggressorSide,
    pub trade_id: TradeId,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl TradeTick {
    pub fn new(
        instrument_id: InstrumentId,
        price: Price,
        size: Quantity,
        aggressor_side: AggressorSide,
        trade_id: TradeId,
        ts_event: i64,
        ts_init: i64,
    ) -> SimResult<Self> {
        check_event_ordering(ts_event, ts_init)?;
        Ok(Self { instrument_id, price, size, aggressor_side, trade_id, ts_event, ts_init })
    }
}

/// OHLCV bar (spec §6/GLOSSARY). Used to synthesize a touch sequence for matching when
/// no tick-level data is available (spec §4.3.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub instrument_id: InstrumentId,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl Bar {
    pub fn new(
        instrument_id: InstrumentId,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        ts_event: i64,
        ts_init: i64,
    ) -> SimResult<Self> {
        check_event_ordering(ts_event, ts_init)?;
        Ok(Self { instrument_id, open, high, low, close, volume, ts_event, ts_init })
    }

    /// The controlled sequence of price touches used to drive stop/limit triggering
    /// when only bar data is available (spec §4.3.7): bullish bars touch low before
    /// high, bearish bars touch high before low.
    pub fn touch_sequence(&self) -> Vec<Price> {
        if self.close >= self.open {
            vec![self.open, self.low, self.high, self.close]
        } else {
            vec![self.open, self.high, self.low, self.close]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BookSide {
    Bid,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DeltaAction {
    Add,
    Update,
    Delete,
    Clear,
}

/// A single order-book delta (spec §4.2). `order_id` is only meaningful for L3 books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookDelta {
    pub instrument_id: InstrumentId,
    pub action: DeltaAction,
    pub side: BookSide,
    pub price: Price,
    pub size: Quantity,
    pub order_id: Option<u64>,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl OrderBookDelta {
    pub fn new(
        instrument_id: InstrumentId,
        action: DeltaAction,
        side: BookSide,
        price: Price,
        size: Quantity,
        order_id: Option<u64>,
        ts_event: i64,
        ts_init: i64,
    ) -> SimResult<Self> {
        check_event_ordering(ts_event, ts_init)?;
        Ok(Self { instrument_id, action, side, price, size, order_id, ts_event, ts_init })
    }
}

/// A single price level within an [`OrderBookSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLevel {
    pub price: Price,
    pub size: Quantity,
    pub order_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub instrument_id: InstrumentId,
    pub bids: Vec<SnapshotLevel>,
    pub asks: Vec<SnapshotLevel>,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl OrderBookSnapshot {
    pub fn new(
        instrument_id: InstrumentId,
        bids: Vec<SnapshotLevel>,
        asks: Vec<SnapshotLevel>,
        ts_event: i64,
        ts_init: i64,
    ) -> SimResult<Self> {
        check_event_ordering(ts_event, ts_init)?;
        Ok(Self { instrument_id, bids, asks, ts_event, ts_init })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::InstrumentId;
    use std::str::FromStr;

    #[test]
    fn ts_event_after_ts_init_is_rejected() {
        let result = QuoteTick::new(
            InstrumentId::new("EUR/USD", "SIM"),
            Price::from_str("1.1000").unwrap(),
            Price::from_str("1.1002").unwrap(),
            Quantity::from_str("1000").unwrap(),
            Quantity::from_str("1000").unwrap(),
            10,
            5,
        );
        assert!(result.is_err());
    }

    #[test]
    fn bullish_bar_touches_low_before_high() {
        let bar = Bar::new(
            InstrumentId::new("EUR/USD", "SIM"),
            Price::from_str("1.10").unwrap(),
            Price::from_str("1.12").unwrap(),
            Price::from_str("1.09").unwrap(),
            Price::from_str("1.11").unwrap(),
            Quantity::from_str("100").unwrap(),
            0,
            0,
        )
        .unwrap();
        let sequence = bar.touch_sequence();
        assert_eq!(sequence, vec![bar.open, bar.low, bar.high, bar.close]);
    }
}
