//! Order data model (spec §3): a shared [`OrderHeader`] plus a tagged [`OrderKind`]
//! replacing a subclass hierarchy (spec §9 Design Notes — "Polymorphic Order").

pub mod events;
pub mod fsm;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult, ValidationError};
use crate::identifiers::{
    AccountId, ClientOrderId, InstrumentId, OrderListId, PositionId, StrategyId, TraderId, TradeId, VenueOrderId,
};
use crate::numerics::{Price, Quantity};
use crate::order::events::{OrderEvent, OrderEventHeader};
use crate::order::fsm::{apply, OrderStatus, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
    Gtd,
    Day,
    AtTheOpen,
    AtTheClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ContingencyType {
    None,
    Oto,
    Oco,
    Ouo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TriggerType {
    Last,
    Bid,
    Ask,
    Mid,
    Mark,
    Index,
    BidAsk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OffsetType {
    Price,
    BasisPoints,
    Ticks,
    PriceTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LiquiditySide {
    NoLiquiditySide,
    Maker,
    Taker,
}

/// Per-variant order parameters, replacing a class hierarchy with a tagged union (spec
/// §9 Design Notes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "order_kind")]
pub enum OrderKind {
    Market,
    Limit {
        price: Price,
    },
    StopMarket {
        trigger_price: Price,
        trigger_type: TriggerType,
    },
    StopLimit {
        price: Price,
        trigger_price: Price,
        trigger_type: TriggerType,
    },
    TrailingStopMarket {
        trigger_price: Price,
        offset: rust_decimal::Decimal,
        offset_type: OffsetType,
        trigger_type: TriggerType,
    },
    TrailingStopLimit {
        price: Price,
        trigger_price: Price,
        offset: rust_decimal::Decimal,
        offset_type: OffsetType,
        trigger_type: TriggerType,
    },
    MarketToLimit {
        price: Option<Price>,
    },
}

impl OrderKind {
    pub fn price(&self) -> Option<Price> {
        match self {
            OrderKind::Limit { price } => Some(*price),
            OrderKind::StopLimit { price, .. } => Some(*price),
            OrderKind::TrailingStopLimit { price, .. } => Some(*price),
            OrderKind::MarketToLimit { price } => *price,
            _ => None,
        }
    }

    pub fn trigger_price(&self) -> Option<Price> {
        match self {
            OrderKind::StopMarket { trigger_price, .. } => Some(*trigger_price),
            OrderKind::StopLimit { trigger_price, .. } => Some(*trigger_price),
            OrderKind::TrailingStopMarket { trigger_price, .. } => Some(*trigger_price),
            OrderKind::TrailingStopLimit { trigger_price, .. } => Some(*trigger_price),
            _ => None,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            OrderKind::StopMarket { .. }
                | OrderKind::StopLimit { .. }
                | OrderKind::TrailingStopMarket { .. }
                | OrderKind::TrailingStopLimit { .. }
        )
    }

    pub fn is_trailing(&self) -> bool {
        matches!(self, OrderKind::TrailingStopMarket { .. } | OrderKind::TrailingStopLimit { .. })
    }
}

/// Routing and contingency fields shared by every order (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHeader {
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub instrument_id: InstrumentId,
    pub strategy_id: StrategyId,
    pub trader_id: TraderId,
    pub account_id: Option<AccountId>,
    pub position_id: Option<PositionId>,
    pub order_list_id: Option<OrderListId>,
    pub parent_order_id: Option<ClientOrderId>,
    pub linked_order_ids: Vec<ClientOrderId>,
}

/// An order, owned through its full life by exactly one matching engine (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub header: OrderHeader,
    pub kind: OrderKind,
    pub side: Side,
    pub quantity: Quantity,
    pub filled_qty: Quantity,
    pub time_in_force: TimeInForce,
    pub expire_time_ns: Option<i64>,
    pub post_only: bool,
    pub reduce_only: bool,
    pub display_qty: Option<Quantity>,
    pub contingency_type: ContingencyType,
    pub status: OrderStatus,
    pub previous_status: Option<OrderStatus>,
    pub events: Vec<OrderEvent>,
    pub trade_ids: Vec<TradeId>,
    pub avg_px: Option<Price>,
    pub slippage: Option<rust_decimal::Decimal>,
    pub liquidity_side: LiquiditySide,
    pub ts_init: i64,
    pub ts_last: i64,
}

impl Order {
    pub fn new(
        header: OrderHeader,
        kind: OrderKind,
        side: Side,
        quantity: Quantity,
        time_in_force: TimeInForce,
        expire_time_ns: Option<i64>,
        post_only: bool,
        reduce_only: bool,
        display_qty: Option<Quantity>,
        contingency_type: ContingencyType,
        ts_init: i64,
    ) -> SimResult<Self> {
        if time_in_force == TimeInForce::Gtd && expire_time_ns.is_none() {
            return Err(SimError::Validation(ValidationError::MissingRequiredField {
                kind: "GTD".to_string(),
                field: "expire_time_ns".to_string(),
            }));
        }
        if let Some(display) = display_qty {
            if display > quantity {
                return Err(SimError::Validation(ValidationError::Other(
                    "display_qty must not exceed quantity".to_string(),
                )));
            }
        }
        let mut order = Self {
            header,
            kind,
            side,
            quantity,
            filled_qty: Quantity::zero(quantity.precision()),
            time_in_force,
            expire_time_ns,
            post_only,
            reduce_only,
            display_qty,
            contingency_type,
            status: OrderStatus::Initialized,
            previous_status: None,
            events: Vec::new(),
            trade_ids: Vec::new(),
            avg_px: None,
            slippage: None,
            liquidity_side: LiquiditySide::NoLiquiditySide,
            ts_init,
            ts_last: ts_init,
        };
        order.push_event(OrderEvent::OrderInitialized { header: order.event_header(ts_init) });
        Ok(order)
    }

    pub fn leaves_qty(&self) -> SimResult<Quantity> {
        self.quantity.checked_sub(self.filled_qty)
    }

    fn event_header(&self, ts_event: i64) -> OrderEventHeader {
        OrderEventHeader {
            client_order_id: self.header.client_order_id.clone(),
            instrument_id: self.header.instrument_id.clone(),
            trader_id: self.header.trader_id.clone(),
            strategy_id: self.header.strategy_id.clone(),
            ts_event,
            ts_init: self.ts_last.max(ts_event),
        }
    }

    fn push_event(&mut self, event: OrderEvent) {
        self.events.push(event);
    }

    fn transition(&mut self, trigger: Trigger) -> SimResult<()> {
        let next = apply(&self.header.client_order_id, self.status, self.previous_status, trigger)?;
        self.previous_status = Some(self.status);
        self.status = next;
        Ok(())
    }

    pub fn submit(&mut self, ts_event: i64) -> SimResult<()> {
        self.transition(Trigger::Submit)?;
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderSubmitted { header: self.event_header(ts_event) });
        Ok(())
    }

    pub fn deny(&mut self, reason: impl Into<String>, ts_event: i64) -> SimResult<()> {
        self.transition(Trigger::Deny)?;
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderDenied { header: self.event_header(ts_event), reason: reason.into() });
        Ok(())
    }

    pub fn accept(&mut self, venue_order_id: VenueOrderId, ts_event: i64) -> SimResult<()> {
        self.transition(Trigger::Accept)?;
        self.header.venue_order_id = Some(venue_order_id);
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderAccepted { header: self.event_header(ts_event), venue_order_id });
        Ok(())
    }

    pub fn reject(&mut self, reason: impl Into<String>, ts_event: i64) -> SimResult<()> {
        self.transition(Trigger::Reject)?;
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderRejected { header: self.event_header(ts_event), reason: reason.into() });
        Ok(())
    }

    pub fn trigger(&mut self, ts_event: i64) -> SimResult<()> {
        self.transition(Trigger::TriggerStop)?;
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderTriggered { header: self.event_header(ts_event) });
        Ok(())
    }

    pub fn cancel(&mut self, reason: impl Into<String>, ts_event: i64) -> SimResult<()> {
        self.transition(Trigger::Cancel)?;
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderCanceled { header: self.event_header(ts_event), reason: reason.into() });
        Ok(())
    }

    pub fn expire(&mut self, ts_event: i64) -> SimResult<()> {
        self.transition(Trigger::Expire)?;
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderExpired { header: self.event_header(ts_event) });
        Ok(())
    }

    /// Applies a single fill, updating `filled_qty`, `avg_px`, and `slippage` (spec
    /// §4.3.4), then transitions the FSM to `PARTIALLY_FILLED` or `FILLED`.
    pub fn apply_fill(
        &mut self,
        trade_id: TradeId,
        venue_order_id: VenueOrderId,
        venue_position_id: PositionId,
        last_qty: Quantity,
        last_px: Price,
        commission: crate::numerics::Money,
        liquidity_side: LiquiditySide,
        ts_event: i64,
    ) -> SimResult<()> {
        let prev_filled = self.filled_qty;
        let new_filled = prev_filled.checked_add(last_qty);
        let weighted = match self.avg_px {
            Some(prev_avg) if !prev_filled.is_zero() => {
                let raw = (prev_avg.raw() * prev_filled.raw() + last_px.raw() * last_qty.raw()) / new_filled.raw();
                Price::from_raw(raw, prev_avg.precision().max(last_px.precision()))?
            }
            _ => last_px,
        };
        self.avg_px = Some(weighted);
        self.filled_qty = new_filled;
        self.liquidity_side = liquidity_side;
        self.trade_ids.push(trade_id);

        let reference = self.kind.price().or_else(|| self.kind.trigger_price()).unwrap_or(weighted);
        self.slippage = Some(match self.side {
            Side::Buy => weighted.as_decimal() - reference.as_decimal(),
            Side::Sell => reference.as_decimal() - weighted.as_decimal(),
        });

        let trigger = if self.filled_qty < self.quantity { Trigger::PartiallyFill } else { Trigger::Fill };
        self.transition(trigger)?;
        self.ts_last = ts_event;
        self.push_event(OrderEvent::OrderFilled {
            header: self.event_header(ts_event),
            trade_id,
            venue_order_id,
            venue_position_id,
            last_qty,
            last_px,
            commission,
            liquidity_side,
        });
        Ok(())
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::InstrumentId;
    use std::str::FromStr;

    fn header() -> OrderHeader {
        OrderHeader {
            client_order_id: ClientOrderId::new("O-1"),
            venue_order_id: None,
            instrument_id: InstrumentId::new("EUR/USD", "SIM"),
            strategy_id: StrategyId::new("S-1"),
            trader_id: TraderId::new("T-1"),
            account_id: None,
            position_id: None,
            order_list_id: None,
            parent_order_id: None,
            linked_order_ids: Vec::new(),
        }
    }

    #[test]
    fn gtd_without_expiry_is_rejected_at_construction() {
        let result = Order::new(
            header(),
            OrderKind::Limit { price: Price::from_str("1.10").unwrap() },
            Side::Buy,
            Quantity::from_str("1").unwrap(),
            TimeInForce::Gtd,
            None,
            false,
            false,
            None,
            ContingencyType::None,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn partial_then_full_fill_computes_weighted_avg_px() {
        let mut order = Order::new(
            header(),
            OrderKind::Limit { price: Price::from_str("100.00").unwrap() },
            Side::Buy,
            Quantity::from_str("10").unwrap(),
            TimeInForce::Gtc,
            None,
            false,
            false,
            None,
            ContingencyType::None,
            0,
        )
        .unwrap();
        order.submit(0).unwrap();
        order.accept(VenueOrderId::from(1u64), 0).unwrap();

        let usd = crate::currency::Currency::usd();
        order
            .apply_fill(
                TradeId::from(1u64),
                VenueOrderId::from(1u64),
                PositionId::from(1u64),
                Quantity::from_str("4").unwrap(),
                Price::from_str("100.00").unwrap(),
                crate::numerics::Money::zero(usd),
                LiquiditySide::Maker,
                1,
            )
            .unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);

        order
            .apply_fill(
                TradeId::from(2u64),
                VenueOrderId::from(1u64),
                PositionId::from(1u64),
                Quantity::from_str("6").unwrap(),
                Price::from_str("100.02").unwrap(),
                crate::numerics::Money::zero(usd),
                LiquiditySide::Maker,
                2,
            )
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.avg_px.unwrap().as_decimal(), rust_decimal::Decimal::from_str("100.012").unwrap());
    }
}
