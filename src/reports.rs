//! Outbound report value types (spec §2.8/§6), grounded on the teacher's
//! `blotter()`/`transcript()` flattening builders in `gym/flow/ledger.rs` — same
//! "flatten live+archive state into a report" shape, minus the tabular `DataFrame`
//! output since spec §6 only asks for `to_dict`/`from_dict`.

use serde::{Deserialize, Serialize};

use crate::account::Position;
use crate::identifiers::{ClientOrderId, InstrumentId, PositionId, TradeId, VenueOrderId};
use crate::numerics::{Price, Quantity};
use crate::order::fsm::OrderStatus;
use crate::order::{Order, Side};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub client_order_id: ClientOrderId,
    pub venue_order_id: Option<VenueOrderId>,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub status: OrderStatus,
    pub quantity: Quantity,
    pub filled_qty: Quantity,
    pub avg_px: Option<Price>,
    pub ts_last: i64,
}

impl From<&Order> for OrderStatusReport {
    fn from(order: &Order) -> Self {
        Self {
            client_order_id: order.header.client_order_id.clone(),
            venue_order_id: order.header.venue_order_id,
            instrument_id: order.header.instrument_id.clone(),
            side: order.side,
            status: order.status,
            quantity: order.quantity,
            filled_qty: order.filled_qty,
            avg_px: order.avg_px,
            ts_last: order.ts_last,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeReport {
    pub trade_id: TradeId,
    pub client_order_id: ClientOrderId,
    pub venue_order_id: VenueOrderId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub last_qty: Quantity,
    pub last_px: Price,
    pub ts_event: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionStatusReport {
    pub position_id: PositionId,
    pub instrument_id: InstrumentId,
    pub side: crate::account::PositionSide,
    pub net_qty: rust_decimal::Decimal,
    pub avg_open_px: Option<Price>,
    pub realized_pnl: rust_decimal::Decimal,
    pub ts_last: i64,
}

impl From<&Position> for PositionStatusReport {
    fn from(position: &Position) -> Self {
        Self {
            position_id: position.id,
            instrument_id: position.instrument_id.clone(),
            side: position.side,
            net_qty: position.net_qty,
            avg_open_px: position.avg_open_px,
            realized_pnl: position.realized_pnl,
            ts_last: position.ts_last,
        }
    }
}

/// A reconciliation snapshot flattening every live order/position/trade known to the
/// exchange into one queryable report (spec §6), grounded on the teacher's
/// `blotter()`/`transcript()` DataFrame builders.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionMassStatus {
    pub order_reports: Vec<OrderStatusReport>,
    pub trade_reports: Vec<TradeReport>,
    pub position_reports: Vec<PositionStatusReport>,
}

impl ExecutionMassStatus {
    /// Builds a mass status snapshot from live order and position state, flattening the
    /// per-order trade history into individual `TradeReport`s.
    pub fn from_cache<'a>(
        orders: impl Iterator<Item = &'a Order>,
        positions: impl Iterator<Item = &'a Position>,
    ) -> Self {
        let mut order_reports = Vec::new();
        let mut trade_reports = Vec::new();
        for order in orders {
            order_reports.push(OrderStatusReport::from(order));
            for event in &order.events {
                if let crate::order::events::OrderEvent::OrderFilled {
                    header,
                    trade_id,
                    venue_order_id,
                    last_qty,
                    last_px,
                    ..
                } = event
                {
                    trade_reports.push(TradeReport {
                        trade_id: *trade_id,
                        client_order_id: header.client_order_id.clone(),
                        venue_order_id: *venue_order_id,
                        instrument_id: header.instrument_id.clone(),
                        side: order.side,
                        last_qty: *last_qty,
                        last_px: *last_px,
                        ts_event: header.ts_event,
                    });
                }
            }
        }
        let position_reports = positions.map(PositionStatusReport::from).collect();
        Self { order_reports, trade_reports, position_reports }
    }
}
