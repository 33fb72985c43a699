//! `OrderEvent` variants applied to an order and published outward (spec §6).

use serde::{Deserialize, Serialize};

use crate::identifiers::{ClientOrderId, InstrumentId, PositionId, StrategyId, TraderId, TradeId, VenueOrderId};
use crate::numerics::{Money, Price, Quantity};
use crate::order::LiquiditySide;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEventHeader {
    pub client_order_id: ClientOrderId,
    pub instrument_id: InstrumentId,
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub ts_event: i64,
    pub ts_init: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OrderEvent {
    OrderInitialized {
        header: OrderEventHeader,
    },
    OrderDenied {
        header: OrderEventHeader,
        reason: String,
    },
    OrderSubmitted {
        header: OrderEventHeader,
    },
    OrderAccepted {
        header: OrderEventHeader,
        venue_order_id: VenueOrderId,
    },
    OrderRejected {
        header: OrderEventHeader,
        reason: String,
    },
    OrderPendingUpdate {
        header: OrderEventHeader,
    },
    OrderPendingCancel {
        header: OrderEventHeader,
    },
    OrderModifyRejected {
        header: OrderEventHeader,
        reason: String,
    },
    OrderCancelRejected {
        header: OrderEventHeader,
        reason: String,
    },
    OrderUpdated {
        header: OrderEventHeader,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
    },
    OrderTriggered {
        header: OrderEventHeader,
    },
    OrderCanceled {
        header: OrderEventHeader,
        reason: String,
    },
    OrderExpired {
        header: OrderEventHeader,
    },
    OrderFilled {
        header: OrderEventHeader,
        trade_id: TradeId,
        venue_order_id: VenueOrderId,
        venue_position_id: PositionId,
        last_qty: Quantity,
        last_px: Price,
        commission: Money,
        liquidity_side: LiquiditySide,
    },
}

impl OrderEvent {
    pub fn header(&self) -> &OrderEventHeader {
        match self {
            OrderEvent::OrderInitialized { header }
            | OrderEvent::OrderDenied { header, .. }
            | OrderEvent::OrderSubmitted { header }
            | OrderEvent::OrderAccepted { header, .. }
            | OrderEvent::OrderRejected { header, .. }
            | OrderEvent::OrderPendingUpdate { header }
            | OrderEvent::OrderPendingCancel { header }
            | OrderEvent::OrderModifyRejected { header, .. }
            | OrderEvent::OrderCancelRejected { header, .. }
            | OrderEvent::OrderUpdated { header, .. }
            | OrderEvent::OrderTriggered { header }
            | OrderEvent::OrderCanceled { header, .. }
            | OrderEvent::OrderExpired { header }
            | OrderEvent::OrderFilled { header, .. } => header,
        }
    }

    pub fn client_order_id(&self) -> &ClientOrderId {
        &self.header().client_order_id
    }
}
