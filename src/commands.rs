//! Inbound `TradingCommand` variants (spec §6), grounded on the teacher's tagged
//! command enum in `gym/trading/action.rs`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifiers::{ClientId, ClientOrderId, InstrumentId, OrderListId, PositionId, StrategyId, TraderId, VenueOrderId};
use crate::numerics::{Price, Quantity};
use crate::order::Order;

/// Fields shared by every inbound command (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandHeader {
    pub trader_id: TraderId,
    pub strategy_id: StrategyId,
    pub instrument_id: InstrumentId,
    pub client_id: Option<ClientId>,
    pub command_id: Uuid,
    pub ts_init: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum TradingCommand {
    SubmitOrder {
        header: CommandHeader,
        order: Order,
        position_id: Option<PositionId>,
        check_position_exists: bool,
    },
    SubmitOrderList {
        header: CommandHeader,
        list: OrderList,
    },
    ModifyOrder {
        header: CommandHeader,
        client_order_id: ClientOrderId,
        venue_order_id: Option<VenueOrderId>,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
    },
    CancelOrder {
        header: CommandHeader,
        client_order_id: ClientOrderId,
        venue_order_id: Option<VenueOrderId>,
    },
    CancelAllOrders {
        header: CommandHeader,
    },
    QueryOrder {
        header: CommandHeader,
        client_order_id: ClientOrderId,
        venue_order_id: Option<VenueOrderId>,
    },
}

impl TradingCommand {
    pub fn header(&self) -> &CommandHeader {
        match self {
            TradingCommand::SubmitOrder { header, .. }
            | TradingCommand::SubmitOrderList { header, .. }
            | TradingCommand::ModifyOrder { header, .. }
            | TradingCommand::CancelOrder { header, .. }
            | TradingCommand::CancelAllOrders { header }
            | TradingCommand::QueryOrder { header, .. } => header,
        }
    }
}

/// A grouped set of orders sharing a `list_id` and instrument, submitted atomically
/// (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderList {
    pub order_list_id: OrderListId,
    pub instrument_id: InstrumentId,
    pub orders: Vec<Order>,
}
