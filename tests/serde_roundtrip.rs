//! `serde_json` round-trip checks for the wire-facing command/event/report types
//! (spec §6): encode then decode should reproduce the same logical value.

use std::str::FromStr;

use matchcore::commands::{CommandHeader, OrderList, TradingCommand};
use matchcore::identifiers::{ClientOrderId, InstrumentId, StrategyId, TraderId};
use matchcore::numerics::{Price, Quantity};
use matchcore::order::events::{OrderEvent, OrderEventHeader};
use matchcore::order::{ContingencyType, Order, OrderHeader, OrderKind, Side, TimeInForce};
use matchcore::reports::{ExecutionMassStatus, OrderStatusReport};

fn order_header() -> OrderHeader {
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

fn sample_order() -> Order {
    Order::new(
        order_header(),
        OrderKind::Limit { price: Price::from_str("100.00").unwrap() },
        Side::Buy,
        Quantity::from_str("3").unwrap(),
        TimeInForce::Gtc,
        None,
        false,
        false,
        None,
        ContingencyType::None,
        0,
    )
    .unwrap()
}

fn command_header() -> CommandHeader {
    CommandHeader {
        trader_id: TraderId::new("T-1"),
        strategy_id: StrategyId::new("S-1"),
        instrument_id: InstrumentId::new("EUR/USD", "SIM"),
        client_id: None,
        command_id: uuid::Uuid::nil(),
        ts_init: 0,
    }
}

#[test]
fn submit_order_command_round_trips() {
    let command = TradingCommand::SubmitOrder {
        header: command_header(),
        order: sample_order(),
        position_id: None,
        check_position_exists: false,
    };

    let json = serde_json::to_string(&command).unwrap();
    let decoded: TradingCommand = serde_json::from_str(&json).unwrap();

    match decoded {
        TradingCommand::SubmitOrder { header, order, .. } => {
            assert_eq!(header.trader_id.as_str(), "T-1");
            assert_eq!(order.header.client_order_id.as_str(), "O-1");
            assert_eq!(order.quantity.as_decimal(), rust_decimal::Decimal::from(3));
        }
        other => panic!("expected SubmitOrder, got {other:?}"),
    }
}

#[test]
fn cancel_order_command_round_trips() {
    let command = TradingCommand::CancelOrder {
        header: command_header(),
        client_order_id: ClientOrderId::new("O-1"),
        venue_order_id: None,
    };

    let json = serde_json::to_string(&command).unwrap();
    let decoded: TradingCommand = serde_json::from_str(&json).unwrap();
    assert!(matches!(
        decoded,
        TradingCommand::CancelOrder { client_order_id, .. } if client_order_id.as_str() == "O-1"
    ));
}

#[test]
fn submit_order_list_command_round_trips() {
    let command = TradingCommand::SubmitOrderList {
        header: command_header(),
        list: OrderList {
            order_list_id: matchcore::identifiers::OrderListId::new("L-1"),
            instrument_id: InstrumentId::new("EUR/USD", "SIM"),
            orders: vec![sample_order()],
        },
    };

    let json = serde_json::to_string(&command).unwrap();
    let decoded: TradingCommand = serde_json::from_str(&json).unwrap();
    match decoded {
        TradingCommand::SubmitOrderList { list, .. } => assert_eq!(list.orders.len(), 1),
        other => panic!("expected SubmitOrderList, got {other:?}"),
    }
}

#[test]
fn order_filled_event_round_trips() {
    let event = OrderEvent::OrderFilled {
        header: OrderEventHeader {
            client_order_id: ClientOrderId::new("O-1"),
            instrument_id: InstrumentId::new("EUR/USD", "SIM"),
            trader_id: TraderId::new("T-1"),
            strategy_id: StrategyId::new("S-1"),
            ts_event: 10,
            ts_init: 0,
        },
        trade_id: matchcore::identifiers::TradeId::from(1u64),
        venue_order_id: matchcore::identifiers::VenueOrderId::from(1u64),
        venue_position_id: matchcore::identifiers::PositionId::from(1u64),
        last_qty: Quantity::from_str("3").unwrap(),
        last_px: Price::from_str("100.00").unwrap(),
        commission: matchcore::numerics::Money::zero(matchcore::currency::Currency::usd()),
        liquidity_side: matchcore::order::LiquiditySide::Taker,
    };

    let json = serde_json::to_string(&event).unwrap();
    let decoded: OrderEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, event);
}

#[test]
fn order_status_report_round_trips() {
    let order = sample_order();
    let report = OrderStatusReport::from(&order);

    let json = serde_json::to_string(&report).unwrap();
    let decoded: OrderStatusReport = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded.client_order_id.as_str(), report.client_order_id.as_str());
    assert_eq!(decoded.quantity.as_decimal(), report.quantity.as_decimal());
    assert_eq!(decoded.status, report.status);
}

#[test]
fn execution_mass_status_round_trips_when_empty() {
    let status = ExecutionMassStatus::default();
    let json = serde_json::to_string(&status).unwrap();
    let decoded: ExecutionMassStatus = serde_json::from_str(&json).unwrap();

    assert!(decoded.order_reports.is_empty());
    assert!(decoded.trade_reports.is_empty());
    assert!(decoded.position_reports.is_empty());
}
