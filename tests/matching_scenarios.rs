//! Integration scenarios against [`matchcore::matching::MatchingEngine`]: resting
//! limits, marketable takers, stop triggers, contingencies, GTD expiry, and FOK depth
//! checks.

use std::str::FromStr;

use matchcore::config::OmsType;
use matchcore::currency::Currency;
use matchcore::exchange::models::{BasisPointCommissionModel, PerfectFillModel};
use matchcore::exchange::IdGenerator;
use matchcore::identifiers::{ClientOrderId, InstrumentId, StrategyId, TraderId};
use matchcore::instrument::Instrument;
use matchcore::market::{AggressorSide, DeltaAction, OrderBookDelta, TradeTick};
use matchcore::matching::MatchingEngine;
use matchcore::numerics::{Price, Quantity};
use matchcore::order::fsm::OrderStatus;
use matchcore::order::{ContingencyType, Order, OrderHeader, OrderKind, Side, TimeInForce, TriggerType};
use matchcore::orderbook::BookType;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn instrument() -> Instrument {
    Instrument {
        instrument_id: InstrumentId::new("EUR/USD", "SIM"),
        price_precision: 2,
        size_precision: 0,
        price_increment: Price::from_str("0.01").unwrap(),
        size_increment: Quantity::from_str("1").unwrap(),
        multiplier: Quantity::from_str("1").unwrap(),
        lot_size: None,
        margin_init: rust_decimal::Decimal::new(3, 2),
        margin_maint: rust_decimal::Decimal::new(3, 2),
        quote_currency: Currency::usd(),
        base_currency: Some(Currency::eur()),
    }
}

fn engine() -> MatchingEngine {
    MatchingEngine::new(instrument(), BookType::L2Mbp, OmsType::Netting, false)
}

fn header(client_order_id: &str) -> OrderHeader {
    OrderHeader {
        client_order_id: ClientOrderId::new(client_order_id),
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

#[allow(clippy::too_many_arguments)]
fn order(
    client_order_id: &str,
    kind: OrderKind,
    side: Side,
    qty: &str,
    tif: TimeInForce,
    expire_time_ns: Option<i64>,
    contingency_type: ContingencyType,
    linked: Vec<ClientOrderId>,
) -> Order {
    let mut h = header(client_order_id);
    h.linked_order_ids = linked;
    Order::new(
        h,
        kind,
        side,
        Quantity::from_str(qty).unwrap(),
        tif,
        expire_time_ns,
        false,
        false,
        None,
        contingency_type,
        0,
    )
    .unwrap()
}

fn seed_ask(engine: &mut MatchingEngine, price: &str, size: &str) {
    let delta = OrderBookDelta::new(
        engine.instrument.instrument_id.clone(),
        DeltaAction::Add,
        matchcore::market::BookSide::Ask,
        Price::from_str(price).unwrap(),
        Quantity::from_str(size).unwrap(),
        None,
        0,
        0,
    )
    .unwrap();
    engine.apply_order_book_delta(&delta).unwrap();
}

fn seed_bid(engine: &mut MatchingEngine, price: &str, size: &str) {
    let delta = OrderBookDelta::new(
        engine.instrument.instrument_id.clone(),
        DeltaAction::Add,
        matchcore::market::BookSide::Bid,
        Price::from_str(price).unwrap(),
        Quantity::from_str(size).unwrap(),
        None,
        0,
        0,
    )
    .unwrap();
    engine.apply_order_book_delta(&delta).unwrap();
}

fn models() -> (PerfectFillModel, BasisPointCommissionModel) {
    (PerfectFillModel, BasisPointCommissionModel { rate_bps: rust_decimal::Decimal::ZERO })
}

#[test]
fn non_marketable_limit_rests_without_filling() {
    let mut engine = engine();
    seed_bid(&mut engine, "100.00", "10");
    seed_ask(&mut engine, "100.02", "10");

    let mut id_gen = IdGenerator::new(1);
    let mut rng = SmallRng::seed_from_u64(1);
    let (fill_model, commission_model) = models();

    let buy = order("O-1", OrderKind::Limit { price: Price::from_str("99.99").unwrap() }, Side::Buy, "3", TimeInForce::Gtc, None, ContingencyType::None, Vec::new());
    let fills = engine.accept_order(buy, &mut id_gen, 0, &fill_model, &commission_model, &mut rng).unwrap();

    assert!(fills.is_empty());
    let resting = engine.order(&ClientOrderId::new("O-1")).unwrap();
    assert_eq!(resting.status, OrderStatus::Accepted);
    assert!(resting.filled_qty.is_zero());
}

#[test]
fn marketable_limit_crosses_and_fills_as_taker() {
    let mut engine = engine();
    seed_ask(&mut engine, "100.02", "5");

    let mut id_gen = IdGenerator::new(2);
    let mut rng = SmallRng::seed_from_u64(2);
    let (fill_model, commission_model) = models();

    let buy = order("O-1", OrderKind::Limit { price: Price::from_str("100.05").unwrap() }, Side::Buy, "3", TimeInForce::Gtc, None, ContingencyType::None, Vec::new());
    let fills = engine.accept_order(buy, &mut id_gen, 0, &fill_model, &commission_model, &mut rng).unwrap();

    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].qty.as_decimal(), rust_decimal::Decimal::from(3));
    assert_eq!(fills[0].price.as_decimal(), rust_decimal::Decimal::from_str("100.02").unwrap());

    let filled = engine.order(&ClientOrderId::new("O-1")).unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);
}

#[test]
fn stop_market_triggers_on_last_trade_then_fills() {
    let mut engine = engine();
    seed_ask(&mut engine, "100.05", "5");

    let mut id_gen = IdGenerator::new(3);
    let mut rng = SmallRng::seed_from_u64(3);
    let (fill_model, commission_model) = models();

    engine.apply_trade_tick(
        &TradeTick::new(
            engine.instrument.instrument_id.clone(),
            Price::from_str("99.50").unwrap(),
            Quantity::from_str("1").unwrap(),
            AggressorSide::Buyer,
            matchcore::identifiers::TradeId::from(0u64),
            0,
            0,
        )
        .unwrap(),
    );

    let stop = order(
        "O-1",
        OrderKind::StopMarket { trigger_price: Price::from_str("100.00").unwrap(), trigger_type: TriggerType::Last },
        Side::Buy,
        "3",
        TimeInForce::Gtc,
        None,
        ContingencyType::None,
        Vec::new(),
    );
    let fills = engine.accept_order(stop, &mut id_gen, 0, &fill_model, &commission_model, &mut rng).unwrap();
    assert!(fills.is_empty());
    assert_eq!(engine.order(&ClientOrderId::new("O-1")).unwrap().status, OrderStatus::Accepted);

    engine.apply_trade_tick(
        &TradeTick::new(engine.instrument.instrument_id.clone(), Price::from_str("100.10").unwrap(), Quantity::from_str("1").unwrap(), AggressorSide::Buyer, matchcore::identifiers::TradeId::from(1u64), 1, 1)
            .unwrap(),
    );

    let fills = engine.run_match_loop(1, &mut id_gen, &fill_model, &commission_model, &mut rng).unwrap();
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].price.as_decimal(), rust_decimal::Decimal::from_str("100.05").unwrap());
    assert_eq!(engine.order(&ClientOrderId::new("O-1")).unwrap().status, OrderStatus::Filled);
}

#[test]
fn oco_pair_one_fill_cancels_the_other() {
    let mut engine = engine();
    seed_ask(&mut engine, "100.02", "5");

    let mut id_gen = IdGenerator::new(4);
    let mut rng = SmallRng::seed_from_u64(4);
    let (fill_model, commission_model) = models();

    let peer_a = ClientOrderId::new("O-A");
    let peer_b = ClientOrderId::new("O-B");

    let taker = order(
        "O-A",
        OrderKind::Limit { price: Price::from_str("100.05").unwrap() },
        Side::Buy,
        "3",
        TimeInForce::Gtc,
        None,
        ContingencyType::Oco,
        vec![peer_b.clone()],
    );
    let resting = order(
        "O-B",
        OrderKind::Limit { price: Price::from_str("99.50").unwrap() },
        Side::Buy,
        "3",
        TimeInForce::Gtc,
        None,
        ContingencyType::Oco,
        vec![peer_a.clone()],
    );

    engine.accept_order(resting, &mut id_gen, 0, &fill_model, &commission_model, &mut rng).unwrap();
    let fills = engine.accept_order(taker, &mut id_gen, 0, &fill_model, &commission_model, &mut rng).unwrap();

    assert_eq!(fills.len(), 1);
    assert_eq!(engine.order(&peer_a).unwrap().status, OrderStatus::Filled);
    assert_eq!(engine.order(&peer_b).unwrap().status, OrderStatus::Canceled);
}

#[test]
fn gtd_order_expires_without_filling() {
    let mut engine = engine();
    seed_ask(&mut engine, "100.05", "5");

    let mut id_gen = IdGenerator::new(5);
    let mut rng = SmallRng::seed_from_u64(5);
    let (fill_model, commission_model) = models();

    let stop = order(
        "O-1",
        OrderKind::StopMarket { trigger_price: Price::from_str("100.00").unwrap(), trigger_type: TriggerType::Last },
        Side::Buy,
        "3",
        TimeInForce::Gtd,
        Some(100),
        ContingencyType::None,
        Vec::new(),
    );
    engine.accept_order(stop, &mut id_gen, 0, &fill_model, &commission_model, &mut rng).unwrap();

    let fills = engine.run_match_loop(200, &mut id_gen, &fill_model, &commission_model, &mut rng).unwrap();
    assert!(fills.is_empty());
    assert_eq!(engine.order(&ClientOrderId::new("O-1")).unwrap().status, OrderStatus::Expired);
}

#[test]
fn fok_order_rejected_on_insufficient_depth() {
    let mut engine = engine();
    seed_ask(&mut engine, "100.02", "2");

    let mut id_gen = IdGenerator::new(6);
    let mut rng = SmallRng::seed_from_u64(6);
    let (fill_model, commission_model) = models();

    let buy = order("O-1", OrderKind::Market, Side::Buy, "5", TimeInForce::Fok, None, ContingencyType::None, Vec::new());
    let fills = engine.accept_order(buy, &mut id_gen, 0, &fill_model, &commission_model, &mut rng).unwrap();

    assert!(fills.is_empty());
    assert_eq!(engine.order(&ClientOrderId::new("O-1")).unwrap().status, OrderStatus::Rejected);
}
