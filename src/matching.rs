//! Per-instrument matching engine (spec §4.3): order acceptance, price/time priority,
//! the match loop, fill generation, contingencies, and bar-driven synthetic touches.

use std::collections::HashMap;

use rand::rngs::SmallRng;

use crate::account::PositionSide;
use crate::config::OmsType;
use crate::error::{NotFoundError, RejectError, SimError, SimResult, ValidationError};
use crate::exchange::models::{CommissionModel, FillModel};
use crate::exchange::IdGenerator;
use crate::identifiers::{ClientOrderId, PositionId, StrategyId, TradeId, VenueOrderId};
use crate::instrument::Instrument;
use crate::market::{Bar, BookSide, OrderBookDelta, OrderBookSnapshot, QuoteTick, TradeTick};
use crate::numerics::{Money, Price, Quantity};
use crate::order::fsm::OrderStatus;
use crate::order::{ContingencyType, Order, OrderKind, Side, TimeInForce, TriggerType};
use crate::orderbook::{BookType, OrderBook};

/// One fill produced by the match loop, handed back to the exchange so it can update
/// the account/position books (spec §4.3.4/§4.5) — the engine itself owns no account
/// state (spec §4.4: "Owns: ... account").
#[derive(Debug, Clone)]
pub struct Fill {
    pub trade_id: TradeId,
    pub client_order_id: ClientOrderId,
    pub venue_order_id: VenueOrderId,
    pub position_id: PositionId,
    pub side: Side,
    pub qty: Quantity,
    pub price: Price,
    pub commission: Money,
    pub liquidity_side: crate::order::LiquiditySide,
    pub ts_event: i64,
}

/// Maps a strategy's position key to a venue position id, honoring OMS type (spec
/// §4.3.4: "NETTING, derive from (instrument, strategy); HEDGING, generate fresh
/// per-order").
fn resolve_position_key(oms_type: OmsType, order: &Order) -> String {
    match oms_type {
        OmsType::Netting => format!("{}:{}", order.header.instrument_id, order.header.strategy_id),
        OmsType::Hedging => order.header.client_order_id.to_string(),
    }
}

/// Per-instrument matching engine. Resting LIMIT orders are represented directly as L3
/// entries in `book` (their own order placed onto the same depth the market-data feed
/// populates) — this merges the spec's `orders_bid`/`orders_ask` price/time-priority
/// queues into the book's own per-level FIFO queues rather than duplicating them, since
/// an L3 book already gives exactly that ordering.
#[derive(Debug)]
pub struct MatchingEngine {
    pub instrument: Instrument,
    pub book: OrderBook,
    order_index: HashMap<ClientOrderId, Order>,
    /// Reverse lookup from the book's raw `order_id: u64` (a `VenueOrderId`) back to the
    /// owning order, so a book-level walk can reach full order state.
    venue_index: HashMap<u64, ClientOrderId>,
    /// `parent_id -> [child_ids]` for OTO contingency trees (spec §4.3/§4.3.5).
    oto_orders: HashMap<ClientOrderId, Vec<ClientOrderId>>,
    /// Pending (not yet triggered) STOP_* / TRAILING_STOP_* orders.
    pending_stops: Vec<ClientOrderId>,
    /// Per-trailing-order extreme seen so far (min low for BUY, max high for SELL).
    trailing_extremes: HashMap<ClientOrderId, Price>,
    last_trade_price: Option<Price>,
    position_ids: HashMap<String, PositionId>,
    oms_type: OmsType,
    reject_stop_orders_when_marketable: bool,
}

impl MatchingEngine {
    pub fn new(instrument: Instrument, book_type: BookType, oms_type: OmsType, reject_stop_orders_when_marketable: bool) -> Self {
        let book = OrderBook::new(instrument.instrument_id.clone(), book_type);
        Self {
            instrument,
            book,
            order_index: HashMap::new(),
            venue_index: HashMap::new(),
            oto_orders: HashMap::new(),
            pending_stops: Vec::new(),
            trailing_extremes: HashMap::new(),
            last_trade_price: None,
            position_ids: HashMap::new(),
            oms_type,
            reject_stop_orders_when_marketable,
        }
    }

    pub fn order(&self, client_order_id: &ClientOrderId) -> Option<&Order> {
        self.order_index.get(client_order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.order_index.values()
    }

    fn reference_price(&self, trigger_type: TriggerType, side: Side) -> Option<Price> {
        match trigger_type {
            TriggerType::Last => self.last_trade_price,
            TriggerType::Bid | TriggerType::BidAsk if side == Side::Sell => self.book.best_bid_price(),
            TriggerType::Ask | TriggerType::BidAsk if side == Side::Buy => self.book.best_ask_price(),
            TriggerType::Bid => self.book.best_bid_price(),
            TriggerType::Ask => self.book.best_ask_price(),
            TriggerType::Mid | TriggerType::Mark | TriggerType::Index => {
                match (self.book.best_bid_price(), self.book.best_ask_price()) {
                    (Some(bid), Some(ask)) => Some(Price::from_raw((bid.raw() + ask.raw()) / 2, bid.precision()).unwrap_or(bid)),
                    _ => self.last_trade_price,
                }
            }
        }
    }

    fn is_triggered(&self, side: Side, trigger_price: Price, reference: Price) -> bool {
        match side {
            Side::Buy => reference >= trigger_price,
            Side::Sell => reference <= trigger_price,
        }
    }

    fn is_marketable_limit(&self, side: Side, limit_price: Price) -> bool {
        match side {
            Side::Buy => self.book.best_ask_price().is_some_and(|ask| limit_price >= ask),
            Side::Sell => self.book.best_bid_price().is_some_and(|bid| limit_price <= bid),
        }
    }

    fn position_id_for(&mut self, order: &Order, id_gen: &mut IdGenerator) -> PositionId {
        let key = resolve_position_key(self.oms_type, order);
        if let Some(id) = self.position_ids.get(&key) {
            return *id;
        }
        let id = id_gen.next_position_id();
        self.position_ids.insert(key, id);
        id
    }

    fn rest_limit(&mut self, order: &Order) {
        let venue_order_id = order.header.venue_order_id.expect("order must be accepted before resting");
        let price = order.kind.price().expect("only LIMIT-priced orders rest on the book");
        let leaves = order.leaves_qty().unwrap_or(Quantity::zero(order.quantity.precision()));
        let side = match order.side {
            Side::Buy => BookSide::Bid,
            Side::Sell => BookSide::Ask,
        };
        let delta = OrderBookDelta::new(
            self.instrument.instrument_id.clone(),
            crate::market::DeltaAction::Add,
            side,
            price,
            leaves,
            Some(u64::from(venue_order_id)),
            order.ts_last,
            order.ts_last,
        )
        .expect("constructed delta always satisfies ts_event <= ts_init");
        let _ = self.book.apply_delta(&delta);
        self.venue_index.insert(u64::from(venue_order_id), order.header.client_order_id.clone());
    }

    fn unrest(&mut self, order: &Order) {
        let Some(venue_order_id) = order.header.venue_order_id else { return };
        let Some(price) = order.kind.price() else { return };
        let side = match order.side {
            Side::Buy => BookSide::Bid,
            Side::Sell => BookSide::Ask,
        };
        self.book.remove_order(side, price, u64::from(venue_order_id));
        self.venue_index.remove(&u64::from(venue_order_id));
    }

    /// Parks an OTO child order: held in `order_index` without entering the book until
    /// its parent fills (spec §4.3.5), at which point [`Self::apply_contingencies`]
    /// removes and submits it through the normal [`Self::accept_order`] path.
    pub fn park_child(&mut self, parent_id: ClientOrderId, child: Order) {
        self.oto_orders.entry(parent_id).or_default().push(child.header.client_order_id.clone());
        self.order_index.insert(child.header.client_order_id.clone(), child);
    }

    /// Accepts a newly submitted order onto the engine (spec §4.3.1). Returns any fills
    /// produced immediately (market / marketable limit taking).
    pub fn accept_order(
        &mut self,
        mut order: Order,
        id_gen: &mut IdGenerator,
        now_ns: i64,
        fill_model: &dyn FillModel,
        commission_model: &dyn CommissionModel,
        rng: &mut SmallRng,
    ) -> SimResult<Vec<Fill>> {
        if !self.instrument.is_quantity_on_increment(order.quantity) {
            return Err(SimError::Validation(ValidationError::QuantityNotOnIncrement(
                order.quantity.to_string(),
                self.instrument.size_increment.to_string(),
            )));
        }
        order.submit(now_ns)?;

        let venue_order_id = id_gen.next_venue_order_id();

        match order.kind.clone() {
            OrderKind::Market => {
                order.accept(venue_order_id, now_ns)?;
                self.insert_and_drain(order, id_gen, now_ns, fill_model, commission_model, rng)
            }
            OrderKind::Limit { price } => {
                if !self.instrument.is_price_on_increment(price) {
                    return Err(SimError::Validation(ValidationError::PriceNotOnIncrement(
                        price.to_string(),
                        self.instrument.price_increment.to_string(),
                    )));
                }
                let marketable = self.is_marketable_limit(order.side, price);
                if marketable && order.post_only {
                    order.accept(venue_order_id, now_ns)?;
                    let client_order_id = order.header.client_order_id.clone();
                    tracing::warn!(%client_order_id, reason = "post_only_would_cross", "Order rejected");
                    order.reject("post-only order would have crossed the book", now_ns)?;
                    self.order_index.insert(client_order_id, order);
                    return Ok(Vec::new());
                }
                order.accept(venue_order_id, now_ns)?;
                if marketable {
                    self.insert_and_drain(order, id_gen, now_ns, fill_model, commission_model, rng)
                } else {
                    self.rest_limit(&order);
                    self.order_index.insert(order.header.client_order_id.clone(), order);
                    Ok(Vec::new())
                }
            }
            OrderKind::MarketToLimit { .. } => {
                order.accept(venue_order_id, now_ns)?;
                self.insert_and_drain(order, id_gen, now_ns, fill_model, commission_model, rng)
            }
            OrderKind::StopMarket { trigger_price, trigger_type }
            | OrderKind::StopLimit { trigger_price, trigger_type, .. } => {
                let reference = self.reference_price(trigger_type, order.side);
                let already_triggered = reference.is_some_and(|r| self.is_triggered(order.side, trigger_price, r));
                if already_triggered && self.reject_stop_orders_when_marketable {
                    order.accept(venue_order_id, now_ns)?;
                    let client_order_id = order.header.client_order_id.clone();
                    tracing::warn!(%client_order_id, reason = "stop_already_marketable", "Order rejected");
                    order.reject("stop order is already marketable on submission", now_ns)?;
                    self.order_index.insert(client_order_id, order);
                    return Ok(Vec::new());
                }
                order.accept(venue_order_id, now_ns)?;
                if already_triggered {
                    order.trigger(now_ns)?;
                    return self.match_triggered_stop(order, id_gen, now_ns, fill_model, commission_model, rng);
                }
                self.pending_stops.push(order.header.client_order_id.clone());
                self.order_index.insert(order.header.client_order_id.clone(), order);
                Ok(Vec::new())
            }
            OrderKind::TrailingStopMarket { trigger_price, .. } | OrderKind::TrailingStopLimit { trigger_price, .. } => {
                order.accept(venue_order_id, now_ns)?;
                self.trailing_extremes.insert(order.header.client_order_id.clone(), trigger_price);
                self.pending_stops.push(order.header.client_order_id.clone());
                self.order_index.insert(order.header.client_order_id.clone(), order);
                Ok(Vec::new())
            }
        }
    }

    /// A stop order has just triggered: STOP_MARKET takes the market-order path,
    /// STOP_LIMIT becomes a LIMIT at its `price` (spec §4.3.3 step 1).
    fn match_triggered_stop(
        &mut self,
        order: Order,
        id_gen: &mut IdGenerator,
        now_ns: i64,
        fill_model: &dyn FillModel,
        commission_model: &dyn CommissionModel,
        rng: &mut SmallRng,
    ) -> SimResult<Vec<Fill>> {
        match &order.kind {
            OrderKind::StopMarket { .. } => self.insert_and_drain(order, id_gen, now_ns, fill_model, commission_model, rng),
            OrderKind::StopLimit { price, .. } => {
                let marketable = self.is_marketable_limit(order.side, *price);
                if marketable {
                    self.insert_and_drain(order, id_gen, now_ns, fill_model, commission_model, rng)
                } else {
                    self.rest_limit(&order);
                    self.order_index.insert(order.header.client_order_id.clone(), order);
                    Ok(Vec::new())
                }
            }
            _ => unreachable!("only STOP_MARKET/STOP_LIMIT trigger through this path"),
        }
    }

    /// Drains an aggressive (MARKET or marketable LIMIT) order against the opposing
    /// side of the book, honoring time-in-force semantics (spec §4.3.3 steps 4-5).
    fn insert_and_drain(
        &mut self,
        mut order: Order,
        id_gen: &mut IdGenerator,
        now_ns: i64,
        fill_model: &dyn FillModel,
        commission_model: &dyn CommissionModel,
        rng: &mut SmallRng,
    ) -> SimResult<Vec<Fill>> {
        let client_order_id = order.header.client_order_id.clone();
        let leaves = order.leaves_qty()?;

        if order.time_in_force == TimeInForce::Fok {
            let depth = self.book.simulate_fills(order.side, leaves, usize::MAX);
            let available: Quantity = depth
                .iter()
                .fold(Quantity::zero(leaves.precision()), |acc, (_, q)| acc.checked_add(*q));
            if available < leaves {
                tracing::warn!(%client_order_id, reason = "fok_insufficient_depth", "Order rejected");
                order.reject("insufficient depth", now_ns)?;
                self.order_index.insert(client_order_id, order);
                return Ok(Vec::new());
            }
        }

        let touches = self.book.simulate_fills(order.side, leaves, usize::MAX);
        let position_id = self.position_id_for(&order, id_gen);
        let mut fills = Vec::new();

        for (level_price, level_qty) in touches {
            let remaining = order.leaves_qty()?;
            if remaining.is_zero() {
                break;
            }
            let candidate_qty = remaining.min(level_qty);
            let Some(adjustment) = fill_model.adjust_fill(&self.instrument, order.side, candidate_qty, level_price, rng) else {
                continue;
            };
            let trade_id = id_gen.next_trade_id();
            let venue_order_id = order.header.venue_order_id.expect("order accepted before draining");
            let commission = commission_model.commission(&self.instrument, adjustment.qty, adjustment.price, crate::order::LiquiditySide::Taker);

            order.apply_fill(trade_id, venue_order_id, position_id, adjustment.qty, adjustment.price, commission, crate::order::LiquiditySide::Taker, now_ns)?;
            self.consume_book_liquidity(order.side, level_price, adjustment.qty);
            self.last_trade_price = Some(adjustment.price);

            fills.push(Fill {
                trade_id,
                client_order_id: client_order_id.clone(),
                venue_order_id,
                position_id,
                side: order.side,
                qty: adjustment.qty,
                price: adjustment.price,
                commission,
                liquidity_side: crate::order::LiquiditySide::Taker,
                ts_event: now_ns,
            });
        }

        let leaves_after = order.leaves_qty()?;
        if !leaves_after.is_zero() {
            if order.time_in_force == TimeInForce::Ioc || order.time_in_force == TimeInForce::Fok {
                order.cancel("time in force expired with leaves remaining", now_ns)?;
            } else if matches!(order.kind, OrderKind::Limit { .. } | OrderKind::StopLimit { .. } | OrderKind::TrailingStopLimit { .. }) {
                self.rest_limit(&order);
            }
        }

        self.order_index.insert(client_order_id.clone(), order);
        self.apply_contingencies(&client_order_id, now_ns, id_gen, fill_model, commission_model, rng)?;
        Ok(fills)
    }

    /// Removes `qty` from the opposing side's best level, walking each maker order's
    /// individual resting quantity FIFO within that level — this is a simplified
    /// venue-side liquidity consumption; makers resting at that level are not otherwise
    /// tracked as independent fills here since the engine's own resting LIMIT orders are
    /// matched through [`Self::match_loop`] instead.
    fn consume_book_liquidity(&mut self, taker_side: Side, price: Price, qty: Quantity) {
        let side = match taker_side {
            Side::Buy => BookSide::Ask,
            Side::Sell => BookSide::Bid,
        };
        let delta = OrderBookDelta::new(
            self.instrument.instrument_id.clone(),
            crate::market::DeltaAction::Update,
            side,
            price,
            self.book.volume_at(side, price).checked_sub(qty).unwrap_or(Quantity::zero(qty.precision())),
            None,
            0,
            0,
        );
        if let Ok(delta) = delta {
            let _ = self.book.apply_delta(&delta);
        }
    }

    /// Steps 1-2 of the match loop: evaluates pending stop/trailing triggers and GTD
    /// expiry against the current reference price (spec §4.3.3).
    pub fn run_match_loop(
        &mut self,
        now_ns: i64,
        id_gen: &mut IdGenerator,
        fill_model: &dyn FillModel,
        commission_model: &dyn CommissionModel,
        rng: &mut SmallRng,
    ) -> SimResult<Vec<Fill>> {
        let mut fills = Vec::new();
        let mut still_pending = Vec::new();

        for client_order_id in std::mem::take(&mut self.pending_stops) {
            let Some(order) = self.order_index.get(&client_order_id) else { continue };
            if order.status.is_terminal() {
                continue;
            }
            if let Some(expire_ns) = order.expire_time_ns {
                if order.time_in_force == TimeInForce::Gtd && expire_ns <= now_ns {
                    let mut order = self.order_index.remove(&client_order_id).unwrap();
                    order.expire(now_ns)?;
                    self.order_index.insert(client_order_id, order);
                    continue;
                }
            }

            if order.kind.is_trailing() {
                self.update_trailing_trigger(&client_order_id, now_ns)?;
            }

            let order = self.order_index.get(&client_order_id).unwrap();
            let trigger_type = match &order.kind {
                OrderKind::StopMarket { trigger_type, .. }
                | OrderKind::StopLimit { trigger_type, .. }
                | OrderKind::TrailingStopMarket { trigger_type, .. }
                | OrderKind::TrailingStopLimit { trigger_type, .. } => *trigger_type,
                _ => unreachable!("only stop-kind orders are queued in pending_stops"),
            };
            let trigger_price = order.kind.trigger_price().expect("stop-kind orders always carry a trigger price");
            let side = order.side;

            let triggered = self
                .reference_price(trigger_type, side)
                .is_some_and(|reference| self.is_triggered(side, trigger_price, reference));

            if triggered {
                let mut order = self.order_index.remove(&client_order_id).unwrap();
                order.trigger(now_ns)?;
                let triggered_fills = self.match_triggered_stop(order, id_gen, now_ns, fill_model, commission_model, rng)?;
                fills.extend(triggered_fills);
            } else {
                still_pending.push(client_order_id);
            }
        }
        self.pending_stops = still_pending;

        // Step 3: walk resting limit orders whose price now crosses the opposing top of
        // book (e.g. the top of book moved due to an external market-data update).
        fills.extend(self.sweep_resting_limits(now_ns, id_gen, fill_model, commission_model, rng)?);

        Ok(fills)
    }

    /// Recomputes a trailing order's trigger price from the best-seen extreme, only
    /// adjusting in the favorable direction (spec §4.3.1).
    fn update_trailing_trigger(&mut self, client_order_id: &ClientOrderId, now_ns: i64) -> SimResult<()> {
        let Some(order) = self.order_index.get(client_order_id) else { return Ok(()) };
        let side = order.side;
        let (offset, offset_type) = match &order.kind {
            OrderKind::TrailingStopMarket { offset, offset_type, .. } => (*offset, *offset_type),
            OrderKind::TrailingStopLimit { offset, offset_type, .. } => (*offset, *offset_type),
            _ => return Ok(()),
        };
        let Some(reference) = self.reference_price(TriggerType::Last, side).or(self.last_trade_price) else { return Ok(()) };

        let extreme = self.trailing_extremes.entry(client_order_id.clone()).or_insert(reference);
        let improved = match side {
            Side::Buy => reference < *extreme,
            Side::Sell => reference > *extreme,
        };
        if improved {
            *extreme = reference;
        }
        let extreme = *extreme;

        let offset_raw: i128 = match offset_type {
            crate::order::OffsetType::Price => {
                (offset * rust_decimal::Decimal::from(crate::numerics::FIXED_SCALAR)).trunc().to_string().parse::<i128>().unwrap_or(0)
            }
            crate::order::OffsetType::Ticks => self.instrument.price_increment.raw() * offset.trunc().to_string().parse::<i128>().unwrap_or(0),
            crate::order::OffsetType::BasisPoints => {
                (rust_decimal::Decimal::from(extreme.raw()) * offset / rust_decimal::Decimal::from(10_000))
                    .trunc()
                    .to_string()
                    .parse::<i128>()
                    .unwrap_or(0)
            }
            crate::order::OffsetType::PriceTier => self.instrument.price_increment.raw(),
        };
        let new_trigger_raw = match side {
            Side::Buy => extreme.raw() + offset_raw,
            Side::Sell => extreme.raw() - offset_raw,
        };

        if let Some(order) = self.order_index.get_mut(client_order_id) {
            let new_trigger = Price::from_raw(new_trigger_raw, extreme.precision())?;
            match &mut order.kind {
                OrderKind::TrailingStopMarket { trigger_price, .. } => *trigger_price = new_trigger,
                OrderKind::TrailingStopLimit { trigger_price, .. } => *trigger_price = new_trigger,
                _ => {}
            }
            order.ts_last = now_ns;
        }
        Ok(())
    }

    /// Walks every resting LIMIT order whose price now crosses the opposing top of book
    /// (spec §4.3.3 step 3), filling price/time priority order within each price level.
    fn sweep_resting_limits(
        &mut self,
        now_ns: i64,
        id_gen: &mut IdGenerator,
        fill_model: &dyn FillModel,
        commission_model: &dyn CommissionModel,
        rng: &mut SmallRng,
    ) -> SimResult<Vec<Fill>> {
        let mut fills = Vec::new();
        loop {
            let crossed_id = self.order_index.values().find_map(|order| {
                if order.status.is_terminal() || order.header.venue_order_id.is_none() {
                    return None;
                }
                let price = order.kind.price()?;
                let crosses = match order.side {
                    Side::Buy => self.book.best_ask_price().is_some_and(|ask| price >= ask),
                    Side::Sell => self.book.best_bid_price().is_some_and(|bid| price <= bid),
                };
                crosses.then(|| order.header.client_order_id.clone())
            });
            let Some(client_order_id) = crossed_id else { break };
            let mut order = self.order_index.remove(&client_order_id).unwrap();
            self.unrest(&order);
            let position_id = self.position_id_for(&order, id_gen);
            let leaves = order.leaves_qty()?;
            let touches = self.book.simulate_fills(order.side, leaves, usize::MAX);
            if touches.is_empty() {
                self.order_index.insert(client_order_id, order);
                break;
            }
            for (level_price, level_qty) in touches {
                let remaining = order.leaves_qty()?;
                if remaining.is_zero() {
                    break;
                }
                let candidate_qty = remaining.min(level_qty);
                let Some(adjustment) = fill_model.adjust_fill(&self.instrument, order.side, candidate_qty, level_price, rng) else {
                    continue;
                };
                let trade_id = id_gen.next_trade_id();
                let venue_order_id = order.header.venue_order_id.unwrap();
                let commission = commission_model.commission(&self.instrument, adjustment.qty, adjustment.price, crate::order::LiquiditySide::Maker);
                order.apply_fill(trade_id, venue_order_id, position_id, adjustment.qty, adjustment.price, commission, crate::order::LiquiditySide::Maker, now_ns)?;
                self.consume_book_liquidity(order.side, level_price, adjustment.qty);
                self.last_trade_price = Some(adjustment.price);
                fills.push(Fill {
                    trade_id,
                    client_order_id: client_order_id.clone(),
                    venue_order_id,
                    position_id,
                    side: order.side,
                    qty: adjustment.qty,
                    price: adjustment.price,
                    commission,
                    liquidity_side: crate::order::LiquiditySide::Maker,
                    ts_event: now_ns,
                });
            }
            if !order.leaves_qty()?.is_zero() && !order.status.is_terminal() {
                self.rest_limit(&order);
            }
            self.order_index.insert(client_order_id.clone(), order);
            self.apply_contingencies(&client_order_id, now_ns, id_gen, fill_model, commission_model, rng)?;
        }
        Ok(fills)
    }

    /// OTO/OCO/OUO propagation (spec §4.3.5): on any fill of a parent, its OTO children
    /// are submitted; on fill or cancel of an OCO leg, its linked peers are canceled.
    fn apply_contingencies(
        &mut self,
        client_order_id: &ClientOrderId,
        now_ns: i64,
        id_gen: &mut IdGenerator,
        fill_model: &dyn FillModel,
        commission_model: &dyn CommissionModel,
        rng: &mut SmallRng,
    ) -> SimResult<()> {
        let Some(order) = self.order_index.get(client_order_id) else { return Ok(()) };
        let has_fill = matches!(order.status, OrderStatus::PartiallyFilled | OrderStatus::Filled);
        let contingency = order.contingency_type;
        let linked = order.header.linked_order_ids.clone();

        if has_fill {
            if let Some(children) = self.oto_orders.remove(client_order_id) {
                for child_id in children {
                    if let Some(mut child) = self.order_index.remove(&child_id) {
                        let result = self.accept_order(child.clone(), id_gen, now_ns, fill_model, commission_model, rng);
                        match result {
                            Ok(_) => {}
                            Err(_) => {
                                child.deny("OTO parent fill could not be propagated", now_ns)?;
                                self.order_index.insert(child_id, child);
                            }
                        }
                    }
                }
            }
            if contingency == ContingencyType::Oco {
                self.cancel_peers(&linked, "contingency", now_ns)?;
            }
        }
        Ok(())
    }

    fn cancel_peers(&mut self, peers: &[ClientOrderId], reason: &str, now_ns: i64) -> SimResult<()> {
        for peer_id in peers {
            if let Some(mut peer) = self.order_index.remove(peer_id) {
                if !peer.status.is_terminal() {
                    self.unrest(&peer);
                    let _ = peer.cancel(reason, now_ns);
                }
                self.order_index.insert(peer_id.clone(), peer);
            }
        }
        Ok(())
    }

    /// `ModifyOrder` (spec §4.3.6): changing price re-keys the order (loses time
    /// priority); changing only quantity retains priority. Mirrors to OUO peers.
    pub fn modify_order(
        &mut self,
        client_order_id: &ClientOrderId,
        quantity: Option<Quantity>,
        price: Option<Price>,
        trigger_price: Option<Price>,
        now_ns: i64,
    ) -> SimResult<()> {
        let Some(mut order) = self.order_index.remove(client_order_id) else {
            return Err(SimError::NotFound(NotFoundError::Order(client_order_id.to_string())));
        };
        if order.status.is_terminal() {
            self.order_index.insert(client_order_id.clone(), order);
            return Err(SimError::Reject(RejectError::OrderListRejected(
                client_order_id.to_string(),
                "order already closed".to_string(),
            )));
        }
        if let Some(new_qty) = quantity {
            if new_qty < order.filled_qty {
                self.order_index.insert(client_order_id.clone(), order);
                return Err(SimError::Validation(ValidationError::Other(
                    "cannot reduce quantity below filled_qty".to_string(),
                )));
            }
        }

        let price_changed = price.is_some_and(|p| order.kind.price() != Some(p));
        if price_changed {
            self.unrest(&order);
        }

        if let Some(new_qty) = quantity {
            order.quantity = new_qty;
        }
        match (&mut order.kind, price, trigger_price) {
            (OrderKind::Limit { price: p }, Some(new_price), _) => *p = new_price,
            (OrderKind::StopMarket { trigger_price: t, .. }, _, Some(new_trigger)) => *t = new_trigger,
            (OrderKind::StopLimit { price: p, trigger_price: t, .. }, new_price, new_trigger) => {
                if let Some(new_price) = new_price {
                    *p = new_price;
                }
                if let Some(new_trigger) = new_trigger {
                    *t = new_trigger;
                }
            }
            _ => {}
        }
        order.ts_last = now_ns;
        order.push_updated_event(quantity, price, trigger_price, now_ns);

        if price_changed && order.kind.price().is_some() {
            self.rest_limit(&order);
        }

        let linked = if order.contingency_type == ContingencyType::Ouo { order.header.linked_order_ids.clone() } else { Vec::new() };
        self.order_index.insert(client_order_id.clone(), order);

        for peer_id in linked {
            if let Some(mut peer) = self.order_index.remove(&peer_id) {
                if let Some(new_qty) = quantity {
                    peer.quantity = new_qty;
                }
                self.order_index.insert(peer_id, peer);
            }
        }
        Ok(())
    }

    /// `CancelOrder` (spec §4.3.6/§5): removes from the side book and emits
    /// `OrderCanceled`; already-terminal orders raise `OrderCancelRejected`.
    pub fn cancel_order(&mut self, client_order_id: &ClientOrderId, now_ns: i64) -> SimResult<()> {
        let Some(mut order) = self.order_index.remove(client_order_id) else {
            return Err(SimError::NotFound(NotFoundError::Order(client_order_id.to_string())));
        };
        if order.status.is_terminal() {
            self.order_index.insert(client_order_id.clone(), order);
            return Err(SimError::Reject(RejectError::OrderListRejected(
                client_order_id.to_string(),
                "order already closed".to_string(),
            )));
        }
        self.unrest(&order);
        order.cancel("canceled by strategy", now_ns)?;
        let contingency = order.contingency_type;
        let linked = order.header.linked_order_ids.clone();
        self.order_index.insert(client_order_id.clone(), order);
        if contingency == ContingencyType::Oco {
            self.cancel_peers(&linked, "contingency", now_ns)?;
        }
        Ok(())
    }

    /// `CancelAllOrders`: sweeps every non-terminal order for `strategy_id` (spec §4.3.6).
    pub fn cancel_all_orders(&mut self, strategy_id: &StrategyId, now_ns: i64) -> SimResult<()> {
        let ids: Vec<ClientOrderId> = self
            .order_index
            .values()
            .filter(|o| &o.header.strategy_id == strategy_id && !o.status.is_terminal())
            .map(|o| o.header.client_order_id.clone())
            .collect();
        for id in ids {
            let _ = self.cancel_order(&id, now_ns);
        }
        Ok(())
    }

    /// Feeds a quote tick's top-of-book into the resting book (spec §2/§6) so marketable
    /// limits and stops can trigger off quoted (not just traded) prices.
    pub fn apply_quote_tick(&mut self, tick: &QuoteTick) {
        self.book.apply_quote(BookSide::Bid, tick.bid_price, tick.bid_size);
        self.book.apply_quote(BookSide::Ask, tick.ask_price, tick.ask_size);
    }

    pub fn apply_trade_tick(&mut self, tick: &TradeTick) {
        self.last_trade_price = Some(tick.price);
    }

    pub fn apply_order_book_delta(&mut self, delta: &OrderBookDelta) -> SimResult<()> {
        self.book.apply_delta(delta)
    }

    pub fn apply_order_book_snapshot(&mut self, snapshot: &OrderBookSnapshot) -> SimResult<()> {
        self.book.apply_snapshot(snapshot)
    }

    /// Synthesizes a controlled sequence of price touches from a bar when only OHLCV
    /// data is available (spec §4.3.7), updating `last_trade_price` through each touch
    /// so triggered stops see every intermediate extreme.
    pub fn apply_bar(&mut self, bar: &Bar) {
        for touch in bar.touch_sequence() {
            self.last_trade_price = Some(touch);
        }
    }
}

impl Order {
    /// Pushes an `OrderUpdated` event reflecting a successful `ModifyOrder` (spec §6).
    fn push_updated_event(&mut self, quantity: Option<Quantity>, price: Option<Price>, trigger_price: Option<Price>, ts_event: i64) {
        let header = crate::order::events::OrderEventHeader {
            client_order_id: self.header.client_order_id.clone(),
            instrument_id: self.header.instrument_id.clone(),
            trader_id: self.header.trader_id.clone(),
            strategy_id: self.header.strategy_id.clone(),
            ts_event,
            ts_init: self.ts_last.max(ts_event),
        };
        self.events.push(crate::order::events::OrderEvent::OrderUpdated { header, quantity, price, trigger_price });
    }
}
