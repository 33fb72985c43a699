//! The simulated exchange orchestrator (spec §4.4): owns the instrument/currency
//! registries, one matching engine per instrument, the inflight command queue, and the
//! account/position books. Ties together the pieces in [`crate::matching`] via
//! explicitly injected models (spec §9 Design Notes), grounded on the teacher's
//! `TradingGym`/`CounterpartyMaster` orchestration in `gym/flow/env.rs`.

pub mod inflight;
pub mod models;

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::account::{Account, Position};
use crate::commands::{OrderList, TradingCommand};
use crate::config::ExchangeConfig;
use crate::currency::CurrencyRegistry;
use crate::error::{NotFoundError, SimError, SimResult, SystemError};
use crate::exchange::inflight::InflightQueue;
use crate::exchange::models::{
    BasisPointCommissionModel, CommandKind, CommissionModel, FillModel, FixedLatencyModel, LatencyModel, PerfectFillModel,
};
use crate::identifiers::{AccountId, ClientOrderId, InstrumentId, PositionId, TradeId, VenueOrderId};
use crate::instrument::{Instrument, InstrumentRegistry};
use crate::market::{Bar, OrderBookDelta, OrderBookSnapshot, QuoteTick, TradeTick};
use crate::matching::{Fill, MatchingEngine};
use crate::numerics::Money;
use crate::orderbook::BookType;
use crate::reports::{ExecutionMassStatus, OrderStatusReport};

/// Generates deterministic venue order/position/trade ids as a function of
/// `(seed, counter)` (spec §4.4/GLOSSARY) rather than from wall-clock or a global atomic.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: u64,
    venue_order_counter: u64,
    position_counter: u64,
    trade_counter: u64,
}

impl IdGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed, venue_order_counter: 0, position_counter: 0, trade_counter: 0 }
    }

    fn derive(&self, counter: u64) -> u64 {
        self.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(counter)
    }

    pub fn next_venue_order_id(&mut self) -> VenueOrderId {
        let id = VenueOrderId::from(self.derive(self.venue_order_counter));
        self.venue_order_counter += 1;
        id
    }

    pub fn next_position_id(&mut self) -> PositionId {
        let id = PositionId::from(self.derive(self.position_counter));
        self.position_counter += 1;
        id
    }

    pub fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId::from(self.derive(self.trade_counter));
        self.trade_counter += 1;
        id
    }
}

/// Owns the instrument/currency registries and the per-instrument matching engines
/// (spec §4.4: "Owns: instruments registry, per-instrument book, per-instrument matching
/// engine"). Always an explicit owned value on [`SimulatedExchange`], never a global.
#[derive(Debug, Default)]
pub struct Registry {
    pub instruments: InstrumentRegistry,
    pub currencies: CurrencyRegistry,
    engines: HashMap<InstrumentId, MatchingEngine>,
}

impl Registry {
    fn engine_mut(&mut self, instrument_id: &InstrumentId) -> SimResult<&mut MatchingEngine> {
        self.engines
            .get_mut(instrument_id)
            .ok_or_else(|| SimError::NotFound(NotFoundError::Instrument(instrument_id.to_string())))
    }

    fn engine(&self, instrument_id: &InstrumentId) -> SimResult<&MatchingEngine> {
        self.engines
            .get(instrument_id)
            .ok_or_else(|| SimError::NotFound(NotFoundError::Instrument(instrument_id.to_string())))
    }
}

/// The deterministic simulated exchange (spec §1/§4.4): single-threaded and
/// cooperative, advancing only through explicit calls to [`SimulatedExchange::process`]
/// or the `process_*` market-data hooks. Nothing here reads the wall clock.
pub struct SimulatedExchange {
    pub config: ExchangeConfig,
    pub registry: Registry,
    pub account: Account,
    pub positions: HashMap<PositionId, Position>,
    inflight: InflightQueue,
    now_ns: i64,
    rng: SmallRng,
    latency_model: Box<dyn LatencyModel>,
    fill_model: Box<dyn FillModel>,
    commission_model: Box<dyn CommissionModel>,
    id_gen: IdGenerator,
}

impl SimulatedExchange {
    pub fn new(config: ExchangeConfig) -> SimResult<Self> {
        let account = Account::new(AccountId::new("SIM-001"), config.default_leverage);
        let mut exchange = Self {
            id_gen: IdGenerator::new(config.rng_seed),
            rng: SmallRng::seed_from_u64(config.rng_seed),
            latency_model: Box::new(FixedLatencyModel { config: config.latency }),
            fill_model: Box::new(PerfectFillModel),
            commission_model: Box::new(BasisPointCommissionModel { rate_bps: rust_decimal::Decimal::ZERO }),
            registry: Registry::default(),
            account,
            positions: HashMap::new(),
            inflight: InflightQueue::new(),
            now_ns: 0,
            config,
        };
        for (code, amount) in exchange.config.starting_balances.clone() {
            let currency = exchange.registry.currencies.get_or_fallback(&code);
            exchange.account.adjust(Money::new(amount, currency)?)?;
        }
        Ok(exchange)
    }

    pub fn register_instrument(&mut self, instrument: Instrument) {
        let engine = MatchingEngine::new(
            instrument.clone(),
            BookType::L2Mbp,
            self.config.oms_type,
            self.config.reject_stop_orders_when_marketable,
        );
        self.registry.engines.insert(instrument.instrument_id.clone(), engine);
        self.registry.instruments.register(instrument);
    }

    pub fn set_latency_model(&mut self, model: Box<dyn LatencyModel>) {
        self.latency_model = model;
    }

    pub fn set_fill_model(&mut self, model: Box<dyn FillModel>) {
        self.fill_model = model;
    }

    pub fn set_commission_model(&mut self, model: Box<dyn CommissionModel>) {
        self.commission_model = model;
    }

    pub fn adjust_account(&mut self, money: Money) -> SimResult<()> {
        self.account.adjust(money)
    }

    pub fn now_ns(&self) -> i64 {
        self.now_ns
    }

    /// Schedules `command` onto the inflight queue at `now_ns + latency(kind)` (spec
    /// §4.4). Does not execute anything until [`SimulatedExchange::process`] is called
    /// with a `now_ns` that has reached the command's commit time.
    pub fn send(&mut self, command: TradingCommand) -> SimResult<()> {
        let kind = CommandKind::of(&command);
        let delay = self.latency_model.delay_ns(kind, &mut self.rng);
        let commit_ns = self.now_ns + delay as i64;
        tracing::trace!(?kind, commit_ns, "Command scheduled");
        self.inflight.push(commit_ns, command);
        Ok(())
    }

    /// Applies matching-engine fills to the account/position books (spec §4.5): updates
    /// the relevant position, realizes PnL, and deducts commission.
    fn apply_fills(&mut self, instrument_id: &InstrumentId, fills: Vec<Fill>) -> SimResult<()> {
        let quote_currency = self.registry.instruments.get(instrument_id)?.quote_currency;
        for fill in fills {
            let position = self
                .positions
                .entry(fill.position_id)
                .or_insert_with(|| Position::flat(fill.position_id, instrument_id.clone(), fill.ts_event));
            let realized = position.apply_fill(fill.trade_id, fill.side, fill.qty, fill.price, quote_currency, fill.ts_event);
            self.account.apply_realized_pnl(realized);
            let commission_cost = Money::zero(fill.commission.currency()).checked_sub(fill.commission)?;
            self.account.apply_realized_pnl(commission_cost);
        }
        Ok(())
    }

    /// Dispatches one already-due command to its instrument's matching engine (spec
    /// §4.4).
    #[tracing::instrument(skip(self, command), fields(kind = ?CommandKind::of(&command)), err)]
    fn dispatch(&mut self, command: TradingCommand, now_ns: i64) -> SimResult<()> {
        match command {
            TradingCommand::SubmitOrder { header, order, .. } => {
                let instrument_id = header.instrument_id;
                let engine = self.registry.engine_mut(&instrument_id)?;
                let fills = engine.accept_order(
                    order,
                    &mut self.id_gen,
                    now_ns,
                    self.fill_model.as_ref(),
                    self.commission_model.as_ref(),
                    &mut self.rng,
                )?;
                self.apply_fills(&instrument_id, fills)?;
            }
            TradingCommand::SubmitOrderList { header, list } => {
                self.submit_order_list(&header.instrument_id, list, now_ns)?;
            }
            TradingCommand::ModifyOrder { header, client_order_id, quantity, price, trigger_price, .. } => {
                let engine = self.registry.engine_mut(&header.instrument_id)?;
                engine.modify_order(&client_order_id, quantity, price, trigger_price, now_ns)?;
            }
            TradingCommand::CancelOrder { header, client_order_id, .. } => {
                let engine = self.registry.engine_mut(&header.instrument_id)?;
                engine.cancel_order(&client_order_id, now_ns)?;
            }
            TradingCommand::CancelAllOrders { header } => {
                let engine = self.registry.engine_mut(&header.instrument_id)?;
                engine.cancel_all_orders(&header.strategy_id, now_ns)?;
            }
            TradingCommand::QueryOrder { .. } => {}
        }
        Ok(())
    }

    /// `SubmitOrderList` (spec §4.3.5/§6): parks every OTO child first, then submits the
    /// list's primary (parentless) orders, which may in turn release their children
    /// through [`crate::matching::MatchingEngine::apply_contingencies`] on fill.
    fn submit_order_list(&mut self, instrument_id: &InstrumentId, list: OrderList, now_ns: i64) -> SimResult<()> {
        let engine = self.registry.engine_mut(instrument_id)?;
        for order in &list.orders {
            if let Some(parent_id) = order.header.parent_order_id.clone() {
                engine.park_child(parent_id, order.clone());
            }
        }
        let mut fills = Vec::new();
        for order in list.orders {
            if order.header.parent_order_id.is_none() {
                fills.extend(engine.accept_order(
                    order,
                    &mut self.id_gen,
                    now_ns,
                    self.fill_model.as_ref(),
                    self.commission_model.as_ref(),
                    &mut self.rng,
                )?);
            }
        }
        self.apply_fills(instrument_id, fills)
    }

    /// Advances simulated time to `now_ns`: drains every inflight command whose commit
    /// time has arrived (commit-time order, FIFO tie-break, spec §5), then re-runs the
    /// match loop for every instrument to evaluate stop triggers, GTD expiry, and
    /// resting-order crossings against the latest market state.
    pub fn process(&mut self, now_ns: i64) -> SimResult<()> {
        if now_ns < self.now_ns {
            return Err(SimError::System(SystemError::ClockRegression(format!(
                "process({now_ns}) called after now_ns={}",
                self.now_ns
            ))));
        }
        self.now_ns = now_ns;

        while let Some((_, command)) = self.inflight.pop_ready(now_ns) {
            self.dispatch(command, now_ns)?;
        }

        let instrument_ids: Vec<InstrumentId> = self.registry.engines.keys().cloned().collect();
        for instrument_id in instrument_ids {
            let engine = self.registry.engine_mut(&instrument_id)?;
            let fills = engine.run_match_loop(
                now_ns,
                &mut self.id_gen,
                self.fill_model.as_ref(),
                self.commission_model.as_ref(),
                &mut self.rng,
            )?;
            self.apply_fills(&instrument_id, fills)?;
        }
        tracing::debug!(now_ns, "Processed to new simulation time");
        Ok(())
    }

    /// Re-runs the match loop for one instrument and applies any resulting fills (spec
    /// §4.4: "after every dispatch and every data event, call the engine's match loop"),
    /// so a stop triggered or a resting limit crossed by the data just applied fires
    /// immediately instead of waiting for the next [`SimulatedExchange::process`] call.
    fn run_match_loop_for(&mut self, instrument_id: &InstrumentId, now_ns: i64) -> SimResult<()> {
        let engine = self.registry.engine_mut(instrument_id)?;
        let fills = engine.run_match_loop(
            now_ns,
            &mut self.id_gen,
            self.fill_model.as_ref(),
            self.commission_model.as_ref(),
            &mut self.rng,
        )?;
        self.apply_fills(instrument_id, fills)
    }

    pub fn process_order_book_delta(&mut self, delta: OrderBookDelta) -> SimResult<()> {
        let instrument_id = delta.instrument_id.clone();
        self.registry.engine_mut(&instrument_id)?.apply_order_book_delta(&delta)?;
        self.run_match_loop_for(&instrument_id, self.now_ns)
    }

    pub fn process_order_book_snapshot(&mut self, snapshot: OrderBookSnapshot) -> SimResult<()> {
        let instrument_id = snapshot.instrument_id.clone();
        self.registry.engine_mut(&instrument_id)?.apply_order_book_snapshot(&snapshot)?;
        self.run_match_loop_for(&instrument_id, self.now_ns)
    }

    pub fn process_quote_tick(&mut self, tick: QuoteTick) -> SimResult<()> {
        let instrument_id = tick.instrument_id.clone();
        self.registry.engine_mut(&instrument_id)?.apply_quote_tick(&tick);
        self.run_match_loop_for(&instrument_id, self.now_ns)
    }

    pub fn process_trade_tick(&mut self, tick: TradeTick) -> SimResult<()> {
        let instrument_id = tick.instrument_id.clone();
        self.registry.engine_mut(&instrument_id)?.apply_trade_tick(&tick);
        self.run_match_loop_for(&instrument_id, self.now_ns)
    }

    pub fn process_bar(&mut self, bar: Bar) -> SimResult<()> {
        let instrument_id = bar.instrument_id.clone();
        self.registry.engine_mut(&instrument_id)?.apply_bar(&bar);
        self.run_match_loop_for(&instrument_id, self.now_ns)
    }

    pub fn order_status(&self, instrument_id: &InstrumentId, client_order_id: &ClientOrderId) -> SimResult<OrderStatusReport> {
        let order = self
            .registry
            .engine(instrument_id)?
            .order(client_order_id)
            .ok_or_else(|| SimError::NotFound(NotFoundError::Order(client_order_id.to_string())))?;
        Ok(OrderStatusReport::from(order))
    }

    /// Flattens every live order/position across all instruments into one
    /// reconciliation snapshot (spec §6).
    pub fn execution_mass_status(&self) -> ExecutionMassStatus {
        let orders = self.registry.engines.values().flat_map(|engine| engine.orders());
        ExecutionMassStatus::from_cache(orders, self.positions.values())
    }

    /// Resets the exchange to a freshly constructed state under the same config,
    /// re-registering every instrument currently known (spec §4.4 `reset`).
    pub fn reset(&mut self) -> SimResult<()> {
        let instruments: Vec<Instrument> = self.registry.instruments.iter().map(|(_, instrument)| instrument.clone()).collect();
        let mut fresh = SimulatedExchange::new(self.config.clone())?;
        for instrument in instruments {
            fresh.register_instrument(instrument);
        }
        *self = fresh;
        Ok(())
    }
}
