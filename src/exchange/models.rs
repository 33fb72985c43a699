//! Latency, fill, and commission model interfaces (spec §4.4/§9 Design Notes): small
//! capability-set traits injected at exchange construction, mirroring the teacher's
//! `FillSimulator::decide(&self, rng: &mut impl Rng, ...)` pattern in `gym/flow/fill.rs`.
//! Randomness is always threaded explicitly through an owned, seeded PRNG — never
//! `rand::thread_rng()` (SPEC_FULL §0).

use rand::Rng;
use rand::rngs::SmallRng;

use crate::instrument::Instrument;
use crate::numerics::{Money, Price, Quantity};
use crate::order::{LiquiditySide, Side};

/// One variant per `TradingCommand` kind, used to key per-kind latency (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SubmitOrder,
    SubmitOrderList,
    ModifyOrder,
    CancelOrder,
    CancelAllOrders,
    QueryOrder,
}

impl CommandKind {
    pub fn of(command: &crate::commands::TradingCommand) -> Self {
        use crate::commands::TradingCommand as C;
        match command {
            C::SubmitOrder { .. } => CommandKind::SubmitOrder,
            C::SubmitOrderList { .. } => CommandKind::SubmitOrderList,
            C::ModifyOrder { .. } => CommandKind::ModifyOrder,
            C::CancelOrder { .. } => CommandKind::CancelOrder,
            C::CancelAllOrders { .. } => CommandKind::CancelAllOrders,
            C::QueryOrder { .. } => CommandKind::QueryOrder,
        }
    }
}

/// `delay(kind, rng) -> duration` (spec §9 Design Notes).
pub trait LatencyModel: std::fmt::Debug {
    fn delay_ns(&self, kind: CommandKind, rng: &mut SmallRng) -> u64;
}

/// Fixed per-kind latency, read from [`crate::config::LatencyConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FixedLatencyModel {
    pub config: crate::config::LatencyConfig,
}

impl LatencyModel for FixedLatencyModel {
    fn delay_ns(&self, kind: CommandKind, _rng: &mut SmallRng) -> u64 {
        match kind {
            CommandKind::SubmitOrder | CommandKind::SubmitOrderList => self.config.submit_order_ns,
            CommandKind::ModifyOrder => self.config.modify_order_ns,
            CommandKind::CancelOrder | CommandKind::CancelAllOrders => self.config.cancel_order_ns,
            CommandKind::QueryOrder => self.config.query_order_ns,
        }
    }
}

/// The outcome of the fill model's adjustment pass over a candidate `(qty, price)` touch
/// against a resting level: either the touch proceeds unmodified, is slipped by a tick,
/// or is dropped entirely (a latency-induced miss), spec §4.3.4/§9.
#[derive(Debug, Clone, Copy)]
pub struct FillAdjustment {
    pub qty: Quantity,
    pub price: Price,
}

/// `adjust_fill(order, level, rng) -> (qty, px)?` (spec §9 Design Notes).
pub trait FillModel: std::fmt::Debug {
    fn adjust_fill(
        &self,
        instrument: &Instrument,
        side: Side,
        candidate_qty: Quantity,
        candidate_price: Price,
        rng: &mut SmallRng,
    ) -> Option<FillAdjustment>;

    /// Resolves `liquidity_side` for a given arriving/resting leg, allowing the model to
    /// override into a random miss via [`FillModel::adjust_fill`] returning `None` first.
    fn liquidity_side(&self, is_aggressor: bool) -> LiquiditySide {
        if is_aggressor { LiquiditySide::Taker } else { LiquiditySide::Maker }
    }
}

/// Deterministic pass-through fill model: every candidate touch fills exactly as
/// quoted. The default for tests and scenarios that don't need fill noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerfectFillModel;

impl FillModel for PerfectFillModel {
    fn adjust_fill(
        &self,
        _instrument: &Instrument,
        _side: Side,
        candidate_qty: Quantity,
        candidate_price: Price,
        _rng: &mut SmallRng,
    ) -> Option<FillAdjustment> {
        Some(FillAdjustment { qty: candidate_qty, price: candidate_price })
    }
}

/// A probabilistic fill model: with probability `miss_probability` the touch is dropped
/// entirely (modeling latency-induced fades); otherwise it fills at the quoted price,
/// slipped by `slippage_ticks` against the taker.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilisticFillModel {
    pub miss_probability: f64,
    pub slippage_ticks: i64,
}

impl FillModel for ProbabilisticFillModel {
    fn adjust_fill(
        &self,
        instrument: &Instrument,
        side: Side,
        candidate_qty: Quantity,
        candidate_price: Price,
        rng: &mut SmallRng,
    ) -> Option<FillAdjustment> {
        if rng.random::<f64>() < self.miss_probability {
            return None;
        }
        let tick = instrument.price_increment.raw() * self.slippage_ticks as i128;
        let adjusted_raw = match side {
            Side::Buy => candidate_price.raw() + tick,
            Side::Sell => candidate_price.raw() - tick,
        };
        let price = Price::from_raw(adjusted_raw, candidate_price.precision()).unwrap_or(candidate_price);
        Some(FillAdjustment { qty: candidate_qty, price })
    }
}

/// `commission(instrument, qty, px, side) -> Money` (spec §9 Design Notes / §4.3.4).
pub trait CommissionModel: std::fmt::Debug {
    fn commission(
        &self,
        instrument: &Instrument,
        quantity: Quantity,
        price: Price,
        liquidity_side: LiquiditySide,
    ) -> Money;
}

/// A flat basis-point commission on notional, charged identically to maker and taker.
#[derive(Debug, Clone, Copy)]
pub struct BasisPointCommissionModel {
    pub rate_bps: rust_decimal::Decimal,
}

impl CommissionModel for BasisPointCommissionModel {
    fn commission(
        &self,
        instrument: &Instrument,
        quantity: Quantity,
        price: Price,
        _liquidity_side: LiquiditySide,
    ) -> Money {
        let notional = price.mul_quantity(quantity, instrument.quote_currency);
        let commission_decimal = notional.as_decimal() * self.rate_bps / rust_decimal::Decimal::from(10_000);
        Money::new(commission_decimal, instrument.quote_currency).unwrap_or(Money::zero(instrument.quote_currency))
    }
}
