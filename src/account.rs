//! Account and position accounting (spec §4.5).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::error::{SimError, SimResult, RejectError};
use crate::identifiers::{AccountId, InstrumentId, PositionId, TradeId};
use crate::numerics::{Money, Price, Quantity};
use crate::order::Side;

#[derive(Debug, Clone, Copy, Default)]
pub struct Balance {
    pub total: rust_decimal::Decimal,
    pub free: rust_decimal::Decimal,
    pub locked: rust_decimal::Decimal,
}

/// `{id, balances, leverages, default_leverage, is_frozen}` (spec §3). A frozen account
/// still updates positions on fill but rejects balance-changing adjustments (spec §4.5).
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub balances: HashMap<String, Balance>,
    pub leverages: HashMap<InstrumentId, rust_decimal::Decimal>,
    pub default_leverage: rust_decimal::Decimal,
    pub is_frozen: bool,
}

impl Account {
    pub fn new(id: AccountId, default_leverage: rust_decimal::Decimal) -> Self {
        Self { id, balances: HashMap::new(), leverages: HashMap::new(), default_leverage, is_frozen: false }
    }

    pub fn leverage_for(&self, instrument_id: &InstrumentId) -> rust_decimal::Decimal {
        self.leverages.get(instrument_id).copied().unwrap_or(self.default_leverage)
    }

    /// Seeds or tops up a currency balance. Rejected on a frozen account (spec §4.5).
    pub fn adjust(&mut self, money: Money) -> SimResult<()> {
        if self.is_frozen {
            return Err(SimError::Reject(RejectError::InsufficientBalance {
                required: money.as_decimal().to_string(),
                available: "0".to_string(),
            }));
        }
        let entry = self.balances.entry(money.currency().code.to_string()).or_default();
        entry.total += money.as_decimal();
        entry.free += money.as_decimal();
        Ok(())
    }

    /// Locks `amount` of margin from the free balance of `currency`, raising if
    /// insufficient free balance remains (spec §4.5).
    pub fn lock_margin(&mut self, currency: Currency, amount: rust_decimal::Decimal) -> SimResult<()> {
        let entry = self.balances.entry(currency.code.to_string()).or_default();
        if entry.free < amount {
            return Err(SimError::Reject(RejectError::InsufficientBalance {
                required: amount.to_string(),
                available: entry.free.to_string(),
            }));
        }
        entry.free -= amount;
        entry.locked += amount;
        Ok(())
    }

    pub fn unlock_margin(&mut self, currency: Currency, amount: rust_decimal::Decimal) {
        let entry = self.balances.entry(currency.code.to_string()).or_default();
        entry.locked -= amount;
        entry.free += amount;
    }

    /// Applies realized PnL to the total and free balance; still permitted on a frozen
    /// account since it originates from a fill, not an explicit adjustment (spec §4.5).
    pub fn apply_realized_pnl(&mut self, pnl: Money) {
        let entry = self.balances.entry(pnl.currency().code.to_string()).or_default();
        entry.total += pnl.as_decimal();
        entry.free += pnl.as_decimal();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

/// `{id, instrument_id, side, net_qty, avg_open_px, realized_pnl, ...}` (spec §3/§4.5).
/// Created on first fill; flips sign on an opposite-side fill exceeding current net;
/// closes to FLAT but remains queryable (spec §3: "does not delete").
#[derive(Debug, Clone)]
pub struct Position {
    pub id: PositionId,
    pub instrument_id: InstrumentId,
    pub side: PositionSide,
    /// Signed: positive for LONG, negative for SHORT, zero at FLAT.
    pub net_qty: rust_decimal::Decimal,
    pub avg_open_px: Option<Price>,
    pub realized_pnl: rust_decimal::Decimal,
    pub contributing_trades: Vec<TradeId>,
    pub ts_opened: i64,
    pub ts_closed: Option<i64>,
    pub ts_last: i64,
}

impl Position {
    pub fn flat(id: PositionId, instrument_id: InstrumentId, ts: i64) -> Self {
        Self {
            id,
            instrument_id,
            side: PositionSide::Flat,
            net_qty: rust_decimal::Decimal::ZERO,
            avg_open_px: None,
            realized_pnl: rust_decimal::Decimal::ZERO,
            contributing_trades: Vec::new(),
            ts_opened: ts,
            ts_closed: None,
            ts_last: ts,
        }
    }

    fn signed_qty(side: Side, qty: Quantity) -> rust_decimal::Decimal {
        match side {
            Side::Buy => qty.as_decimal(),
            Side::Sell => -qty.as_decimal(),
        }
    }

    /// Applies a fill to this position (spec §4.5): same-direction fills widen the
    /// position and update `avg_open_px`; opposite-direction fills close/reduce first,
    /// realizing PnL, and split into an opening portion if the fill exceeds current net.
    pub fn apply_fill(
        &mut self,
        trade_id: TradeId,
        fill_side: Side,
        fill_qty: Quantity,
        fill_px: Price,
        currency: Currency,
        ts_event: i64,
    ) -> Money {
        self.contributing_trades.push(trade_id);
        self.ts_last = ts_event;
        let delta = Self::signed_qty(fill_side, fill_qty);
        let mut realized = rust_decimal::Decimal::ZERO;

        let same_direction = self.net_qty == rust_decimal::Decimal::ZERO
            || (self.net_qty.is_sign_positive() && delta.is_sign_positive())
            || (self.net_qty.is_sign_negative() && delta.is_sign_negative());

        if same_direction {
            let prior_abs = self.net_qty.abs();
            let new_abs = prior_abs + delta.abs();
            let prior_avg = self.avg_open_px.map(|p| p.as_decimal()).unwrap_or(fill_px.as_decimal());
            let new_avg = if new_abs.is_zero() {
                prior_avg
            } else {
                (prior_avg * prior_abs + fill_px.as_decimal() * delta.abs()) / new_abs
            };
            self.avg_open_px = Some(Price::new(new_avg, fill_px.precision()).unwrap_or(fill_px));
            self.net_qty += delta;
        } else {
            let closing_qty = delta.abs().min(self.net_qty.abs());
            if let Some(avg_open) = self.avg_open_px {
                let pnl_per_unit = match self.side {
                    PositionSide::Long => fill_px.as_decimal() - avg_open.as_decimal(),
                    PositionSide::Short => avg_open.as_decimal() - fill_px.as_decimal(),
                    PositionSide::Flat => rust_decimal::Decimal::ZERO,
                };
                realized = pnl_per_unit * closing_qty;
            }
            self.realized_pnl += realized;

            let remaining_delta = delta.abs() - closing_qty;
            self.net_qty += if self.net_qty.is_sign_positive() { -closing_qty } else { closing_qty };

            if remaining_delta > rust_decimal::Decimal::ZERO {
                // Fill exceeded current net: close fully, then open a fresh position in
                // the opposite direction with the residual (spec §4.5 flip).
                self.net_qty = if delta.is_sign_positive() { remaining_delta } else { -remaining_delta };
                self.avg_open_px = Some(fill_px);
            }
        }

        self.side = if self.net_qty.is_sign_positive() && !self.net_qty.is_zero() {
            PositionSide::Long
        } else if self.net_qty.is_sign_negative() {
            PositionSide::Short
        } else {
            PositionSide::Flat
        };
        if self.side == PositionSide::Flat {
            self.ts_closed = Some(ts_event);
            self.avg_open_px = None;
        } else {
            self.ts_closed = None;
        }

        Money::new(realized, currency).unwrap_or(Money::zero(currency))
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn frozen_account_rejects_adjustment_but_fill_pnl_still_applies() {
        let mut account = Account::new(AccountId::new("A-1"), rust_decimal::Decimal::ONE);
        account.is_frozen = true;
        let usd = Currency::usd();
        assert!(account.adjust(Money::new(rust_decimal::Decimal::from(100), usd).unwrap()).is_err());
        // realized PnL from a fill is not an "explicit adjustment" and still applies.
        account.apply_realized_pnl(Money::new(rust_decimal::Decimal::from(10), usd).unwrap());
        assert_eq!(account.balances.get("USD").unwrap().total, rust_decimal::Decimal::from(10));
    }

    #[test]
    fn opposite_fill_exceeding_net_flips_position() {
        let mut position = Position::flat(PositionId::from(1u64), InstrumentId::new("EUR/USD", "SIM"), 0);
        position.apply_fill(
            TradeId::from(1u64),
            Side::Buy,
            Quantity::from_str("5").unwrap(),
            Price::from_str("100.00").unwrap(),
            Currency::usd(),
            0,
        );
        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.net_qty, rust_decimal::Decimal::from(5));

        let pnl = position.apply_fill(
            TradeId::from(2u64),
            Side::Sell,
            Quantity::from_str("8").unwrap(),
            Price::from_str("101.00").unwrap(),
            Currency::usd(),
            1,
        );
        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.net_qty, rust_decimal::Decimal::from(-3));
        assert_eq!(pnl.as_decimal(), rust_decimal::Decimal::from(5));
    }
}
