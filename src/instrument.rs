//! `Instrument` and `InstrumentRegistry` (spec §2/§3, SPEC_FULL §3).

use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::error::{NotFoundError, SimError, SimResult};
use crate::identifiers::InstrumentId;
use crate::numerics::{Price, Quantity};
use crate::sorted_vec_map::SortedVecMap;

/// Static, post-registration-immutable facts about a tradable instrument (spec §3). The
/// matching engine and order book only ever read these numeric facets; nothing here
/// mutates after [`InstrumentRegistry::register`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_id: InstrumentId,
    pub price_precision: u8,
    pub size_precision: u8,
    /// The smallest price move allowed, used to validate and snap order prices and to
    /// drive trailing-stop offset arithmetic (SPEC_FULL §3).
    pub price_increment: Price,
    /// The smallest order-size move allowed.
    pub size_increment: Quantity,
    pub multiplier: Quantity,
    pub lot_size: Option<Quantity>,
    pub margin_init: rust_decimal::Decimal,
    pub margin_maint: rust_decimal::Decimal,
    pub quote_currency: Currency,
    pub base_currency: Option<Currency>,
}

impl Instrument {
    /// Rounds `price` down to the nearest multiple of [`Instrument::price_increment`],
    /// used by trailing-stop recalculation and book display.
    pub fn snap_price(&self, price: Price) -> SimResult<Price> {
        let increment_raw = self.price_increment.raw();
        if increment_raw == 0 {
            return Ok(price);
        }
        let snapped_raw = (price.raw() / increment_raw) * increment_raw;
        Price::from_raw(snapped_raw, self.price_precision)
    }

    pub fn is_price_on_increment(&self, price: Price) -> bool {
        let increment_raw = self.price_increment.raw();
        increment_raw == 0 || price.raw() % increment_raw == 0
    }

    pub fn is_quantity_on_increment(&self, quantity: Quantity) -> bool {
        let increment_raw = self.size_increment.raw();
        increment_raw == 0 || quantity.raw() % increment_raw == 0
    }
}

/// Process-wide instrument registry, owned by [`crate::exchange::Registry`] — never a
/// global (spec Design Notes).
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    instruments: SortedVecMap<InstrumentId, Instrument>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.instrument_id.clone(), instrument);
    }

    pub fn get(&self, instrument_id: &InstrumentId) -> SimResult<&Instrument> {
        self.instruments
            .get(instrument_id)
            .ok_or_else(|| SimError::NotFound(NotFoundError::Instrument(instrument_id.to_string())))
    }

    pub fn contains(&self, instrument_id: &InstrumentId) -> bool {
        self.instruments.contains_key(instrument_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InstrumentId, &Instrument)> {
        self.instruments.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_instrument() -> Instrument {
        Instrument {
            instrument_id: InstrumentId::new("EUR/USD", "SIM"),
            price_precision: 5,
            size_precision: 0,
            price_increment: Price::from_str("0.00001").unwrap(),
            size_increment: Quantity::from_str("1").unwrap(),
            multiplier: Quantity::from_str("1").unwrap(),
            lot_size: None,
            margin_init: rust_decimal::Decimal::new(3, 2),
            margin_maint: rust_decimal::Decimal::new(3, 2),
            quote_currency: Currency::usd(),
            base_currency: Some(Currency::eur()),
        }
    }

    #[test]
    fn snap_price_rounds_to_increment() {
        let instrument = sample_instrument();
        let price = Price::from_str("1.234567").unwrap();
        let snapped = instrument.snap_price(price).unwrap();
        assert_eq!(snapped.as_decimal(), rust_decimal::Decimal::from_str("1.23456").unwrap());
    }

    #[test]
    fn registry_lookup_not_found_raises() {
        let registry = InstrumentRegistry::new();
        let missing = InstrumentId::new("BTC/USD", "SIM");
        assert!(registry.get(&missing).is_err());
    }
}
