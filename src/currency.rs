//! `Currency` and the process-wide `CurrencyRegistry` (spec §3/§4.1, SPEC_FULL §3).
//!
//! The registry is an explicit owned value, never a global/`lazy_static` — it lives on
//! [`crate::exchange::Registry`] alongside the instrument and matching-engine registries,
//! following the teacher's `counterpart_master` field pattern (spec Design Notes).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::sorted_vec_map::SortedVecMap;

/// Broad classification of a currency, spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum CurrencyKind {
    Fiat,
    Crypto,
}

/// Fallback precision assigned to an unrecognized currency code (spec §3).
pub const UNKNOWN_CURRENCY_PRECISION: u8 = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub precision: u8,
    pub iso4217: u16,
    pub kind: CurrencyKind,
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}
impl Eq for Currency {}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// A fixed-capacity currency code, e.g. `"USD"`, `"BTC"`. Stored inline (no heap
/// allocation) since codes never exceed a handful of ASCII characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(smallvec::SmallVec<[u8; 8]>);

impl CurrencyCode {
    pub fn new(code: &str) -> Self {
        Self(smallvec::SmallVec::from_slice(code.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("?")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

macro_rules! major_currency_ctor {
    ($fn_name:ident, $code:literal, $precision:expr, $iso4217:expr, $kind:expr) => {
        pub fn $fn_name() -> Currency {
            Currency {
                code: CurrencyCode::new($code),
                precision: $precision,
                iso4217: $iso4217,
                kind: $kind,
            }
        }
    };
}

impl Currency {
    major_currency_ctor!(usd, "USD", 2, 840, CurrencyKind::Fiat);
    major_currency_ctor!(eur, "EUR", 2, 978, CurrencyKind::Fiat);
    major_currency_ctor!(gbp, "GBP", 2, 826, CurrencyKind::Fiat);
    major_currency_ctor!(jpy, "JPY", 0, 392, CurrencyKind::Fiat);
    major_currency_ctor!(btc, "BTC", 8, 0, CurrencyKind::Crypto);
    major_currency_ctor!(eth, "ETH", 8, 0, CurrencyKind::Crypto);
    major_currency_ctor!(usdt, "USDT", 6, 0, CurrencyKind::Crypto);

    /// The fallback assigned to any code absent from the registry (spec §3).
    pub fn unknown(code: &str) -> Currency {
        Currency {
            code: CurrencyCode::new(code),
            precision: UNKNOWN_CURRENCY_PRECISION,
            iso4217: 0,
            kind: CurrencyKind::Crypto,
        }
    }
}

/// Process-wide code→`Currency` map, seeded with the majors and falling back to
/// [`Currency::unknown`] for anything unrecognized (spec §3).
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    currencies: SortedVecMap<CurrencyCode, Currency>,
    unknown_cache: HashMap<CurrencyCode, Currency>,
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        let mut currencies = SortedVecMap::new();
        for currency in [
            Currency::usd(),
            Currency::eur(),
            Currency::gbp(),
            Currency::jpy(),
            Currency::btc(),
            Currency::eth(),
            Currency::usdt(),
        ] {
            currencies.insert(currency.code, currency);
        }
        Self { currencies, unknown_cache: HashMap::new() }
    }
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, currency: Currency) {
        self.currencies.insert(currency.code, currency);
    }

    /// Looks up a currency by code, falling back to [`Currency::unknown`] for any code
    /// not already registered. The fallback is cached so repeated lookups of the same
    /// unknown code are deterministic and stable across the process lifetime.
    pub fn get_or_fallback(&mut self, code: &str) -> Currency {
        let key = CurrencyCode::new(code);
        if let Some(currency) = self.currencies.get(&key) {
            return *currency;
        }
        *self
            .unknown_cache
            .entry(key)
            .or_insert_with(|| Currency::unknown(code))
    }

    pub fn get(&self, code: &str) -> Option<Currency> {
        self.currencies.get(&CurrencyCode::new(code)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_majors_resolve_with_correct_precision() {
        let registry = CurrencyRegistry::new();
        assert_eq!(registry.get("USD").unwrap().precision, 2);
        assert_eq!(registry.get("JPY").unwrap().precision, 0);
        assert_eq!(registry.get("BTC").unwrap().precision, 8);
    }

    #[test]
    fn unknown_code_falls_back_deterministically() {
        let mut registry = CurrencyRegistry::new();
        let a = registry.get_or_fallback("ZZZ");
        let b = registry.get_or_fallback("ZZZ");
        assert_eq!(a.precision, UNKNOWN_CURRENCY_PRECISION);
        assert_eq!(a.kind, CurrencyKind::Crypto);
        assert_eq!(a, b);
    }
}
