//! Strongly-typed identifier newtypes (SPEC_FULL §2). Each wraps a `String` (trader-
//! assigned or human-readable identifiers) or `u64` (exchange-assigned sequence
//! identifiers), carrying `Serialize`/`Deserialize` and `Display` so they flow straight
//! through the wire types in [`crate::commands`] and [`crate::reports`].

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_identifier {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

macro_rules! sequence_identifier {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        crate::impl_from_primitive!($name, u64);

        impl $name {
            pub fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_identifier!(Symbol);
string_identifier!(Venue);
string_identifier!(ClientOrderId);
string_identifier!(StrategyId);
string_identifier!(TraderId);
string_identifier!(AccountId);
string_identifier!(ClientId);
string_identifier!(OrderListId);

sequence_identifier!(VenueOrderId);
sequence_identifier!(PositionId);
sequence_identifier!(TradeId);

/// `(symbol, venue)` pair uniquely identifying a tradable instrument (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentId {
    pub symbol: Symbol,
    pub venue: Venue,
}

impl InstrumentId {
    pub fn new(symbol: impl Into<String>, venue: impl Into<String>) -> Self {
        Self { symbol: Symbol::new(symbol), venue: Venue::new(venue) }
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.symbol, self.venue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_id_displays_as_symbol_dot_venue() {
        let id = InstrumentId::new("EUR/USD", "SIM");
        assert_eq!(id.to_string(), "EUR/USD.SIM");
    }

    #[test]
    fn sequence_identifier_increments() {
        let a = VenueOrderId::from(1u64);
        assert_eq!(a.next(), VenueOrderId::from(2u64));
    }
}
