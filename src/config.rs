//! Exchange configuration (SPEC_FULL §0), in the shape of the teacher's builder-style
//! config structs: validated at construction, `Default` gives sane test defaults.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimError, SimResult};

/// Order-management-system type (spec §4.4/GLOSSARY): whether an instrument carries a
/// single netted position or many hedged positions keyed by order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OmsType {
    Netting,
    Hedging,
}

/// Exchange-wide behavior knobs (spec §4.3.1, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub oms_type: OmsType,
    /// If set, a stop order that is already marketable at submission is rejected
    /// rather than resting (spec §4.3.1).
    pub reject_stop_orders_when_marketable: bool,
    pub default_leverage: rust_decimal::Decimal,
    /// Starting balances seeded into the account on construction, `(currency_code, amount)`.
    pub starting_balances: Vec<(String, rust_decimal::Decimal)>,
    /// PRNG seed for the exchange's fill/latency models (SPEC_FULL §0).
    pub rng_seed: u64,
    pub latency: LatencyConfig,
}

/// Per-command-kind latency parameters (spec §4.4: `now + latency_model(command.kind)`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatencyConfig {
    pub submit_order_ns: u64,
    pub modify_order_ns: u64,
    pub cancel_order_ns: u64,
    pub query_order_ns: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            submit_order_ns: 1_000_000,
            modify_order_ns: 1_000_000,
            cancel_order_ns: 1_000_000,
            query_order_ns: 0,
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            oms_type: OmsType::Netting,
            reject_stop_orders_when_marketable: false,
            default_leverage: rust_decimal::Decimal::ONE,
            starting_balances: vec![("USD".to_string(), rust_decimal::Decimal::from(1_000_000))],
            rng_seed: 42,
            latency: LatencyConfig::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn builder() -> ExchangeConfigBuilder {
        ExchangeConfigBuilder::default()
    }

    fn validate(&self) -> SimResult<()> {
        for (code, amount) in &self.starting_balances {
            if amount.is_sign_negative() {
                return Err(SimError::Config(ConfigError::NegativeStartingBalance(code.clone())));
            }
        }
        if self.default_leverage.is_sign_negative() || self.default_leverage.is_zero() {
            return Err(SimError::Config(ConfigError::Invalid(
                "default_leverage must be positive".to_string(),
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExchangeConfigBuilder {
    inner: ExchangeConfig,
}

impl ExchangeConfigBuilder {
    pub fn oms_type(mut self, oms_type: OmsType) -> Self {
        self.inner.oms_type = oms_type;
        self
    }

    pub fn reject_stop_orders_when_marketable(mut self, reject: bool) -> Self {
        self.inner.reject_stop_orders_when_marketable = reject;
        self
    }

    pub fn default_leverage(mut self, leverage: rust_decimal::Decimal) -> Self {
        self.inner.default_leverage = leverage;
        self
    }

    pub fn starting_balance(mut self, currency_code: impl Into<String>, amount: rust_decimal::Decimal) -> Self {
        self.inner.starting_balances.push((currency_code.into(), amount));
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.inner.rng_seed = seed;
        self
    }

    pub fn latency(mut self, latency: LatencyConfig) -> Self {
        self.inner.latency = latency;
        self
    }

    pub fn build(self) -> SimResult<ExchangeConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ExchangeConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_starting_balance_rejected() {
        let result = ExchangeConfig::builder()
            .starting_balance("USD", rust_decimal::Decimal::from(-1))
            .build();
        assert!(result.is_err());
    }
}
