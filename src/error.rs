use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Reject(#[from] RejectError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Errors raised while constructing or parsing domain values: prices, quantities,
/// currencies, instruments, identifiers, commands.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("precision {precision} exceeds maximum of {max}")]
    PrecisionExceeded { precision: u8, max: u8 },

    #[error("quantity cannot be negative: {0}")]
    NegativeQuantity(String),

    #[error("price must be positive: {0}")]
    NonPositivePrice(String),

    #[error("unknown currency code: '{0}'")]
    UnknownCurrency(String),

    #[error("invalid instrument id: '{0}'")]
    InvalidInstrumentId(String),

    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("order quantity {0} is not a multiple of size increment {1}")]
    QuantityNotOnIncrement(String, String),

    #[error("order price {0} is not a multiple of price increment {1}")]
    PriceNotOnIncrement(String, String),

    #[error("{kind} order requires a {field}")]
    MissingRequiredField { kind: String, field: String },

    #[error("{0}")]
    Other(String),

    #[error("failed to parse decimal: {0}")]
    ParseDecimal(#[from] rust_decimal::Error),

    #[error("failed to parse enum: {0}")]
    ParseEnum(#[from] strum::ParseError),
}

/// Errors raised by illegal order/position lifecycle transitions.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state trigger: cannot apply {trigger} to order {client_order_id} in state {current}")]
    InvalidStateTrigger {
        client_order_id: String,
        current: String,
        trigger: String,
    },

    #[error("invalid state trigger: cannot apply {trigger} to position {position_id} in state {current}")]
    InvalidPositionTrigger {
        position_id: String,
        current: String,
        trigger: String,
    },
}

/// Runtime refusals the matching engine or exchange issues as rejection events rather
/// than propagating; kept as a typed enum so callers can match on the reason, but
/// constructed for logging/introspection purposes — see spec §7.
#[derive(Debug, Error)]
pub enum RejectError {
    #[error("post-only order would have crossed the book at {price}")]
    PostOnlyWouldCross { price: String },

    #[error("reduce-only order would have increased position size")]
    ReduceOnlyWouldIncrease,

    #[error("stop order is already marketable on submission")]
    StopAlreadyMarketable,

    #[error("insufficient free balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("time in force {tif} is not supported for order kind {kind}")]
    UnsupportedTimeInForce { tif: String, kind: String },

    #[error("fill-or-kill order could not be filled in full: {0}")]
    FokNotFilled(String),

    #[error("order list {0} rejected: {1}")]
    OrderListRejected(String, String),
}

/// Errors raised when a referenced entity does not exist in a registry or index.
#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("instrument not found: {0}")]
    Instrument(String),

    #[error("order not found: {0}")]
    Order(String),

    #[error("position not found: {0}")]
    Position(String),

    #[error("account not found: {0}")]
    Account(String),

    #[error("order list not found: {0}")]
    OrderList(String),
}

/// Errors raised building a `SimConfig`/`ExchangeConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required configuration field: {0}")]
    MissingField(String),

    #[error("starting balance for currency '{0}' must be non-negative")]
    NegativeStartingBalance(String),
}

/// Errors indicating an internal invariant was violated; these should never occur and
/// signal a bug rather than a user or market condition.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("clock went backwards: {0}")]
    ClockRegression(String),

    #[error("duplicate identifier inserted into registry: {0}")]
    DuplicateId(String),
}
