//! Gateway error types.

/// Errors that can occur during gateway operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("not connected")]
    NotConnected,

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("rate limit exceeded")]
    RateLimit,

    /// No bars (or no usable price) came back for a symbol.
    #[error("no data for {0}")]
    DataUnavailable(String),

    /// The broker declined an order (buying power, asset restriction, ...).
    #[error("order for {symbol} rejected: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("order {0} already filled")]
    AlreadyFilled(String),

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("{0}")]
    Other(String),
}

impl BrokerError {
    /// True when the gateway could not be reached at all.
    ///
    /// These are the only errors a rebalance phase lets escape; everything
    /// else is handled per item.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            BrokerError::Connection(_) | BrokerError::NotConnected | BrokerError::Auth(_)
        )
    }

    /// True for cancellation outcomes that mean "nothing left to cancel".
    pub fn is_already_gone(&self) -> bool {
        matches!(
            self,
            BrokerError::OrderNotFound(_) | BrokerError::AlreadyFilled(_)
        )
    }
}
