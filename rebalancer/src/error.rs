//! Error types for the rebalancer.

use std::path::PathBuf;

use log::warn;
use longshort_broker::BrokerError;

/// All errors that can escape a rebalancer operation.
///
/// Per-instrument gateway failures (missing bars, rejected orders, orders
/// already gone) are handled inside the phase that hit them and never show
/// up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("missing credentials: {0}")]
    Credentials(String),

    #[error("gateway unreachable: {0}")]
    Connection(String),

    /// A gateway call outside any rebalance phase failed for a reason other
    /// than connectivity.
    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Lift a gateway failure that must abort the cycle.
pub fn connection(err: BrokerError) -> Error {
    Error::Connection(err.to_string())
}

/// Lift any gateway failure, keeping connectivity loss distinct.
pub fn gateway(err: BrokerError) -> Error {
    if err.is_connectivity() {
        connection(err)
    } else {
        Error::Gateway(err.to_string())
    }
}

/// Inside a phase: connectivity loss escapes, anything else is logged and
/// comes back as `Ok(None)` for the phase to handle.
pub fn recoverable<T>(result: std::result::Result<T, BrokerError>, what: &str) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_connectivity() => Err(connection(e)),
        Err(e) => {
            warn!("{what}: {e}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_splits_by_kind() {
        assert_eq!(recoverable(Ok::<_, BrokerError>(3), "x").unwrap(), Some(3));
        assert!(recoverable::<()>(Err(BrokerError::RateLimit), "x").unwrap().is_none());
        assert!(matches!(
            recoverable::<()>(Err(BrokerError::NotConnected), "x"),
            Err(Error::Connection(_))
        ));
    }

    #[test]
    fn gateway_keeps_connectivity_distinct() {
        assert!(matches!(gateway(BrokerError::Auth("bad key".into())), Error::Connection(_)));
        assert!(matches!(gateway(BrokerError::RateLimit), Error::Gateway(_)));
    }
}
