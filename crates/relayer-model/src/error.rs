use crate::ids::OrderId;

/// The error taxonomy shared by every component. Kinds, not type names:
/// each component wraps its own richer error type but converts into this
/// enum at its public boundary.
#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    /// Input violates a stated precondition. Surfaced to the caller, never
    /// retried.
    #[error("invalid request{}: {reason}", order_id.map(|o| format!(" for order {o}")).unwrap_or_default())]
    Invalid {
        order_id: Option<OrderId>,
        reason: String,
    },

    /// Idempotency conflict (order already exists, auction already started).
    #[error("duplicate{}: {reason}", order_id.map(|o| format!(" for order {o}")).unwrap_or_default())]
    Duplicate {
        order_id: Option<OrderId>,
        reason: String,
    },

    /// A resource cap was reached. Caller may retry later.
    #[error("capacity exceeded: {reason}")]
    Capacity { reason: String },

    /// Unknown order id / tx hash.
    #[error("not found{}: {reason}", order_id.map(|o| format!(" for order {o}")).unwrap_or_default())]
    NotFound {
        order_id: Option<OrderId>,
        reason: String,
    },

    /// Chain RPC timeout, 5xx, or rate-limit. Retried with backoff up to the
    /// configured retry budget; never fatal to the caller's loop.
    #[error("transient error: {reason}")]
    Transient { reason: String },

    /// An event arrived inconsistent with the state machine. The affected
    /// order is marked `Failed` and the incident logged.
    #[error("desync{}: {reason}", order_id.map(|o| format!(" for order {o}")).unwrap_or_default())]
    Desync {
        order_id: Option<OrderId>,
        reason: String,
    },

    /// A scheduled operation missed its deadline. Treated like `Desync` for
    /// the affected order.
    #[error("timeout: {reason}")]
    Timeout { reason: String },
}

impl RelayerError {
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            RelayerError::Invalid { order_id, .. }
            | RelayerError::Duplicate { order_id, .. }
            | RelayerError::NotFound { order_id, .. }
            | RelayerError::Desync { order_id, .. } => *order_id,
            RelayerError::Capacity { .. }
            | RelayerError::Transient { .. }
            | RelayerError::Timeout { .. } => None,
        }
    }

    /// Whether an automated caller should retry this error after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayerError::Transient { .. })
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            order_id: None,
            reason: reason.into(),
        }
    }

    pub fn invalid_for(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self::Invalid {
            order_id: Some(order_id),
            reason: reason.into(),
        }
    }

    pub fn not_found(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self::NotFound {
            order_id: Some(order_id),
            reason: reason.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }
}
