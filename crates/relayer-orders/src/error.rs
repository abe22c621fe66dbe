use relayer_model::OrderId;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("invalid order{}: {reason}", order_id.map(|o| format!(" {o}")).unwrap_or_default())]
    Invalid {
        order_id: Option<OrderId>,
        reason: String,
    },

    #[error("order {0} already exists")]
    Duplicate(OrderId),

    #[error("no order found for {0}")]
    NotFound(OrderId),

    #[error("order {order_id} is {status}, expected {expected}")]
    WrongStatus {
        order_id: OrderId,
        status: &'static str,
        expected: &'static str,
    },

    #[error("order {order_id} desynced: {reason}")]
    Desync { order_id: OrderId, reason: String },

    #[error(transparent)]
    Auction(#[from] relayer_auction::AuctionError),

    #[error(transparent)]
    Secret(#[from] relayer_secrets::SecretError),

    /// The configured [`crate::store::StateStore`] failed a read or write.
    /// Never loses in-memory state: the manager's own indexes remain the
    /// source of truth, so a storage failure is surfaced but not fatal.
    #[error("state store error: {0}")]
    Storage(String),
}

impl OrderError {
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
}

impl From<OrderError> for relayer_model::RelayerError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Invalid { order_id, reason } => relayer_model::RelayerError::Invalid { order_id, reason },
            OrderError::Duplicate(order_id) => relayer_model::RelayerError::Duplicate {
                order_id: Some(order_id),
                reason: OrderError::Duplicate(order_id).to_string(),
            },
            OrderError::NotFound(order_id) => {
                relayer_model::RelayerError::not_found(order_id, OrderError::NotFound(order_id).to_string())
            }
            OrderError::WrongStatus { order_id, status, expected } => relayer_model::RelayerError::invalid_for(
                order_id,
                OrderError::WrongStatus { order_id, status, expected }.to_string(),
            ),
            OrderError::Desync { order_id, reason } => relayer_model::RelayerError::Desync {
                order_id: Some(order_id),
                reason,
            },
            OrderError::Auction(inner) => inner.into(),
            OrderError::Secret(inner) => inner.into(),
            OrderError::Storage(reason) => relayer_model::RelayerError::Transient { reason },
        }
    }
}
