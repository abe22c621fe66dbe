use relayer_model::OrderId;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret for order {order_id} index {index} already stored")]
    AlreadyStored { order_id: OrderId, index: u32 },

    #[error("no secret stored for order {order_id} index {index}")]
    NotFound { order_id: OrderId, index: u32 },

    #[error("secret for order {order_id} index {index} is {status}, expected {expected}")]
    WrongStatus {
        order_id: OrderId,
        index: u32,
        status: &'static str,
        expected: &'static str,
    },

    #[error("reveal requested before revealAt for order {order_id} index {index}")]
    TooEarly { order_id: OrderId, index: u32 },

    #[error("secret must be exactly 32 bytes, got {0}")]
    WrongLength(usize),

    #[error("encryption failure: {0}")]
    Crypto(String),

    #[error("no merkle tree registered for order {0}")]
    NoTree(OrderId),

    #[error("merkle tree for order {0} already registered")]
    TreeAlreadyExists(OrderId),

    #[error("fill index {0} out of range for a tree of {1} leaves")]
    FillIndexOutOfRange(u32, usize),

    #[error("partial fill window for order {0} has expired")]
    PartialFillExpired(OrderId),
}

impl From<SecretError> for relayer_model::RelayerError {
    fn from(err: SecretError) -> Self {
        match &err {
            SecretError::AlreadyStored { order_id, .. } | SecretError::TreeAlreadyExists(order_id) => {
                relayer_model::RelayerError::Duplicate {
                    order_id: Some(*order_id),
                    reason: err.to_string(),
                }
            }
            SecretError::NotFound { order_id, .. } | SecretError::NoTree(order_id) => {
                relayer_model::RelayerError::not_found(*order_id, err.to_string())
            }
            SecretError::WrongStatus { order_id, .. } | SecretError::TooEarly { order_id, .. } => {
                relayer_model::RelayerError::invalid_for(*order_id, err.to_string())
            }
            SecretError::WrongLength(_) | SecretError::Crypto(_) | SecretError::FillIndexOutOfRange(..) => {
                relayer_model::RelayerError::invalid(err.to_string())
            }
            SecretError::PartialFillExpired(order_id) => {
                relayer_model::RelayerError::invalid_for(*order_id, err.to_string())
            }
        }
    }
}
