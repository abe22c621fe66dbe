use relayer_model::OrderId;

#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("auction already exists for order {0}")]
    Duplicate(OrderId),

    #[error("no auction found for order {0}")]
    NotFound(OrderId),

    #[error("at most {0} concurrent auctions are allowed")]
    Capacity(usize),

    #[error("auction for order {order_id} is {status}, expected {expected}")]
    WrongStatus {
        order_id: OrderId,
        status: &'static str,
        expected: &'static str,
    },

    #[error("bid for order {order_id} rejected: {reason}")]
    BidRejected { order_id: OrderId, reason: String },

    #[error("rate source error: {0}")]
    RateSource(String),
}

impl From<AuctionError> for relayer_model::RelayerError {
    fn from(err: AuctionError) -> Self {
        match &err {
            AuctionError::Duplicate(order_id) => relayer_model::RelayerError::Duplicate {
                order_id: Some(*order_id),
                reason: err.to_string(),
            },
            AuctionError::NotFound(order_id) => {
                relayer_model::RelayerError::not_found(*order_id, err.to_string())
            }
            AuctionError::Capacity(_) => relayer_model::RelayerError::Capacity {
                reason: err.to_string(),
            },
            AuctionError::WrongStatus { order_id, .. } | AuctionError::BidRejected { order_id, .. } => {
                relayer_model::RelayerError::invalid_for(*order_id, err.to_string())
            }
            AuctionError::RateSource(_) => relayer_model::RelayerError::transient(err.to_string()),
        }
    }
}
