//! Stores encrypted preimages, builds Merkle secret trees for partial-fill
//! orders, and runs the reveal scheduler. See [`coordinator::SecretCoordinator`].

pub mod coordinator;
pub mod crypto;
pub mod error;
pub mod merkle;
pub mod types;

pub use coordinator::{RevealSink, SecretCoordinator, SecretCoordinatorConfig};
pub use crypto::SecretCipher;
pub use error::SecretError;
pub use merkle::{MerkleSecretTree, verify_proof};
pub use types::{PartialFillInfo, SecretStatus, StoredSecret};

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use relayer_model::OrderId;

    use super::*;

    fn coordinator() -> SecretCoordinator {
        SecretCoordinator::new(
            SecretCipher::new([42u8; 32]),
            SecretCoordinatorConfig {
                default_reveal_delay: Duration::from_secs(0),
                ..SecretCoordinatorConfig::default()
            },
            None,
        )
    }

    #[tokio::test]
    async fn store_then_reveal_round_trips_the_secret() {
        let coordinator = coordinator();
        let order_id = OrderId::new([1u8; 32]);
        let secret = [5u8; 32];

        coordinator.store(order_id, &secret, 0, None).await.unwrap();
        coordinator
            .schedule_reveal(order_id, 0, Some(Duration::ZERO))
            .await
            .unwrap();
        let revealed = coordinator.reveal(order_id, 0).await.unwrap();
        assert_eq!(&revealed[..], &secret[..]);
    }

    #[tokio::test]
    async fn reveal_before_schedule_is_rejected() {
        let coordinator = coordinator();
        let order_id = OrderId::new([2u8; 32]);
        coordinator.store(order_id, &[1u8; 32], 0, None).await.unwrap();
        let err = coordinator.reveal(order_id, 0).await.unwrap_err();
        assert!(matches!(err, SecretError::WrongStatus { .. }));
    }

    #[tokio::test]
    async fn reveal_before_delay_elapses_is_rejected() {
        let coordinator = coordinator();
        let order_id = OrderId::new([3u8; 32]);
        coordinator.store(order_id, &[1u8; 32], 0, None).await.unwrap();
        coordinator
            .schedule_reveal(order_id, 0, Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        let err = coordinator.reveal(order_id, 0).await.unwrap_err();
        assert!(matches!(err, SecretError::TooEarly { .. }));
    }

    #[tokio::test]
    async fn second_reveal_of_same_secret_fails() {
        let coordinator = coordinator();
        let order_id = OrderId::new([4u8; 32]);
        coordinator.store(order_id, &[1u8; 32], 0, None).await.unwrap();
        coordinator
            .schedule_reveal(order_id, 0, Some(Duration::ZERO))
            .await
            .unwrap();
        coordinator.reveal(order_id, 0).await.unwrap();
        let err = coordinator.reveal(order_id, 0).await.unwrap_err();
        assert!(matches!(err, SecretError::WrongStatus { .. }));
    }

    #[tokio::test]
    async fn store_rejects_wrong_length_secrets() {
        let coordinator = coordinator();
        let order_id = OrderId::new([6u8; 32]);
        let err = coordinator
            .store(order_id, &[1u8; 16], 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SecretError::WrongLength(16)));
    }

    #[tokio::test]
    async fn partial_fill_tree_has_max_fills_plus_one_leaves() {
        let coordinator = coordinator();
        let order_id = OrderId::new([9u8; 32]);
        let tree = coordinator.setup_partial_fill(order_id, 4).await.unwrap();
        assert_eq!(tree.leaves.len(), 5);
    }

    #[tokio::test]
    async fn coordinate_partial_reveal_yields_a_verifying_proof() {
        let coordinator = Arc::new(coordinator());
        let order_id = OrderId::new([11u8; 32]);
        let tree = coordinator.setup_partial_fill(order_id, 4).await.unwrap();
        coordinator
            .schedule_reveal(order_id, 2, Some(Duration::ZERO))
            .await
            .unwrap();

        let info = coordinator
            .coordinate_partial_reveal(order_id, 2, 250_000)
            .await
            .unwrap();
        let leaf = merkle::hash_leaf(&info.plaintext);
        assert!(verify_proof(&leaf, 2, &info.proof, &tree.root));
    }
}
