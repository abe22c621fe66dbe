//! Minimal ABI decoding for the three events the core cares about. Each log
//! is a fixed, known shape (the signatures hashed in `relayer_chain::topics`),
//! so this reads the 32-byte words directly rather than pulling in a general
//! ABI-decoding dependency for three fixed layouts.

use relayer_model::{Address, Hash32};

#[derive(Debug)]
pub struct EscrowCreatedData {
    pub order_id: Hash32,
    pub resolver: Address,
    pub amount: u128,
    pub secret_hash: Hash32,
    pub timelock: u64,
}

#[derive(Debug)]
pub struct RedeemedData {
    pub order_id: Hash32,
    pub secret: Hash32,
    pub redeemer: Address,
}

#[derive(Debug)]
pub struct RefundedData {
    pub order_id: Hash32,
    pub refunder: Address,
}

fn word(data: &[u8], index: usize) -> Option<&[u8; 32]> {
    let start = index * 32;
    data.get(start..start + 32)?.try_into().ok()
}

fn address_from_word(word: &[u8; 32]) -> Address {
    Address::new(format!("0x{}", hex::encode(&word[12..32])))
}

fn u128_from_word(word: &[u8; 32]) -> u128 {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..32]);
    u128::from_be_bytes(bytes)
}

fn u64_from_word(word: &[u8; 32]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..32]);
    u64::from_be_bytes(bytes)
}

fn address_from_topic(topic: &Hash32) -> Address {
    let bytes: [u8; 32] = topic.into_bytes();
    address_from_word(&bytes)
}

/// `topics[1]` is the indexed `orderId`. Non-indexed fields
/// `(resolver, amount, secretHash, timelock)` are ABI-encoded in `data` as
/// four 32-byte words, in that order.
pub fn escrow_created(topics: &[Hash32], data: &[u8]) -> Result<EscrowCreatedData, String> {
    let order_id = *topics.get(1).ok_or("EscrowCreated: missing orderId topic")?;
    let resolver = address_from_word(word(data, 0).ok_or("EscrowCreated: missing resolver word")?);
    let amount = u128_from_word(word(data, 1).ok_or("EscrowCreated: missing amount word")?);
    let secret_hash =
        Hash32::new(*word(data, 2).ok_or("EscrowCreated: missing secretHash word")?);
    let timelock = u64_from_word(word(data, 3).ok_or("EscrowCreated: missing timelock word")?);
    Ok(EscrowCreatedData {
        order_id,
        resolver,
        amount,
        secret_hash,
        timelock,
    })
}

/// `topics[1]` is `orderId`, `topics[2]` is the revealed `secret`.
/// `redeemer` is the sole non-indexed field.
pub fn redeemed(topics: &[Hash32], data: &[u8]) -> Result<RedeemedData, String> {
    let order_id = *topics.get(1).ok_or("Redeemed: missing orderId topic")?;
    let secret = *topics.get(2).ok_or("Redeemed: missing secret topic")?;
    let redeemer = address_from_word(word(data, 0).ok_or("Redeemed: missing redeemer word")?);
    Ok(RedeemedData {
        order_id,
        secret,
        redeemer,
    })
}

/// `topics[1]` is `orderId`; `refunder` is emitted as a second indexed topic
/// rather than in `data` (the event has no other fields to pad it out to a
/// word boundary).
pub fn refunded(topics: &[Hash32]) -> Result<RefundedData, String> {
    let order_id = *topics.get(1).ok_or("Refunded: missing orderId topic")?;
    let refunder_topic = topics.get(2).ok_or("Refunded: missing refunder topic")?;
    Ok(RefundedData {
        order_id,
        refunder: address_from_topic(refunder_topic),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_bytes(fill: u8) -> [u8; 32] {
        let mut b = [0u8; 32];
        b[31] = fill;
        b
    }

    #[test]
    fn decodes_escrow_created() {
        let order_id = Hash32::new([1u8; 32]);
        let mut resolver_word = [0u8; 32];
        resolver_word[12..32].copy_from_slice(&[0xab; 20]);
        let mut amount_word = [0u8; 32];
        amount_word[16..32].copy_from_slice(&1_000_000u128.to_be_bytes());
        let secret_hash_word = [2u8; 32];
        let mut timelock_word = [0u8; 32];
        timelock_word[24..32].copy_from_slice(&1_700_000_000u64.to_be_bytes());

        let mut data = Vec::new();
        data.extend_from_slice(&resolver_word);
        data.extend_from_slice(&amount_word);
        data.extend_from_slice(&secret_hash_word);
        data.extend_from_slice(&timelock_word);

        let topics = vec![Hash32::ZERO, order_id];
        let decoded = escrow_created(&topics, &data).unwrap();
        assert_eq!(decoded.order_id, order_id);
        assert_eq!(decoded.amount, 1_000_000);
        assert_eq!(decoded.timelock, 1_700_000_000);
        assert_eq!(decoded.secret_hash, Hash32::new(secret_hash_word));
    }

    #[test]
    fn rejects_truncated_data() {
        let topics = vec![Hash32::ZERO, Hash32::new(word_bytes(1))];
        assert!(escrow_created(&topics, &[0u8; 32]).is_err());
    }
}
