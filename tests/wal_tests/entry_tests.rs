//! Tests for log entry encoding
//!
//! These tests verify:
//! - The header layout: lsn, checksum, body length
//! - Decoding rejects short, truncated and tampered input
//! - Empty keys and values survive encoding

use handlekv::wal::{Operation, WalEntry, HEADER_SIZE};
use handlekv::KvError;

fn sample(lsn: u64) -> WalEntry {
    WalEntry::new(
        lsn,
        Operation::Put {
            key: b"hello".to_vec(),
            value: b"world".to_vec(),
        },
    )
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_header_carries_lsn_and_length() {
    let entry = sample(0x0102_0304_0506_0708);
    let bytes = entry.serialize().unwrap();

    assert_eq!(&bytes[0..8], &0x0102_0304_0506_0708u64.to_le_bytes());
    let len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + len);
    assert_eq!(entry.serialized_size().unwrap(), bytes.len());
}

#[test]
fn test_decode_restores_entry() {
    let entry = WalEntry::new(9, Operation::Delete { key: b"gone".to_vec() });
    let decoded = WalEntry::deserialize(&entry.serialize().unwrap()).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn test_empty_key_and_value() {
    let entry = WalEntry::new(
        1,
        Operation::Put {
            key: Vec::new(),
            value: Vec::new(),
        },
    );
    let decoded = WalEntry::deserialize(&entry.serialize().unwrap()).unwrap();
    assert_eq!(decoded.operation, entry.operation);
}

#[test]
fn test_decode_ignores_bytes_after_entry() {
    let entry = sample(3);
    let mut bytes = entry.serialize().unwrap();
    bytes.extend_from_slice(&sample(4).serialize().unwrap());

    assert_eq!(WalEntry::deserialize(&bytes).unwrap().lsn, 3);
}

// =============================================================================
// Rejection
// =============================================================================

#[test]
fn test_short_header_rejected() {
    let bytes = sample(1).serialize().unwrap();
    let result = WalEntry::deserialize(&bytes[..HEADER_SIZE - 1]);
    assert!(matches!(result, Err(KvError::WalCorruption(_))));
}

#[test]
fn test_truncated_body_rejected() {
    let bytes = sample(1).serialize().unwrap();
    let result = WalEntry::deserialize(&bytes[..bytes.len() - 1]);
    assert!(matches!(result, Err(KvError::WalCorruption(_))));
}

#[test]
fn test_flipped_body_byte_rejected() {
    let mut bytes = sample(1).serialize().unwrap();
    bytes[HEADER_SIZE + 2] ^= 0x40;
    match WalEntry::deserialize(&bytes) {
        Err(KvError::WalCorruption(msg)) => assert!(msg.contains("CRC")),
        other => panic!("expected corruption, got {:?}", other),
    }
}

#[test]
fn test_rewritten_lsn_rejected() {
    // The checksum covers the lsn, so renumbering an entry is detected
    let mut bytes = sample(1).serialize().unwrap();
    bytes[0] = 2;
    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(KvError::WalCorruption(_))
    ));
}
