//! Record Codec Tests
//!
//! Tests verify:
//! - Keys and values survive encoding for structured serde types
//! - Keys are never compressed
//! - The compressed frame carries the uncompressed length
//! - Short, truncated and malformed input is a codec error
//! - Record modes and buffer reuse

use std::collections::BTreeMap;

use handlekv::codec::{Record, RecordCodec, RecordMode, FRAME_HEADER_SIZE};
use handlekv::{Config, KvError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    age: u32,
    tags: Vec<String>,
    scores: BTreeMap<String, f64>,
}

fn profile() -> Profile {
    let mut scores = BTreeMap::new();
    scores.insert("math".to_string(), 91.5);
    scores.insert("art".to_string(), 77.0);
    Profile {
        name: "Ada".to_string(),
        age: 36,
        tags: vec!["engineer".to_string(); 40],
        scores,
    }
}

fn codecs() -> Vec<RecordCodec> {
    let mut codecs = vec![RecordCodec::plain()];
    if cfg!(feature = "compression") {
        codecs.push(RecordCodec::compressed(3));
    }
    codecs
}

// =============================================================================
// Keys and values
// =============================================================================

#[test]
fn test_structured_value_survives() {
    for codec in codecs() {
        let bytes = codec.encode_value(&profile()).unwrap();
        let decoded: Profile = codec.decode_value(&bytes).unwrap();
        assert_eq!(decoded, profile());
    }
}

#[test]
fn test_tuple_key_survives() {
    let codec = RecordCodec::default();
    let key = ("users", 42u64);
    let bytes = codec.encode_key(&key).unwrap();
    let decoded: (String, u64) = codec.decode_key(&bytes).unwrap();
    assert_eq!(decoded, ("users".to_string(), 42));
}

#[test]
fn test_keys_identical_with_and_without_compression() {
    let plain = RecordCodec::plain().encode_key("same-key").unwrap();
    let other = RecordCodec::compressed(19).encode_key("same-key").unwrap();
    assert_eq!(plain, other);
}

#[test]
fn test_equal_length_string_keys_sort_naturally() {
    let codec = RecordCodec::plain();
    let a = codec.encode_key("apple").unwrap();
    let b = codec.encode_key("berry").unwrap();
    assert!(a < b);
}

#[test]
fn test_trailing_bytes_rejected() {
    let codec = RecordCodec::plain();
    let mut bytes = codec.encode_key(&7u32).unwrap();
    bytes.push(0);
    let result: Result<u32, KvError> = codec.decode_key(&bytes);
    assert!(matches!(result, Err(KvError::Codec(_))));
}

#[test]
fn test_wrong_type_rejected() {
    let codec = RecordCodec::plain();
    let bytes = codec.encode_value(&1u8).unwrap();
    let result: Result<String, KvError> = codec.decode_value(&bytes);
    assert!(matches!(result, Err(KvError::Codec(_))));
}

// =============================================================================
// Compressed frame
// =============================================================================

#[cfg(feature = "compression")]
#[test]
fn test_frame_prefix_is_uncompressed_length() {
    let plain = RecordCodec::plain().encode_value(&profile()).unwrap();
    let framed = RecordCodec::compressed(3).encode_value(&profile()).unwrap();

    let mut prefix = [0u8; FRAME_HEADER_SIZE];
    prefix.copy_from_slice(&framed[..FRAME_HEADER_SIZE]);
    assert_eq!(u32::from_le_bytes(prefix) as usize, plain.len());

    // 40 repeated tags compress well
    assert!(framed.len() < plain.len());
}

#[cfg(feature = "compression")]
#[test]
fn test_frame_no_longer_than_header_rejected() {
    let codec = RecordCodec::compressed(3);
    for len in 0..=FRAME_HEADER_SIZE {
        let result: Result<String, KvError> = codec.decode_value(&vec![1u8; len]);
        assert!(matches!(result, Err(KvError::Codec(_))), "len {}", len);
    }
}

#[cfg(feature = "compression")]
#[test]
fn test_corrupt_payload_rejected() {
    let codec = RecordCodec::compressed(3);
    let mut framed = codec.encode_value(&profile()).unwrap();
    for byte in framed[FRAME_HEADER_SIZE..].iter_mut() {
        *byte = 0xEE;
    }
    let result: Result<Profile, KvError> = codec.decode_value(&framed);
    assert!(matches!(result, Err(KvError::Codec(_))));
}

#[cfg(feature = "compression")]
#[test]
fn test_plain_codec_cannot_read_compressed_value() {
    let framed = RecordCodec::compressed(3).encode_value("text").unwrap();
    let result: Result<String, KvError> = RecordCodec::plain().decode_value(&framed);
    assert!(result.is_err());
}

#[test]
fn test_codec_follows_config() {
    let off = Config::builder().compress_values(false).build();
    assert!(!RecordCodec::from_config(&off).is_compressing());

    let on = Config::builder().compress_values(true).compression_level(5).build();
    assert_eq!(RecordCodec::from_config(&on), RecordCodec::compressed(5));
}

// =============================================================================
// Records
// =============================================================================

#[test]
fn test_record_modes() {
    let codec = RecordCodec::plain();

    let scratch = Record::scratch();
    assert_eq!(scratch.mode(), RecordMode::Scratch);
    assert!(!scratch.is_filled());

    let lookup = Record::encode_lookup(&codec, "k").unwrap();
    assert_eq!(lookup.mode(), RecordMode::Lookup);
    assert!(lookup.value().is_empty());
    assert!(!lookup.is_filled());

    let store = Record::encode_store(&codec, "k", &5u16).unwrap();
    assert_eq!(store.mode(), RecordMode::Store);
    assert_eq!(store.key(), lookup.key());
    assert_eq!(store.decode_value::<u16>(&codec).unwrap(), 5);
}

#[test]
fn test_fill_replaces_previous_pair() {
    let codec = RecordCodec::plain();
    let mut record = Record::scratch();

    let long = Record::encode_store(&codec, "a-long-key", "a-long-value").unwrap();
    record.fill(long.key(), long.value());
    let short = Record::encode_store(&codec, "k", "v").unwrap();
    record.fill(short.key(), short.value());

    assert!(record.is_filled());
    assert_eq!(record.decode_key::<String>(&codec).unwrap(), "k");
    assert_eq!(record.decode_value::<String>(&codec).unwrap(), "v");
    assert_eq!(record.key(), short.key());
    assert_eq!(record.value(), short.value());
}
