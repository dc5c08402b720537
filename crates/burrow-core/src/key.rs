//! Binary keys and the XOR distance metric
//!
//! A [`BinaryKey`] is an immutable bit vector of fixed, non-zero length.
//! Bit index equals significance: bit 0 is the least significant bit, so
//! the hex representation reads least-significant byte first. All keys
//! that are compared or XORed together must share the same bit length.

use crate::{Error, Result, MAX_HASH_BITS};
use bitvec::prelude::*;
use sha1::{Digest, Sha1};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable fixed-length bit vector identifying nodes and resources.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryKey {
    bits: BitVec<u8, Lsb0>,
}

impl BinaryKey {
    /// Wraps a bit vector as a key. Zero-length vectors are rejected.
    pub fn from_bits(bits: BitVec<u8, Lsb0>) -> Result<Self> {
        if bits.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Self { bits })
    }

    /// Builds a key from raw bytes, least-significant byte first.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_bits(BitVec::from_vec(bytes))
    }

    /// Decodes a key from its canonical lowercase hex representation.
    ///
    /// Fails on odd-length input or non-hex characters.
    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text).map_err(|e| Error::InvalidHex(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Non-cryptographic variable-width hash of a string.
    ///
    /// Replicates the classic accumulator string hash on 64 bits, then
    /// expands it deterministically word by word. `bits` must be a
    /// positive multiple of 64.
    ///
    /// This hash is NOT collision resistant; it is meant for short or
    /// synthetic identifiers, never for anything security relevant.
    pub fn hash_str(text: &str, bits: usize) -> Result<Self> {
        if bits == 0 || bits % 64 != 0 {
            return Err(Error::InvalidHashWidth { requested: bits });
        }
        let word_count = bits / 64;
        let seed = string_accumulator(text);
        let mut words = vec![0u64; word_count];
        for i in 0..word_count {
            // Most significant word first: word j holds seed / (count - j).
            let quotient = seed.wrapping_div(i as i64 + 1);
            words[word_count - 1 - i] = (quotient as f64).to_bits();
        }
        let mut bytes = Vec::with_capacity(bits / 8);
        for word in &words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        Self::from_bytes(bytes)
    }

    /// Cryptographic hash of a byte sequence, truncated to at most 160 bits.
    ///
    /// `bits` must be in `(0, 160]`; the digest is truncated to whole
    /// bytes, so the resulting key length is `(bits / 8) * 8`.
    pub fn hash_bytes(data: &[u8], bits: usize) -> Result<Self> {
        if bits == 0 || bits > MAX_HASH_BITS {
            return Err(Error::InvalidHashWidth { requested: bits });
        }
        let digest = Sha1::digest(data);
        let take = bits / 8;
        if take == 0 {
            return Err(Error::EmptyKey);
        }
        Self::from_bytes(digest[..take].to_vec())
    }

    /// Generates a uniformly random key. `bits` must be a positive
    /// multiple of 8.
    pub fn random(bits: usize) -> Result<Self> {
        if bits == 0 || bits % 8 != 0 {
            return Err(Error::InvalidHashWidth { requested: bits });
        }
        let mut bytes = vec![0u8; bits / 8];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        Self::from_bytes(bytes)
    }

    /// Number of bits in the key.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// True if no bit is set.
    pub fn is_zero(&self) -> bool {
        self.bits.not_any()
    }

    /// Index of the highest set bit, `None` when the key is all-zero.
    pub fn leading_one(&self) -> Option<usize> {
        self.bits.last_one()
    }

    /// XOR distance to another key of the same length.
    pub fn distance(&self, other: &BinaryKey) -> Result<BinaryKey> {
        if self.len() != other.len() {
            return Err(Error::LengthMismatch {
                expected: self.len(),
                actual: other.len(),
            });
        }
        let mut bits = self.bits.clone();
        for (index, rhs) in other.bits.iter().by_vals().enumerate() {
            let lhs = bits[index];
            bits.set(index, lhs ^ rhs);
        }
        Ok(Self { bits })
    }

    /// Packs the key into bytes, least-significant byte first. Trailing
    /// bits of a partial final byte are zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; (self.len() + 7) / 8];
        for (index, bit) in self.bits.iter().by_vals().enumerate() {
            if bit {
                bytes[index / 8] |= 1 << (index % 8);
            }
        }
        bytes
    }

    /// Canonical lowercase hex representation, two digits per byte.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// The classic accumulator string hash, widened to 64 bits.
fn string_accumulator(text: &str) -> i64 {
    let length = text.chars().count();
    let mut acc: i64 = 0;
    for (i, c) in text.chars().enumerate() {
        let weight = 63i64 ^ (length - i - 1) as i64;
        acc = acc.wrapping_add((c as i64).wrapping_mul(weight));
    }
    acc
}

impl Ord for BinaryKey {
    /// Unsigned total ordering via the XOR trick: the highest bit at
    /// which two equal-length keys differ decides; the key with that bit
    /// set is the greater. Keys of different lengths order by length
    /// first (ordered containers never mix lengths in practice).
    fn cmp(&self, other: &Self) -> Ordering {
        match self.len().cmp(&other.len()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match self.distance(other) {
            Ok(d) => match d.leading_one() {
                None => Ordering::Equal,
                Some(i) => {
                    if self.bits[i] {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    }
                }
            },
            // Unreachable: lengths were checked above.
            Err(_) => Ordering::Equal,
        }
    }
}

impl PartialOrd for BinaryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for BinaryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        self.to_bytes().hash(state);
    }
}

impl fmt::Debug for BinaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryKey({} bits, {})", self.len(), self.to_hex())
    }
}

impl fmt::Display for BinaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A short key built from a numeric value, bit 0 = LSB.
    fn key(value: u8, bits: usize) -> BinaryKey {
        let mut v: BitVec<u8, Lsb0> = BitVec::new();
        for i in 0..bits {
            v.push(value >> i & 1 == 1);
        }
        BinaryKey::from_bits(v).unwrap()
    }

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(
            BinaryKey::from_bits(BitVec::new()),
            Err(Error::EmptyKey)
        ));
    }

    #[test]
    fn distance_is_symmetric_and_self_inverse() {
        let a = BinaryKey::hash_bytes(b"alpha", 64).unwrap();
        let b = BinaryKey::hash_bytes(b"beta", 64).unwrap();

        let ab = a.distance(&b).unwrap();
        let ba = b.distance(&a).unwrap();
        assert_eq!(ab, ba);

        // distance(a, a) is all-zero
        assert!(a.distance(&a).unwrap().is_zero());

        // distance is its own inverse
        assert_eq!(ab.distance(&b).unwrap(), a);
    }

    #[test]
    fn distance_rejects_length_mismatch() {
        let a = key(5, 3);
        let b = key(5, 4);
        assert!(matches!(
            a.distance(&b),
            Err(Error::LengthMismatch { expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn ordering_matches_numeric_value_for_all_3_bit_pairs() {
        for x in 0u8..8 {
            for y in 0u8..8 {
                let kx = key(x, 3);
                let ky = key(y, 3);
                assert_eq!(kx.cmp(&ky), x.cmp(&y), "keys {x} vs {y}");
            }
        }
    }

    #[test]
    fn leading_one() {
        assert_eq!(key(0, 3).leading_one(), None);
        assert_eq!(key(1, 3).leading_one(), Some(0));
        assert_eq!(key(6, 3).leading_one(), Some(2));
    }

    #[test]
    fn hex_roundtrip() {
        let bytes = vec![0x00, 0xff, 0x3a, 0x07];
        let k = BinaryKey::from_bytes(bytes.clone()).unwrap();
        assert_eq!(k.to_hex(), "00ff3a07");
        let back = BinaryKey::from_hex(&k.to_hex()).unwrap();
        assert_eq!(back, k);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn hex_decode_failures() {
        assert!(matches!(BinaryKey::from_hex("abc"), Err(Error::InvalidHex(_))));
        assert!(matches!(BinaryKey::from_hex("zz"), Err(Error::InvalidHex(_))));
        // Empty input decodes to an empty key, which is invalid.
        assert!(matches!(BinaryKey::from_hex(""), Err(Error::EmptyKey)));
    }

    #[test]
    fn string_hash_width_validation() {
        assert!(BinaryKey::hash_str("peer", 0).is_err());
        assert!(BinaryKey::hash_str("peer", 65).is_err());
        let k = BinaryKey::hash_str("peer", 128).unwrap();
        assert_eq!(k.len(), 128);
    }

    #[test]
    fn string_hash_is_deterministic() {
        let a = BinaryKey::hash_str("+39892424", 128).unwrap();
        let b = BinaryKey::hash_str("+39892424", 128).unwrap();
        assert_eq!(a, b);
        let c = BinaryKey::hash_str("+39892425", 128).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn crypto_hash_width_validation() {
        assert!(BinaryKey::hash_bytes(b"x", 0).is_err());
        assert!(BinaryKey::hash_bytes(b"x", 161).is_err());
        assert_eq!(BinaryKey::hash_bytes(b"x", 160).unwrap().len(), 160);
        assert_eq!(BinaryKey::hash_bytes(b"x", 128).unwrap().len(), 128);
    }

    #[test]
    fn crypto_hash_is_a_sha1_prefix() {
        let full = BinaryKey::hash_bytes(b"resource-name", 160).unwrap();
        let short = BinaryKey::hash_bytes(b"resource-name", 64).unwrap();
        assert_eq!(full.to_bytes()[..8], short.to_bytes()[..]);
    }

    #[test]
    fn random_keys_have_requested_length() {
        let k = BinaryKey::random(128).unwrap();
        assert_eq!(k.len(), 128);
        assert!(BinaryKey::random(3).is_err());
        assert!(BinaryKey::random(0).is_err());
    }
}
