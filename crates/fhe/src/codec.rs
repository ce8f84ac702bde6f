// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{FheError, Result};
use alloy::primitives::{Bytes, U256};

const WORD: usize = 32;

/// ABI encode clear values the way `abi.encode(uint256, ...)` does: one big endian word each
pub fn encode_clear_values(values: &[u64]) -> Bytes {
    let mut bytes = Vec::with_capacity(values.len() * WORD);
    for value in values {
        bytes.extend_from_slice(&U256::from(*value).to_be_bytes::<WORD>());
    }
    Bytes::from(bytes)
}

/// Decode ABI encoded clear values. Every word must fit in a u64.
pub fn decode_clear_values(bytes: &[u8]) -> Result<Vec<u64>> {
    if bytes.is_empty() || bytes.len() % WORD != 0 {
        return Err(FheError::BadEncoding);
    }

    bytes
        .chunks_exact(WORD)
        .map(|word| {
            let value = U256::from_be_slice(word);
            u64::try_from(value).map_err(|_| FheError::BadEncoding)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_word_layout() {
        let encoded = encode_clear_values(&[154]);
        assert_eq!(encoded.len(), 32);
        assert_eq!(encoded[31], 154);
        assert!(encoded[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(
            decode_clear_values(&[]),
            Err(FheError::BadEncoding)
        ));
        assert!(matches!(
            decode_clear_values(&[0u8; 33]),
            Err(FheError::BadEncoding)
        ));
    }

    #[test]
    fn test_rejects_oversized_word() {
        let mut word = [0u8; 32];
        word[0] = 1;
        assert!(matches!(
            decode_clear_values(&word),
            Err(FheError::BadEncoding)
        ));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(values in prop::collection::vec(any::<u64>(), 1..8)) {
            let decoded = decode_clear_values(&encode_clear_values(&values)).unwrap();
            prop_assert_eq!(decoded, values);
        }
    }
}
