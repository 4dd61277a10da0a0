//! Property-Based Tests for the FEC codec
//!
//! Uses proptest to verify the codec's defining properties across random
//! configurations, payloads, and share subsets:
//!
//! 1. **Round-trip**: any K distinct shares reconstruct the original columns
//! 2. **Systematic law**: shares below K are verbatim input columns
//! 3. **Determinism**: independent codec instances agree byte for byte

#![cfg(test)]

use proptest::prelude::*;

use super::codec::FecCodec;

// =============================================================================
// Strategies
// =============================================================================

/// (K, N) configurations kept small enough for fast matrix work.
fn fec_config_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=6).prop_flat_map(|k| (Just(k), k..=8))
}

/// Column block length.
fn block_len_strategy() -> impl Strategy<Value = usize> {
    1usize..256
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: decoding any K-subset of shares yields the original columns.
    #[test]
    fn prop_roundtrip_any_subset(
        (k, n) in fec_config_strategy(),
        block_len in block_len_strategy(),
        seed in any::<u64>(),
    ) {
        let codec = FecCodec::new(k, n)?;

        let mut state = seed | 1;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 56) as u8
        };
        let columns: Vec<Vec<u8>> = (0..k)
            .map(|_| (0..block_len).map(|_| next()).collect())
            .collect();
        let inputs: Vec<&[u8]> = columns.iter().map(|c| &c[..]).collect();

        let shares: Vec<Vec<u8>> = (0..n)
            .map(|j| {
                let mut out = vec![0u8; block_len];
                codec.encode(&inputs, j, &mut out).unwrap();
                out
            })
            .collect();

        // Pick a K-subset driven by the seed.
        let mut available: Vec<usize> = (0..n).collect();
        let mut subset = Vec::with_capacity(k);
        for _ in 0..k {
            let pick = next() as usize % available.len();
            subset.push(available.remove(pick));
        }

        // Normalise: systematic shares at canonical slots, parity in gaps.
        let mut blocks: Vec<Option<&[u8]>> = vec![None; k];
        let mut indices = vec![usize::MAX; k];
        let mut parity = Vec::new();
        for &idx in &subset {
            if idx < k {
                blocks[idx] = Some(&shares[idx]);
                indices[idx] = idx;
            } else {
                parity.push(idx);
            }
        }
        let mut spare = parity.into_iter();
        for slot in 0..k {
            if blocks[slot].is_none() {
                let idx = spare.next().unwrap();
                blocks[slot] = Some(&shares[idx]);
                indices[slot] = idx;
            }
        }
        let blocks: Vec<&[u8]> = blocks.into_iter().map(|b| b.unwrap()).collect();

        let mut work = vec![0u8; k * block_len];
        codec.decode_missing(&blocks, &indices, &mut work)?;

        for slot in 0..k {
            let recovered: &[u8] = if indices[slot] < k {
                blocks[slot]
            } else {
                &work[slot * block_len..(slot + 1) * block_len]
            };
            prop_assert_eq!(recovered, &columns[slot][..],
                "subset {:?}, column {}", subset, slot);
        }
    }

    /// Property: shares with index < K equal their input column verbatim.
    #[test]
    fn prop_systematic_shares_verbatim(
        (k, n) in fec_config_strategy(),
        block_len in block_len_strategy(),
    ) {
        let codec = FecCodec::new(k, n)?;
        let columns: Vec<Vec<u8>> = (0..k)
            .map(|j| (0..block_len).map(|i| (i * 97 + j * 41) as u8).collect())
            .collect();
        let inputs: Vec<&[u8]> = columns.iter().map(|c| &c[..]).collect();

        for j in 0..k {
            let mut out = vec![0u8; block_len];
            codec.encode(&inputs, j, &mut out)?;
            prop_assert_eq!(&out[..], &columns[j][..]);
        }
    }

    /// Property: two codec instances produce identical share bytes.
    #[test]
    fn prop_encoding_deterministic(
        (k, n) in fec_config_strategy(),
        block_len in 1usize..64,
    ) {
        let first = FecCodec::new(k, n)?;
        let second = FecCodec::new(k, n)?;
        let columns: Vec<Vec<u8>> = (0..k)
            .map(|j| (0..block_len).map(|i| (i + 3 * j) as u8).collect())
            .collect();
        let inputs: Vec<&[u8]> = columns.iter().map(|c| &c[..]).collect();

        for j in 0..n {
            let mut a = vec![0u8; block_len];
            let mut b = vec![0u8; block_len];
            first.encode(&inputs, j, &mut a)?;
            second.encode(&inputs, j, &mut b)?;
            prop_assert_eq!(a, b);
        }
    }
}
