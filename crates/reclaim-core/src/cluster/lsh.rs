//! Locality-sensitive banding of 64-bit hashes.
//!
//! Each hash is split into eight 8-bit bands; two hashes share a bucket when
//! any band matches exactly. Only pairs sharing a bucket are ever compared.

use std::collections::{BTreeSet, HashMap};

pub const BANDS: u32 = 8;
const BAND_BITS: u32 = 8;
const BAND_MASK: u64 = (1 << BAND_BITS) - 1;

/// Bucket key: band index in the top byte, band value in the low bits.
#[inline]
pub fn band_key(hash: u64, band: u32) -> u64 {
    (u64::from(band) << 56) | ((hash >> (band * BAND_BITS)) & BAND_MASK)
}

/// Group candidate indices by every band key of their hash.
pub fn band_buckets(hashes: impl IntoIterator<Item = (usize, u64)>) -> HashMap<u64, Vec<usize>> {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    for (index, hash) in hashes {
        for band in 0..BANDS {
            buckets.entry(band_key(hash, band)).or_default().push(index);
        }
    }
    buckets
}

/// Distinct index pairs `(i, j)`, `i < j`, that share a usable bucket.
///
/// Buckets with fewer than two or more than `max_bucket_size` members are
/// skipped. Oversized buckets are usually flat or near-uniform images whose
/// pairwise comparison would be quadratic for no useful grouping.
pub fn candidate_pairs(
    buckets: &HashMap<u64, Vec<usize>>,
    max_bucket_size: usize,
) -> BTreeSet<(usize, usize)> {
    let mut pairs = BTreeSet::new();
    for members in buckets.values() {
        if members.len() < 2 || members.len() > max_bucket_size {
            continue;
        }
        for (pos, &a) in members.iter().enumerate() {
            for &b in &members[pos + 1..] {
                if a != b {
                    pairs.insert((a.min(b), a.max(b)));
                }
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_key_layout() {
        let hash = 0x0102_0304_0506_0708u64;
        assert_eq!(band_key(hash, 0), 0x08);
        assert_eq!(band_key(hash, 1), (1 << 56) | 0x07);
        assert_eq!(band_key(hash, 7), (7 << 56) | 0x01);
    }

    #[test]
    fn test_one_matching_band_is_enough() {
        let a = 0x0000_0000_0000_00ABu64;
        let b = 0xFFFF_FFFF_FFFF_FFABu64;
        let buckets = band_buckets([(0, a), (1, b)]);
        let pairs = candidate_pairs(&buckets, 120);
        assert_eq!(pairs.into_iter().collect::<Vec<_>>(), vec![(0, 1)]);
    }

    #[test]
    fn test_pairs_are_deduplicated_across_bands() {
        let buckets = band_buckets([(0, 42), (1, 42), (2, 42)]);
        let pairs = candidate_pairs(&buckets, 120);
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn test_oversized_buckets_are_skipped() {
        let buckets = band_buckets((0..5).map(|i| (i, 7u64)));
        assert!(candidate_pairs(&buckets, 4).is_empty());
        assert_eq!(candidate_pairs(&buckets, 5).len(), 10);
    }
}
