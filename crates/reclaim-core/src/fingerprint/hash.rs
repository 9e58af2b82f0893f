//! Perceptual (DCT) and difference hashes, both 64 bits, MSB-first.

use std::sync::OnceLock;

use super::Raster;

const DCT_SIDE: usize = 32;
const LOW_FREQ_SIDE: usize = 8;
const DHASH_WIDTH: u32 = 9;
const DHASH_HEIGHT: u32 = 8;

/// DCT-II cosine table, `table[u * N + x] = cos((2x + 1) * u * PI / 2N)`.
fn cosine_table() -> &'static [f64] {
    static TABLE: OnceLock<Vec<f64>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let n = DCT_SIDE as f64;
        (0..DCT_SIDE)
            .flat_map(|u| {
                (0..DCT_SIDE).map(move |x| {
                    ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / (2.0 * n)).cos()
                })
            })
            .collect()
    })
}

/// Unnormalized separable 2D DCT-II: rows first, then columns.
fn dct_2d(pixels: &[f64]) -> Vec<f64> {
    let n = DCT_SIDE;
    let cos = cosine_table();
    let mut rows = vec![0.0; n * n];
    for y in 0..n {
        for u in 0..n {
            rows[y * n + u] = (0..n).map(|x| pixels[y * n + x] * cos[u * n + x]).sum();
        }
    }

    let mut out = vec![0.0; n * n];
    for u in 0..n {
        for v in 0..n {
            out[v * n + u] = (0..n).map(|y| rows[y * n + u] * cos[v * n + y]).sum();
        }
    }
    out
}

/// Median with the two middle values averaged for even counts.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// DCT perceptual hash.
///
/// The raster is stretched to a 32×32 grayscale canvas; the top-left
/// 8×8 DCT coefficients are thresholded against their median, row-major,
/// coefficient 0 landing in bit 63.
pub fn perceptual_hash(raster: &Raster) -> u64 {
    let side = DCT_SIDE as u32;
    let gray = raster.gray_stretched(side, side);
    let pixels: Vec<f64> = gray.pixels().map(|p| f64::from(p.0[0])).collect();
    let coeffs = dct_2d(&pixels);

    let mut block = [0.0f64; LOW_FREQ_SIDE * LOW_FREQ_SIDE];
    for v in 0..LOW_FREQ_SIDE {
        for u in 0..LOW_FREQ_SIDE {
            block[v * LOW_FREQ_SIDE + u] = coeffs[v * DCT_SIDE + u];
        }
    }

    let threshold = median(&block);
    block
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > threshold)
        .fold(0u64, |hash, (i, _)| hash | (1u64 << (63 - i)))
}

/// Horizontal gradient hash over a stretched 9×8 grayscale raster.
///
/// Bit set iff a pixel is brighter than its right neighbour, first comparison
/// in bit 63.
pub fn difference_hash(raster: &Raster) -> u64 {
    let gray = raster.gray_stretched(DHASH_WIDTH, DHASH_HEIGHT);
    let mut hash = 0u64;
    let mut bit = 1u64 << 63;
    for y in 0..DHASH_HEIGHT {
        for x in 0..DHASH_WIDTH - 1 {
            if gray.get_pixel(x, y).0[0] > gray.get_pixel(x + 1, y).0[0] {
                hash |= bit;
            }
            bit >>= 1;
        }
    }
    hash
}

/// Number of differing bits.
#[inline]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
