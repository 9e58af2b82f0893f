//! Blur detection: Laplacian variance with a contrast-adaptive threshold.

use super::Raster;

const LAPLACIAN_SIDE: u32 = 128;
const LAPLACIAN_KERNEL: [[f64; 3]; 3] = [[1.0, -2.0, 1.0], [-2.0, 4.0, -2.0], [1.0, -2.0, 1.0]];
const MAX_LUMA_SAMPLES: usize = 4096;
/// Luminance variance at which the adaptive threshold reaches its maximum.
const CONTRAST_KNEE: f64 = 60.0;

/// Variance of the Laplacian response over a stretched 128×128 grayscale
/// canvas, on the same 0..255 luma scale as [`luminance_variance`].
///
/// Border cells are never convolved and count as zero.
pub fn sharpness_score(raster: &Raster) -> f64 {
    let gray = raster.gray_stretched(LAPLACIAN_SIDE, LAPLACIAN_SIDE);
    let side = LAPLACIAN_SIDE as usize;
    let g: Vec<f64> = gray.pixels().map(|p| f64::from(p.0[0])).collect();

    let mut response = vec![0.0; side * side];
    for y in 1..side - 1 {
        for x in 1..side - 1 {
            let mut s = 0.0;
            for (ky, row) in LAPLACIAN_KERNEL.iter().enumerate() {
                for (kx, k) in row.iter().enumerate() {
                    s += g[(y + ky - 1) * side + (x + kx - 1)] * k;
                }
            }
            response[y * side + x] = s;
        }
    }

    let n = response.len() as f64;
    let mean = response.iter().sum::<f64>() / n;
    let mean_sq = response.iter().map(|v| v * v).sum::<f64>() / n;
    mean_sq - mean * mean
}

/// Sample variance of luma over at most ~4096 evenly strided pixels.
pub fn luminance_variance(raster: &Raster) -> f64 {
    let rgb = raster.image().to_rgb8();
    let total = rgb.width() as usize * rgb.height() as usize;
    let step = (total / MAX_LUMA_SAMPLES).max(1);
    let pixels = rgb.as_raw();

    let (mut n, mut mean, mut m2) = (0.0f64, 0.0f64, 0.0f64);
    for i in (0..total).step_by(step) {
        let idx = i * 3;
        let (r, g, b) = (
            f64::from(pixels[idx]),
            f64::from(pixels[idx + 1]),
            f64::from(pixels[idx + 2]),
        );
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        n += 1.0;
        let d = y - mean;
        mean += d / n;
        m2 += d * (y - mean);
    }
    m2 / (n - 1.0).max(1.0)
}

/// Threshold scaled between 0.9× and 1.1× `base` by image contrast.
pub fn adaptive_threshold(luminance_variance: f64, base: f64) -> f64 {
    let k = (luminance_variance / CONTRAST_KNEE).clamp(0.0, 1.0);
    base * (0.9 + 0.2 * k)
}

/// Everything the blur verdict was derived from, for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurAssessment {
    pub luminance_variance: f64,
    /// `None` when the raster was uniform and the Laplacian was skipped
    pub sharpness: Option<f64>,
    pub threshold: Option<f64>,
    pub blurry: bool,
}

impl BlurAssessment {
    pub fn assess(raster: &Raster, base_threshold: f64, uniformity_floor: f64) -> Self {
        let luminance_variance = luminance_variance(raster);
        if luminance_variance < uniformity_floor {
            return Self {
                luminance_variance,
                sharpness: None,
                threshold: None,
                blurry: false,
            };
        }
        let sharpness = sharpness_score(raster);
        let threshold = adaptive_threshold(luminance_variance, base_threshold);
        Self {
            luminance_variance,
            sharpness: Some(sharpness),
            threshold: Some(threshold),
            blurry: sharpness < threshold,
        }
    }
}
