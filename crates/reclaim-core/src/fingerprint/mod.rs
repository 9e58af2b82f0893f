//! Fingerprint engine: compact visual descriptors computed from a raster.
//!
//! Everything here is synchronous and CPU-bound; the analyzer runs it on the
//! blocking pool. A [`Raster`] is only ever borrowed by the hash and sharpness
//! functions and is dropped by its owner as soon as a phase is done with it.

pub mod cache;
pub mod hash;
pub mod sharpness;
pub mod text;

pub use cache::FingerprintCache;
pub use hash::{difference_hash, hamming_distance, perceptual_hash};
pub use sharpness::{luminance_variance, sharpness_score, BlurAssessment};
pub use text::{has_text, NullRecognizer, RecognizedLine, TextRecognizer, TextRegion};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage};

use crate::error::{PipelineError, PipelineResult};
use crate::types::Fingerprint;

/// A decoded, non-degenerate raster handed over by the media library.
#[derive(Debug, Clone)]
pub struct Raster {
    image: DynamicImage,
}

impl Raster {
    /// Wrap a decoded image, rejecting zero-sized rasters.
    pub fn new(id: &str, image: DynamicImage) -> PipelineResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::DegenerateRaster {
                id: id.to_string(),
                width,
                height,
            });
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Downscale so the longest edge is at most `target`, keeping the aspect.
    ///
    /// Rasters already within the target are returned unchanged.
    pub fn fit_within(self, target: u32) -> Self {
        if self.width() <= target && self.height() <= target {
            return self;
        }
        Self {
            image: self.image.thumbnail(target, target),
        }
    }

    /// Grayscale, stretched to exactly `width`×`height`.
    pub(crate) fn gray_stretched(&self, width: u32, height: u32) -> GrayImage {
        let gray = self.image.to_luma8();
        if gray.dimensions() == (width, height) {
            return gray;
        }
        imageops::resize(&gray, width, height, FilterType::Triangle)
    }
}

/// Compute both hashes of a raster, recording the item's own dimensions.
pub fn fingerprint(raster: &Raster, item_width: u32, item_height: u32) -> Fingerprint {
    Fingerprint {
        phash: perceptual_hash(raster),
        dhash: difference_hash(raster),
        width: item_width,
        height: item_height,
    }
}

#[cfg(test)]
pub(crate) mod test_rasters {
    use super::Raster;
    use image::{DynamicImage, GrayImage, Luma};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    pub fn gray(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Raster {
        let img = GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)]));
        Raster::new("test", DynamicImage::ImageLuma8(img)).unwrap()
    }

    /// Seeded noise in `lo..=hi`.
    pub fn noise(seed: u64, width: u32, height: u32, lo: u8, hi: u8) -> Raster {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut img = GrayImage::new(width, height);
        for p in img.pixels_mut() {
            *p = Luma([rng.gen_range(lo..=hi)]);
        }
        Raster::new("test", DynamicImage::ImageLuma8(img)).unwrap()
    }

    /// The same raster with every pixel shifted by `delta`.
    pub fn shifted(raster: &Raster, delta: i16) -> Raster {
        let mut img = raster.image().to_luma8();
        for p in img.pixels_mut() {
            p.0[0] = (i16::from(p.0[0]) + delta).clamp(0, 255) as u8;
        }
        Raster::new("test", DynamicImage::ImageLuma8(img)).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_raster_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 10));
        let err = Raster::new("zero", img).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateRaster { width: 0, .. }));
    }

    #[test]
    fn test_gray_stretched_fills_the_whole_canvas() {
        let raster = test_rasters::gray(200, 100, |_, _| 255);
        let stretched = raster.gray_stretched(32, 32);
        assert_eq!(stretched.dimensions(), (32, 32));
        assert!(stretched.pixels().all(|p| p.0[0] >= 254));
    }

    #[test]
    fn test_fit_within_downscales_longest_edge() {
        let raster = test_rasters::gray(640, 480, |_, _| 10).fit_within(64);
        assert_eq!((raster.width(), raster.height()), (64, 48));

        let small = test_rasters::gray(20, 10, |_, _| 10).fit_within(64);
        assert_eq!((small.width(), small.height()), (20, 10));
    }

    #[test]
    fn test_fingerprint_records_item_dimensions() {
        let raster = test_rasters::noise(7, 64, 64, 0, 255);
        let fp = fingerprint(&raster, 4032, 3024);
        assert_eq!((fp.width, fp.height), (4032, 3024));
        assert_eq!(fp.phash, perceptual_hash(&raster));
    }
}
