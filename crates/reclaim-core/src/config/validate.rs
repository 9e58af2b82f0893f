//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.chunk_size == 0 {
            return Err(invalid("scan.chunk_size must be > 0"));
        }
        if self.scan.persist_every_chunks == 0 {
            return Err(invalid("scan.persist_every_chunks must be > 0"));
        }
        if self.scan.parallel_workers == 0 {
            return Err(invalid("scan.parallel_workers must be > 0"));
        }
        if self.scan.fingerprint_target < 32 {
            return Err(invalid("scan.fingerprint_target must be >= 32"));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(invalid("limits.decode_timeout_ms must be > 0"));
        }
        if self.limits.video_frame_timeout_ms == 0 {
            return Err(invalid("limits.video_frame_timeout_ms must be > 0"));
        }
        if self.duplicate.phash_prefilter < self.duplicate.max_phash_distance {
            return Err(invalid(
                "duplicate.phash_prefilter must be >= duplicate.max_phash_distance",
            ));
        }
        if self.duplicate.max_bucket_size < 2 || self.similar.max_bucket_size < 2 {
            return Err(invalid("max_bucket_size must be >= 2"));
        }
        for (name, tolerance) in [
            ("duplicate.aspect_tolerance", self.duplicate.aspect_tolerance),
            ("similar.aspect_tolerance", self.similar.aspect_tolerance),
        ] {
            if !(0.0..=1.0).contains(&tolerance) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }
        if self.blur.base_threshold <= 0.0 {
            return Err(invalid("blur.base_threshold must be > 0"));
        }
        if self.blur.uniformity_floor < 0.0 {
            return Err(invalid("blur.uniformity_floor must be >= 0"));
        }
        if self.blur.target_size < 3 {
            return Err(invalid("blur.target_size must be >= 3"));
        }
        if self.text.coarse_size == 0 || self.text.fine_size == 0 {
            return Err(invalid("text.coarse_size and text.fine_size must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.text.min_area_fraction) {
            return Err(invalid("text.min_area_fraction must be between 0.0 and 1.0"));
        }
        if self.video.large_threshold_mb == 0 {
            return Err(invalid("video.large_threshold_mb must be > 0"));
        }
        Ok(())
    }
}
