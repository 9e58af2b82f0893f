//! EXIF metadata used for classification: capture time and camera facing.

use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::types::CameraFacing;

/// What the filesystem library needs from a file's metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureInfo {
    /// Unix seconds from `DateTimeOriginal`, read as UTC
    pub captured_at: Option<i64>,
    pub camera_facing: Option<CameraFacing>,
}

/// Extracts capture metadata from image files.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read EXIF capture info. Missing or unreadable EXIF yields the default.
    pub fn extract(path: &Path) -> CaptureInfo {
        let Some(exif) = File::open(path).ok().and_then(|file| {
            let mut reader = BufReader::new(file);
            Reader::new().read_from_container(&mut reader).ok()
        }) else {
            return CaptureInfo::default();
        };

        CaptureInfo {
            captured_at: Self::get_capture_time(&exif),
            camera_facing: Self::get_string(&exif, Tag::LensModel)
                .and_then(|lens| camera_facing_from_lens(&lens)),
        }
    }

    /// Get a string field from EXIF data.
    fn get_string(exif: &exif::Exif, tag: Tag) -> Option<String> {
        exif.get_field(tag, In::PRIMARY).map(|f| {
            let s = f.display_value().to_string();
            s.trim_matches('"').to_string()
        })
    }

    fn get_capture_time(exif: &exif::Exif) -> Option<i64> {
        let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
        let Value::Ascii(parts) = &field.value else {
            return None;
        };
        let dt = exif::DateTime::from_ascii(parts.first()?).ok()?;
        Some(unix_seconds(
            i64::from(dt.year),
            u32::from(dt.month),
            u32::from(dt.day),
        ) + i64::from(dt.hour) * 3600
            + i64::from(dt.minute) * 60
            + i64::from(dt.second))
    }
}

/// Lens descriptions name the camera: "iPhone 13 front camera ...".
pub fn camera_facing_from_lens(lens: &str) -> Option<CameraFacing> {
    let lower = lens.to_lowercase();
    if lower.contains("front") {
        Some(CameraFacing::Front)
    } else if lower.contains("back") || lower.contains("rear") {
        Some(CameraFacing::Back)
    } else {
        None
    }
}

/// Midnight UTC of a proleptic Gregorian date, in unix seconds.
fn unix_seconds(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (i64::from(month) + 9) % 12;
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era * 146_097 + doe - 719_468) * 86_400
}

/// File modification time in unix seconds, 0 if unavailable.
pub fn modified_seconds(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
