//! Frame scaling
//!
//! Computes output dimensions for a quality tier and resamples RGB frames.

use image::RgbImage;
use image::imageops::{self, FilterType};
use tracing::trace;

/// Calculate the output size for a linear scale factor
///
/// Dimensions are rounded to the nearest pixel and never drop below 1x1.
pub fn scaled_size(src_width: u32, src_height: u32, scale: f64) -> (u32, u32) {
    let scale = if scale.is_finite() && scale > 0.0 { scale.min(1.0) } else { 1.0 };
    let width = ((src_width as f64) * scale).round().max(1.0) as u32;
    let height = ((src_height as f64) * scale).round().max(1.0) as u32;
    (width, height)
}

/// Resample an image by `scale`, returning it unchanged when no resize is needed
pub(crate) fn scale_image(image: RgbImage, scale: f64) -> RgbImage {
    let (src_width, src_height) = image.dimensions();
    let (dst_width, dst_height) = scaled_size(src_width, src_height, scale);
    if (dst_width, dst_height) == (src_width, src_height) {
        return image;
    }

    trace!(
        "Scaling {}x{} -> {}x{}",
        src_width, src_height, dst_width, dst_height
    );
    imageops::resize(&image, dst_width, dst_height, FilterType::Triangle)
}
