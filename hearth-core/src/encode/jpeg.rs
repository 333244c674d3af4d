//! JPEG encoding of raw frames

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;

use super::scaler::scale_image;
use crate::error::{HearthError, Result};
use crate::types::Frame;

/// Map a `0.0..=1.0` compression factor onto the JPEG quality scale (1-100)
pub fn jpeg_quality(compression: f64) -> u8 {
    if !compression.is_finite() {
        return 90;
    }
    (compression * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Scale a frame by `scale` and encode it as JPEG at `compression`
pub fn encode_jpeg(frame: &Frame, scale: f64, compression: f64) -> Result<Vec<u8>> {
    if !frame.is_well_formed() {
        return Err(HearthError::encoder(format!(
            "Frame {} has {} bytes, expected {} for {}x{}",
            frame.sequence,
            frame.data.len(),
            frame.format.rgb_len(),
            frame.format.width,
            frame.format.height
        )));
    }

    let image = RgbImage::from_raw(frame.format.width, frame.format.height, frame.data.clone())
        .ok_or_else(|| HearthError::encoder("Frame buffer does not match its dimensions"))?;
    let image = scale_image(image, scale);

    let mut out = Vec::with_capacity(image.as_raw().len() / 8);
    let mut encoder = JpegEncoder::new_with_quality(&mut out, jpeg_quality(compression));
    encoder.encode_image(&image)?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32) -> Frame {
        Frame::new(width, height, vec![128; (width * height * 3) as usize], 1)
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        assert_eq!(jpeg_quality(0.5), 50);
        assert_eq!(jpeg_quality(0.7), 70);
        assert_eq!(jpeg_quality(0.9), 90);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(3.0), 100);
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let bytes = encode_jpeg(&solid_frame(64, 48), 1.0, 0.9).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_scales_output() {
        let bytes = encode_jpeg(&solid_frame(64, 48), 0.25, 0.5).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg)
            .unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }

    #[test]
    fn test_encode_rejects_malformed_frame() {
        let frame = Frame::new(64, 48, vec![0; 10], 7);
        let err = encode_jpeg(&frame, 1.0, 0.9).unwrap_err();
        assert!(matches!(err, HearthError::Encoder(_)));
    }
}
