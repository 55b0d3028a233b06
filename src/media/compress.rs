use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use super::{ImagePayload, MediaError};
use crate::core::AppConfig;

/// How much to shrink a photo before it's uploaded. `quality` is in
/// the range (0, 1] and maps onto the JPEG quality scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressionSettings {
    pub quality: f32,
    pub max_dimension: u32,
}

impl From<&AppConfig> for CompressionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            quality: config.image_quality,
            max_dimension: config.image_max_dimension,
        }
    }
}

impl CompressionSettings {
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Decodes any supported image format, flattens transparency onto a
/// white background, shrinks it to fit within `max_dimension` and
/// re-encodes as JPEG.
pub fn compress(bytes: &[u8], settings: &CompressionSettings) -> Result<ImagePayload, MediaError> {
    let image = image::load_from_memory(bytes).map_err(|e| MediaError::Decode(e.to_string()))?;

    let rgba = image.to_rgba8();
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }

    let mut image = DynamicImage::ImageRgba8(flattened);
    let max = settings.max_dimension.max(1);
    if image.width() > max || image.height() > max {
        image = image.resize(max, max, FilterType::Triangle);
    }
    let rgb = image.to_rgb8();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, settings.jpeg_quality());
    encoder
        .encode_image(&rgb)
        .map_err(|e| MediaError::Encode(e.to_string()))?;

    tracing::debug!(
        "Compressed image {}x{} from {} to {} bytes at quality {}",
        rgb.width(),
        rgb.height(),
        bytes.len(),
        out.len(),
        settings.jpeg_quality()
    );

    Ok(ImagePayload::jpeg(BASE64.encode(&out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::png_bytes;
    use base64::Engine as _;

    fn decode_payload(payload: &ImagePayload) -> DynamicImage {
        let bytes = BASE64.decode(&payload.data).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_jpeg_quality_mapping() {
        let settings = |quality| CompressionSettings {
            quality,
            max_dimension: 10,
        };
        assert_eq!(settings(0.7).jpeg_quality(), 70);
        assert_eq!(settings(1.0).jpeg_quality(), 100);
        assert_eq!(settings(0.001).jpeg_quality(), 1);
    }

    #[test]
    fn test_compress_downscales_preserving_aspect() {
        let settings = CompressionSettings {
            quality: 0.7,
            max_dimension: 100,
        };
        let payload = compress(&png_bytes(400, 300), &settings).unwrap();
        let img = decode_payload(&payload);
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 75);
    }

    #[test]
    fn test_compress_keeps_small_images() {
        let settings = CompressionSettings {
            quality: 0.7,
            max_dimension: 100,
        };
        let payload = compress(&png_bytes(20, 10), &settings).unwrap();
        let img = decode_payload(&payload);
        assert_eq!((img.width(), img.height()), (20, 10));
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let mut noisy = RgbaImage::new(64, 64);
        for (x, y, pixel) in noisy.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 7 % 255) as u8, (y * 13 % 255) as u8, ((x ^ y) * 3 % 255) as u8, 255]);
        }
        let mut bytes = Vec::new();
        noisy
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let high = compress(
            &bytes,
            &CompressionSettings {
                quality: 1.0,
                max_dimension: 64,
            },
        )
        .unwrap();
        let low = compress(
            &bytes,
            &CompressionSettings {
                quality: 0.1,
                max_dimension: 64,
            },
        )
        .unwrap();
        assert!(low.data.len() < high.data.len());
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig {
            image_quality: 0.5,
            image_max_dimension: 512,
            ..AppConfig::default()
        };
        let settings = CompressionSettings::from(&config);
        assert_eq!(settings.quality, 0.5);
        assert_eq!(settings.max_dimension, 512);
    }
}
