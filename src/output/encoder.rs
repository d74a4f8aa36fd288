// 图像编码 - 委托给 image crate 的编码器

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use tracing::trace;

use crate::error::SnapshotError;
use crate::host::RasterBuffer;
use crate::models::OutputFormat;

/// 把 [0.0, 1.0] 的质量换算为 [0, 100] 的整数百分比
pub fn quality_percent(quality: f64) -> u8 {
    (100.0 * quality).clamp(0.0, 100.0) as u8
}

/// 编码位图
///
/// quality 只传给有损格式；WebP 使用无损编码器，忽略 quality
pub fn encode(
    buffer: &RasterBuffer,
    format: OutputFormat,
    quality: f64,
) -> Result<Vec<u8>, SnapshotError> {
    let (width, height) = buffer.dimensions();
    if width == 0 || height == 0 {
        return Err(SnapshotError::EncodeFailure(format!(
            "图像尺寸为空: {}x{}",
            width, height
        )));
    }

    let mut bytes = Vec::new();
    let result = match format {
        OutputFormat::Png => PngEncoder::new(&mut bytes).write_image(
            buffer.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpg => {
            // JPEG 不支持 alpha 通道
            let rgb: RgbImage = buffer.convert();
            let percent = quality_percent(quality).max(1);
            JpegEncoder::new_with_quality(&mut bytes, percent).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Webp => WebPEncoder::new_lossless(&mut bytes).write_image(
            buffer.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };

    result.map_err(|e| SnapshotError::EncodeFailure(e.to_string()))?;

    trace!(
        "编码 {} 完成: {}x{}, {} 字节",
        format.extension(),
        width,
        height,
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn sample() -> RasterBuffer {
        RasterBuffer::from_fn(32, 16, |x, y| Rgba([(x * 8) as u8, (y * 16) as u8, 128, 255]))
    }

    #[test]
    fn test_quality_percent() {
        assert_eq!(quality_percent(0.0), 0);
        assert_eq!(quality_percent(0.85), 85);
        assert_eq!(quality_percent(1.0), 100);
        assert_eq!(quality_percent(3.0), 100);
        assert_eq!(quality_percent(-1.0), 0);
    }

    #[test]
    fn test_png_decodes_to_same_size_and_pixels() {
        let buffer = sample();
        let bytes = encode(&buffer, OutputFormat::Png, 1.0).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, buffer);
    }

    #[test]
    fn test_jpeg_quality_changes_output() {
        let buffer = sample();
        let low = encode(&buffer, OutputFormat::Jpg, 0.1).unwrap();
        let high = encode(&buffer, OutputFormat::Jpg, 1.0).unwrap();

        assert_eq!(image::guess_format(&low).unwrap(), image::ImageFormat::Jpeg);
        assert!(low.len() < high.len());
        let decoded = image::load_from_memory(&high).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
    }

    #[test]
    fn test_zero_quality_jpeg_still_encodes() {
        let bytes = encode(&sample(), OutputFormat::Jpg, 0.0).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_webp_ignores_quality() {
        let buffer = sample();
        let a = encode(&buffer, OutputFormat::Webp, 0.1).unwrap();
        let b = encode(&buffer, OutputFormat::Webp, 0.9).unwrap();

        assert_eq!(a, b);
        assert_eq!(image::guess_format(&a).unwrap(), image::ImageFormat::WebP);
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let err = encode(&RasterBuffer::new(0, 0), OutputFormat::Png, 1.0).unwrap_err();
        assert!(matches!(err, SnapshotError::EncodeFailure(_)));
    }
}
