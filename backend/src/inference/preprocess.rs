use image::imageops::FilterType;
use ndarray::Array4;

#[derive(Debug, thiserror::Error)]
#[error("Invalid image data: {0}")]
pub struct DecodeError(#[from] image::ImageError);

/// Turns uploaded bytes into a `(1, H, W, 3)` batch with channels scaled to [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl ImageNormalizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::CatmullRom,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn normalize(&self, bytes: &[u8]) -> Result<Array4<f32>, DecodeError> {
        let decoded = image::load_from_memory(bytes)?;
        // to_rgb8 drops alpha and expands grayscale/palette images to three channels.
        let rgb = decoded.to_rgb8();
        let resized = image::imageops::resize(&rgb, self.width, self.height, self.filter);

        let (w, h) = (self.width as usize, self.height as usize);
        let mut batch = Array4::<f32>::zeros((1, h, w, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                batch[[0, y as usize, x as usize, c]] = pixel[c] as f32 / u8::MAX as f32;
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 255, 128])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn output_is_single_rgb_batch_in_unit_range() {
        let normalizer = ImageNormalizer::new(32, 24);
        let batch = normalizer.normalize(&png_bytes(50, 80)).unwrap();

        assert_eq!(batch.shape(), &[1, 24, 32, 3]);
        assert!(batch.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn grayscale_input_is_expanded_to_three_channels() {
        let gray = image::GrayImage::from_pixel(10, 10, image::Luma([255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();

        let batch = ImageNormalizer::new(4, 4).normalize(&out.into_inner()).unwrap();
        assert_eq!(batch.shape(), &[1, 4, 4, 3]);
        assert!(batch.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = ImageNormalizer::new(8, 8).normalize(b"definitely not an image");
        assert!(result.is_err());
    }
}
