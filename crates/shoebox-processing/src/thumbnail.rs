//! Thumbnail generation

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FormatResult;

/// Produces a JPEG no larger than the given bounds, preserving aspect ratio.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, image: Bytes, max_width: u32, max_height: u32) -> FormatResult<Bytes>;
}

#[cfg(feature = "image")]
pub use image_impl::ImageThumbnailGenerator;

#[cfg(feature = "image")]
mod image_impl {
    use super::*;
    use crate::error::FormatError;
    use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
    use std::io::Cursor;

    /// Thumbnail generator backed by the `image` crate.
    ///
    /// Decoding and resizing run on the blocking thread pool.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImageThumbnailGenerator;

    impl ImageThumbnailGenerator {
        pub fn generate_blocking(
            data: &[u8],
            max_width: u32,
            max_height: u32,
        ) -> FormatResult<Vec<u8>> {
            let reader = ImageReader::new(Cursor::new(data))
                .with_guessed_format()
                .map_err(|e| FormatError::Image(e.to_string()))?;
            let img = reader
                .decode()
                .map_err(|e| FormatError::Image(e.to_string()))?;

            let (width, height) = img.dimensions();
            let resized = if width > max_width || height > max_height {
                img.thumbnail(max_width, max_height)
            } else {
                img
            };

            tracing::debug!(
                from_width = width,
                from_height = height,
                to_width = resized.width(),
                to_height = resized.height(),
                "Generated thumbnail"
            );

            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
            let mut buffer = Vec::new();
            rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
                .map_err(|e| FormatError::Image(e.to_string()))?;
            Ok(buffer)
        }
    }

    #[async_trait]
    impl ThumbnailGenerator for ImageThumbnailGenerator {
        async fn generate(
            &self,
            image: Bytes,
            max_width: u32,
            max_height: u32,
        ) -> FormatResult<Bytes> {
            let thumbnail = tokio::task::spawn_blocking(move || {
                Self::generate_blocking(&image, max_width, max_height)
            })
            .await
            .map_err(|e| FormatError::Task(e.to_string()))??;
            Ok(Bytes::from(thumbnail))
        }
    }

}
