//! Thumbnail fingerprinting.
//!
//! A fingerprint is the BLAKE3 digest of the PNG encoding of a small,
//! fixed-size RGBA thumbnail. Two assets that render to the same pixels at
//! that size fingerprint identically, whatever their original resolution
//! or container format.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::cache::Fingerprint;
use crate::source::{AssetSource, PixelBuffer, SourceError};

/// Default thumbnail edge length in pixels.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 24;

/// Errors that can occur while fingerprinting a single asset.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// The source failed to render the thumbnail.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The rendered buffer does not match its declared dimensions.
    #[error("Invalid pixel buffer: {width}x{height} with {len} bytes")]
    InvalidBuffer {
        /// Declared width
        width: u32,
        /// Declared height
        height: u32,
        /// Actual byte length
        len: usize,
    },

    /// PNG encoding failed.
    #[error("Failed to encode thumbnail: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encode a pixel buffer as PNG.
///
/// # Errors
///
/// Returns [`FingerprintError::InvalidBuffer`] if the byte length does not
/// equal `width * height * 4`, or [`FingerprintError::Encode`] if the
/// encoder fails.
pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, FingerprintError> {
    let expected = (pixels.width as usize) * (pixels.height as usize) * 4;
    if pixels.width == 0 || pixels.height == 0 || pixels.rgba.len() != expected {
        return Err(FingerprintError::InvalidBuffer {
            width: pixels.width,
            height: pixels.height,
            len: pixels.rgba.len(),
        });
    }

    let mut bytes = Vec::with_capacity(expected / 2);
    PngEncoder::new(&mut bytes).write_image(
        &pixels.rgba,
        pixels.width,
        pixels.height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Fingerprint an already rendered thumbnail.
pub fn fingerprint_pixels(pixels: &PixelBuffer) -> Result<Fingerprint, FingerprintError> {
    let png = encode_png(pixels)?;
    Ok(Fingerprint::of_bytes(&png))
}

/// Render and fingerprint one asset.
pub fn fingerprint_asset<S: AssetSource + ?Sized>(
    source: &S,
    id: &str,
    thumbnail_size: u32,
) -> Result<Fingerprint, FingerprintError> {
    let pixels = source.render_thumbnail(id, thumbnail_size)?;
    fingerprint_pixels(&pixels)
}
