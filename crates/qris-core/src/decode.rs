//! QR image decoding for the setup flow
//!
//! A photographed code is decoded with `rqrr`; the resulting string then
//! goes through the same parser and rebuilder as hand-typed input.

use image::GrayImage;
use thiserror::Error;

/// Decoding errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no QR code found in image")]
    NotFound,
    #[error("failed to decode QR: {0}")]
    DecodeFailed(String),
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Decodes the first QR grid found in a grayscale image.
pub fn decode_image(img: &GrayImage) -> Result<String, DecodeError> {
    let mut prepared = rqrr::PreparedImage::prepare(img.clone());
    let grids = prepared.detect_grids();
    log::debug!("detected {} QR grids", grids.len());

    let grid = grids.first().ok_or(DecodeError::NotFound)?;
    match grid.decode() {
        Ok((_meta, content)) => Ok(content),
        Err(e) => Err(DecodeError::DecodeFailed(format!("{e:?}"))),
    }
}

/// Decodes from encoded image bytes (PNG, JPEG).
pub fn decode_bytes(bytes: &[u8]) -> Result<String, DecodeError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
    decode_image(&img.to_luma8())
}

/// Decodes from a raw RGBA buffer, e.g. canvas `getImageData` output.
pub fn decode_rgba(data: &[u8], width: u32, height: u32) -> Result<String, DecodeError> {
    let gray = rgba_to_gray(data, width, height);
    let img = GrayImage::from_raw(width, height, gray).ok_or_else(|| {
        DecodeError::InvalidImage("buffer does not match dimensions".to_string())
    })?;
    decode_image(&img)
}

fn rgba_to_gray(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width as usize) * (height as usize);
    let mut gray = Vec::with_capacity(pixel_count);

    for i in 0..pixel_count {
        let offset = i * 4;
        if offset + 2 < rgba.len() {
            let r = rgba[offset] as f32;
            let g = rgba[offset + 1] as f32;
            let b = rgba[offset + 2] as f32;
            // ITU-R BT.601 luma formula
            gray.push((0.299 * r + 0.587 * g + 0.114 * b) as u8);
        }
    }

    gray
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_blank_image_has_no_qr() {
        let img = GrayImage::from_pixel(100, 100, Luma([255]));
        assert!(matches!(decode_image(&img), Err(DecodeError::NotFound)));
    }

    #[test]
    fn test_garbage_bytes_are_an_invalid_image() {
        assert!(matches!(
            decode_bytes(b"definitely not a png"),
            Err(DecodeError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_rgba_buffer_size_mismatch() {
        assert!(matches!(
            decode_rgba(&[0u8; 16], 100, 100),
            Err(DecodeError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_rgba_to_gray_weights() {
        // One white and one black pixel
        let rgba = [255, 255, 255, 255, 0, 0, 0, 255];
        let gray = rgba_to_gray(&rgba, 2, 1);
        assert_eq!(gray, vec![254, 0]);
    }
}
